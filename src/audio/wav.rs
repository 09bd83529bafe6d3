//! Streaming WAV container framing
//!
//! A clip is written while its length is still unknown: the 44-byte header
//! goes down first with zero-length size fields, payload blocks are appended
//! as capture produces them, and `finalize` seeks back and patches the size
//! fields to the true byte count.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::Result;

/// Fixed RIFF/WAVE header length for uncompressed PCM
pub const HEADER_LEN: usize = 44;

/// Channel count of every clip (mono)
pub const CHANNELS: u16 = 1;

/// Bit depth of every clip
pub const BITS_PER_SAMPLE: u16 = 16;

/// Build a little-endian RIFF/WAVE header for a mono 16-bit PCM payload.
///
/// Pure function of its inputs; called once with `payload_len = 0` before
/// capture and once with the true length when the clip is finalized.
#[must_use]
pub fn build_header(payload_len: u32, sample_rate: u32) -> [u8; HEADER_LEN] {
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate * u32::from(block_align);

    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + payload_len).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM format tag
    header[22..24].copy_from_slice(&CHANNELS.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&payload_len.to_le_bytes());

    header
}

/// A WAV clip being streamed to disk.
///
/// Created with a placeholder header, fed payload bytes through [`Write`],
/// and closed with [`WavArtifact::finalize`] which patches the header.
/// Invariant: after finalize, the header's declared data size equals the
/// payload bytes actually written.
pub struct WavArtifact {
    file: File,
    path: PathBuf,
    sample_rate: u32,
    payload_len: u32,
}

impl WavArtifact {
    /// Create the clip file and write the zero-length placeholder header
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self> {
        let mut file = File::create(path)?;
        file.write_all(&build_header(0, sample_rate))?;

        tracing::debug!(path = %path.display(), sample_rate, "clip opened");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            sample_rate,
            payload_len: 0,
        })
    }

    /// Payload bytes written so far
    #[must_use]
    pub const fn payload_len(&self) -> u32 {
        self.payload_len
    }

    /// Path of the clip on disk
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Patch the header with the true payload length and close the clip.
    ///
    /// Returns the declared payload length.
    ///
    /// # Errors
    ///
    /// Returns error if the seek-back or header rewrite fails
    pub fn finalize(mut self) -> Result<u32> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file
            .write_all(&build_header(self.payload_len, self.sample_rate))?;
        self.file.sync_all()?;

        tracing::debug!(
            path = %self.path.display(),
            payload_bytes = self.payload_len,
            "clip finalized"
        );

        Ok(self.payload_len)
    }
}

impl Write for WavArtifact {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.file.write(buf)?;
        self.payload_len = self.payload_len.saturating_add(written as u32);
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_u32(header: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(header[offset..offset + 4].try_into().unwrap())
    }

    fn field_u16(header: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(header[offset..offset + 2].try_into().unwrap())
    }

    #[test]
    fn header_magic_tags() {
        let header = build_header(0, 16_000);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
    }

    #[test]
    fn header_fields_for_speech_rate() {
        let header = build_header(64_000, 16_000);

        assert_eq!(field_u32(&header, 4), 36 + 64_000); // RIFF size
        assert_eq!(field_u16(&header, 20), 1); // PCM
        assert_eq!(field_u16(&header, 22), 1); // mono
        assert_eq!(field_u32(&header, 24), 16_000); // sample rate
        assert_eq!(field_u32(&header, 28), 32_000); // byte rate
        assert_eq!(field_u16(&header, 32), 2); // block align
        assert_eq!(field_u16(&header, 34), 16); // bit depth
        assert_eq!(field_u32(&header, 40), 64_000); // data size
    }

    #[test]
    fn placeholder_header_declares_zero_payload() {
        let header = build_header(0, 16_000);
        assert_eq!(field_u32(&header, 4), 36);
        assert_eq!(field_u32(&header, 40), 0);
    }

    #[test]
    fn finalize_patches_declared_length_to_bytes_written() {
        let path = std::env::temp_dir().join(format!("talkback-wav-{}.wav", std::process::id()));

        let mut artifact = WavArtifact::create(&path, 16_000).unwrap();
        let block = vec![0u8; 3_200];
        artifact.write_all(&block).unwrap();
        artifact.write_all(&block[..100]).unwrap();
        let declared = artifact.finalize().unwrap();

        assert_eq!(declared, 3_300);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 3_300);
        assert_eq!(field_u32(&bytes, 40), 3_300);
        assert_eq!(field_u32(&bytes, 4), 36 + 3_300);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn hound_reads_back_a_finalized_clip() {
        let path = std::env::temp_dir().join(format!("talkback-hound-{}.wav", std::process::id()));

        let samples: Vec<i16> = (0..1_000).map(|i| (i % 101) as i16).collect();
        let mut artifact = WavArtifact::create(&path, 16_000).unwrap();
        for s in &samples {
            artifact.write_all(&s.to_le_bytes()).unwrap();
        }
        artifact.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);

        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, samples);

        std::fs::remove_file(&path).ok();
    }
}
