//! Speaker playback over a drained-flag sample queue
//!
//! The speaker port never blocks the control loop: callers enqueue decoded
//! samples and poll [`SpeakerPort::is_drained`] until the output callback has
//! consumed the queue. MP3 replies from the synthesis service are decoded
//! here before queueing.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::audio::duplex::SpeakerPort;
use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// cpal-backed speaker implementing the duplex output port
pub struct CpalSpeaker {
    config: StreamConfig,
    queue: Arc<Mutex<VecDeque<f32>>>,
    stream: Option<Stream>,
}

impl CpalSpeaker {
    /// Probe the default output device for a config at the playback rate
    ///
    /// # Errors
    ///
    /// Returns error if no suitable output device or config exists
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "speaker probed"
        );

        Ok(Self {
            config,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            stream: None,
        })
    }
}

impl SpeakerPort for CpalSpeaker {
    fn bring_up(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device".to_string()))?;

        let channels = self.config.channels as usize;
        let queue = Arc::clone(&self.queue);

        let stream = device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut q) = queue.lock() else {
                        data.fill(0.0);
                        return;
                    };
                    for frame in data.chunks_mut(channels) {
                        let sample = q.pop_front().unwrap_or(0.0);
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "speaker stream error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("speaker path up");
        Ok(())
    }

    fn tear_down(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        if let Ok(mut q) = self.queue.lock() {
            q.clear();
        }

        tracing::debug!("speaker path down");
        Ok(())
    }

    fn enqueue(&mut self, samples: &[f32]) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::Audio("speaker path is not up".to_string()));
        }

        let mut q = self
            .queue
            .lock()
            .map_err(|_| Error::Audio("speaker queue poisoned".to_string()))?;
        q.extend(samples.iter().copied());

        tracing::trace!(queued = samples.len(), "samples queued");
        Ok(())
    }

    fn is_drained(&self) -> bool {
        self.queue.lock().map(|q| q.is_empty()).unwrap_or(true)
    }
}

/// Decode MP3 bytes to mono f32 samples
///
/// Stereo frames are averaged down to mono.
///
/// # Errors
///
/// Returns error if the data is not decodable MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        (left + right) / 2.0
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}
