//! Capture-to-clip pipeline over a fake microphone

mod common;

use std::time::Duration;

use talkback::audio::capture::{capture, CaptureOptions, SampleSource as _};
use talkback::audio::duplex::{MicrophonePort as _, SpeakerPort as _};
use talkback::audio::wav::{WavArtifact, HEADER_LEN};

use common::{temp_wav, FakeMic, FakeSpeaker};

fn held_for(mut reads: u32) -> impl FnMut() -> bool {
    move || {
        if reads == 0 {
            false
        } else {
            reads -= 1;
            true
        }
    }
}

/// Two seconds of speech at 16 kHz: 20 blocks of 1600 samples lands a
/// 64000-byte payload behind the 44-byte header, boosted x2 on the way in.
#[test]
fn two_seconds_of_capture_frames_the_expected_clip() {
    let path = temp_wav("two-seconds");

    let mut mic = FakeMic::new(1_000);
    mic.bring_up().unwrap();

    let opts = CaptureOptions {
        block_samples: 1_600,
        read_wait: Duration::from_millis(1),
        max_duration: Duration::from_secs(30),
        gain_shift: 1,
    };

    let mut artifact = WavArtifact::create(&path, 16_000).unwrap();
    let written = capture(held_for(20), &mut mic, &mut artifact, &opts).unwrap();
    let declared = artifact.finalize().unwrap();

    assert_eq!(written, 2 * 16_000 * 2);
    assert_eq!(u64::from(declared), written);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), HEADER_LEN + 64_000);

    // Sample rate and data size straight from the header fields
    assert_eq!(
        u32::from_le_bytes(bytes[24..28].try_into().unwrap()),
        16_000
    );
    assert_eq!(
        u32::from_le_bytes(bytes[40..44].try_into().unwrap()),
        64_000
    );

    let mut reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16_000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);

    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples.len(), 32_000);
    assert!(samples.iter().all(|&s| s == 2_000), "x2 gain applied");

    std::fs::remove_file(&path).ok();
}

#[test]
fn release_mid_capture_keeps_the_clip_well_formed() {
    let path = temp_wav("early-release");

    let mut mic = FakeMic::new(10);
    mic.bring_up().unwrap();

    let opts = CaptureOptions {
        block_samples: 800,
        read_wait: Duration::from_millis(1),
        max_duration: Duration::from_secs(30),
        gain_shift: 0,
    };

    let mut artifact = WavArtifact::create(&path, 16_000).unwrap();
    let written = capture(held_for(3), &mut mic, &mut artifact, &opts).unwrap();
    artifact.finalize().unwrap();

    assert_eq!(written, 3 * 800 * 2);

    let mut reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.samples::<i16>().count(), 2_400);

    std::fs::remove_file(&path).ok();
}

#[test]
fn torn_down_mic_blocks_are_skipped_not_written() {
    let path = temp_wav("mic-down");

    // Never brought up: every read is a transient failure, so the
    // capture loop runs out the trigger with nothing written
    let mut mic = FakeMic::new(5);

    let opts = CaptureOptions {
        block_samples: 16,
        read_wait: Duration::from_millis(1),
        max_duration: Duration::from_secs(1),
        gain_shift: 0,
    };

    let mut artifact = WavArtifact::create(&path, 16_000).unwrap();
    let written = capture(held_for(4), &mut mic, &mut artifact, &opts).unwrap();
    let declared = artifact.finalize().unwrap();

    assert_eq!(written, 0);
    assert_eq!(declared, 0);

    std::fs::remove_file(&path).ok();
}

#[test]
fn speaker_rejects_samples_while_torn_down() {
    let mut speaker = FakeSpeaker::new(1);
    assert!(speaker.enqueue(&[0.0; 8]).is_err());

    speaker.bring_up().unwrap();
    assert!(speaker.enqueue(&[0.0; 8]).is_ok());

    speaker.tear_down().unwrap();
    assert!(speaker.enqueue(&[0.0; 8]).is_err());
}
