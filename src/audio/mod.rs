//! Audio pathway: WAV framing, capture, playback, and half-duplex arbitration

pub mod capture;
pub mod duplex;
pub mod playback;
pub mod wav;

pub use capture::{apply_gain, capture, CaptureOptions, CpalMicrophone, SampleSource};
pub use duplex::{DuplexArbiter, DuplexState, MicrophonePort, SpeakerPort};
pub use playback::{decode_mp3, CpalSpeaker, PLAYBACK_SAMPLE_RATE};
pub use wav::{build_header, WavArtifact, HEADER_LEN};
