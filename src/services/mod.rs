//! Remote collaborators: transcription, reasoning, and speech synthesis
//!
//! Each service sits behind a narrow trait so the session loop never knows
//! which vendor is on the other side, and tests can substitute fakes.

pub mod llm;
pub mod stt;
pub mod tts;

use async_trait::async_trait;

use crate::Result;

/// Hard cap on the clip size accepted by the transcription request
pub const MAX_CLIP_BYTES: usize = 500 * 1024;

/// Transcription service: WAV bytes in, text out
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribe a WAV clip to text
    ///
    /// # Errors
    ///
    /// Returns error on oversized clips, non-success responses, or a
    /// malformed/absent text field
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String>;
}

/// Language model service: user text in, reply text out
#[async_trait]
pub trait LanguageModelService: Send + Sync {
    /// Produce a reply to the transcribed user text
    ///
    /// # Errors
    ///
    /// Returns error on non-success responses or an empty/malformed reply
    async fn complete(&self, user_text: &str) -> Result<String>;
}

pub use llm::ChatClient;
pub use stt::TranscriberClient;
pub use tts::SynthesisClient;
