//! Chunk-by-chunk reply narration
//!
//! Drives the speech synthesis service and the speaker port: each chunk is
//! synthesized, queued, and fully drained before the next chunk is
//! submitted, so chunks play strictly in order with no overlap.

use async_trait::async_trait;

use crate::audio::duplex::SpeakerPort;
use crate::retry::{poll_until, PollOutcome, PollPolicy};
use crate::speech::chunker::chunk_reply;
use crate::Result;

/// Remote speech synthesis: one text chunk in, decoded samples out
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize a chunk to playback-ready samples
    ///
    /// # Errors
    ///
    /// Returns error if the synthesis request fails
    async fn synthesize(&self, chunk: &str) -> Result<Vec<f32>>;
}

/// Speak `text` through the speaker, one bounded chunk at a time.
///
/// The speaker must already hold the audio pathway. Before every submission
/// the prior chunk is polled to completion, and one final drain wait runs
/// before returning so the caller can hand the pathway back to the mic.
///
/// # Errors
///
/// Returns the first synthesis or queueing error; the final drain wait runs
/// regardless
pub async fn speak_reply<S>(
    synth: &dyn Synthesizer,
    speaker: &mut S,
    text: &str,
    max_chunk_chars: usize,
    drain: &PollPolicy,
) -> Result<()>
where
    S: SpeakerPort,
{
    let chunks = chunk_reply(text, max_chunk_chars);
    tracing::debug!(chunks = chunks.len(), chars = text.len(), "speaking reply");

    let mut outcome = Ok(());

    for chunk in &chunks {
        if poll_until(drain, || speaker.is_drained()).await == PollOutcome::TimedOut {
            tracing::warn!("speaker still busy past drain budget, not queueing more");
            break;
        }

        tracing::trace!(chunk = %chunk, "synthesizing chunk");
        match synth.synthesize(chunk).await {
            Ok(samples) => {
                if let Err(e) = speaker.enqueue(&samples) {
                    outcome = Err(e);
                    break;
                }
            }
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }

    // Final idle wait so the pathway is quiet when the arbiter takes over
    poll_until(drain, || speaker.is_drained()).await;

    outcome
}
