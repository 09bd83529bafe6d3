//! Half-duplex arbitration between microphone and speaker
//!
//! The two audio ports share one peripheral pathway and must never be open
//! at the same time. The arbiter owns both ports, tracks which side holds
//! the pathway, and sequences every teardown/bring-up transition. It makes
//! exactly one round trip per spoken reply, never one per chunk.

use crate::retry::{poll_until, PollOutcome, PollPolicy};
use crate::{Error, Result};

/// Microphone side of the shared audio pathway
pub trait MicrophonePort {
    /// Open the input path
    ///
    /// # Errors
    ///
    /// Returns error if the peripheral cannot be opened
    fn bring_up(&mut self) -> Result<()>;

    /// Fully release the input path (disable and destroy the channel)
    ///
    /// # Errors
    ///
    /// Returns error if teardown fails
    fn tear_down(&mut self) -> Result<()>;
}

/// Speaker side of the shared audio pathway
pub trait SpeakerPort {
    /// Open the output path
    ///
    /// # Errors
    ///
    /// Returns error if the peripheral cannot be opened
    fn bring_up(&mut self) -> Result<()>;

    /// Fully release the output path
    ///
    /// # Errors
    ///
    /// Returns error if teardown fails
    fn tear_down(&mut self) -> Result<()>;

    /// Queue samples for playback without blocking
    ///
    /// # Errors
    ///
    /// Returns error if the port is not open
    fn enqueue(&mut self, samples: &[f32]) -> Result<()>;

    /// Whether all queued audio has been consumed
    fn is_drained(&self) -> bool;
}

/// Which side currently holds the audio pathway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplexState {
    /// Microphone open, speaker closed
    MicActive,
    /// Speaker open, microphone closed
    SpeakerActive,
    /// Neither side open; a transition is in progress
    Transitioning,
}

/// Owner and sequencer of the two audio ports
pub struct DuplexArbiter<M, S> {
    mic: M,
    speaker: S,
    state: DuplexState,
    to_speaker: u64,
    to_mic: u64,
}

impl<M: MicrophonePort, S: SpeakerPort> DuplexArbiter<M, S> {
    /// Take ownership of both ports and open the microphone path
    ///
    /// # Errors
    ///
    /// Returns error if the microphone cannot be opened (fatal at startup)
    pub fn new(mut mic: M, speaker: S) -> Result<Self> {
        mic.bring_up()?;
        tracing::debug!("duplex arbiter started, mic active");

        Ok(Self {
            mic,
            speaker,
            state: DuplexState::MicActive,
            to_speaker: 0,
            to_mic: 0,
        })
    }

    /// Current pathway owner
    #[must_use]
    pub const fn state(&self) -> DuplexState {
        self.state
    }

    /// Counts of (mic-to-speaker, speaker-to-mic) transitions so far
    #[must_use]
    pub const fn transitions(&self) -> (u64, u64) {
        (self.to_speaker, self.to_mic)
    }

    /// Microphone port; only meaningful while the state is `MicActive`
    pub fn mic_mut(&mut self) -> &mut M {
        &mut self.mic
    }

    /// Speaker port; only meaningful while the state is `SpeakerActive`
    pub fn speaker_mut(&mut self) -> &mut S {
        &mut self.speaker
    }

    /// Hand the pathway from the microphone to the speaker.
    ///
    /// The microphone is fully torn down before the speaker is opened.
    ///
    /// # Errors
    ///
    /// Returns error if called outside `MicActive` or if either port fails;
    /// on failure the mic path is restored so the next turn can proceed
    pub fn enter_speaker(&mut self) -> Result<()> {
        if self.state != DuplexState::MicActive {
            return Err(Error::Audio(format!(
                "cannot enter speaker mode from {:?}",
                self.state
            )));
        }

        self.state = DuplexState::Transitioning;
        if let Err(e) = self.mic.tear_down().and_then(|()| self.speaker.bring_up()) {
            self.recover_mic();
            return Err(e);
        }
        self.state = DuplexState::SpeakerActive;
        self.to_speaker += 1;

        tracing::debug!("pathway handed to speaker");
        Ok(())
    }

    /// Hand the pathway back from the speaker to the microphone.
    ///
    /// Waits for the speaker to drain (bounded poll) before tearing it down,
    /// then reinitializes the microphone.
    ///
    /// # Errors
    ///
    /// Returns error if called outside `SpeakerActive` or if either port
    /// fails; on a failed speaker teardown the mic path is still restored
    pub async fn return_to_mic(&mut self, drain: &PollPolicy) -> Result<()> {
        if self.state != DuplexState::SpeakerActive {
            return Err(Error::Audio(format!(
                "cannot return to mic from {:?}",
                self.state
            )));
        }

        let speaker = &self.speaker;
        if poll_until(drain, || speaker.is_drained()).await == PollOutcome::TimedOut {
            tracing::warn!("speaker did not drain within budget, tearing down anyway");
        }

        self.state = DuplexState::Transitioning;
        if let Err(e) = self.speaker.tear_down() {
            self.recover_mic();
            return Err(e);
        }
        if let Err(e) = self.mic.bring_up() {
            // State still lands on the mic side; the next turn retries
            self.state = DuplexState::MicActive;
            tracing::error!(error = %e, "mic did not reopen after reply");
            return Err(e);
        }
        self.state = DuplexState::MicActive;
        self.to_mic += 1;

        tracing::debug!("pathway returned to mic");
        Ok(())
    }

    /// Best-effort return of the pathway to the microphone after a failed
    /// transition, so the arbiter never stays stuck in `Transitioning`.
    fn recover_mic(&mut self) {
        self.state = DuplexState::MicActive;
        match self.mic.bring_up() {
            Ok(()) => tracing::warn!("transition failed, mic path restored"),
            Err(e) => {
                tracing::error!(error = %e, "transition failed and mic did not reopen");
            }
        }
    }

    /// Release whichever port is open
    ///
    /// # Errors
    ///
    /// Returns error if the active port fails to close
    pub fn shutdown(mut self) -> Result<()> {
        match self.state {
            DuplexState::MicActive => self.mic.tear_down(),
            DuplexState::SpeakerActive => self.speaker.tear_down(),
            DuplexState::Transitioning => Ok(()),
        }
    }
}
