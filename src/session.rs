//! Session orchestration
//!
//! One turn runs `Idle → Recording → Transcribing → Reasoning → Speaking →
//! Idle`, strictly in order, on a single cooperative loop. The trigger is
//! edge-detected at a fixed poll interval and ignored while a turn is in
//! flight. Every network stage checks reachability with one reconnect
//! attempt; the capture artifact is deleted on every branch by a drop guard.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::capture::{capture, CaptureOptions, SampleSource};
use crate::audio::duplex::{DuplexArbiter, MicrophonePort, SpeakerPort};
use crate::audio::wav::WavArtifact;
use crate::config::Config;
use crate::net::{ensure_online, NetworkTransport};
use crate::retry::PollPolicy;
use crate::services::{LanguageModelService, TranscriptionService};
use crate::speech::narrator::{speak_reply, Synthesizer};
use crate::storage::{ClipGuard, ClipStore};
use crate::Result;

/// Spoken when the clip could not be transcribed
pub const APOLOGY_PHRASE: &str = "I couldn't understand what you said. Please try again.";

/// Spoken when the language model produced nothing usable
pub const FALLBACK_PHRASE: &str =
    "I'm having trouble coming up with an answer right now. Please try again.";

/// Physical trigger input driving the session
pub trait Trigger {
    /// Whether the trigger is currently held down
    fn is_held(&mut self) -> bool;
}

/// Active-low trigger backed by a GPIO line value file
pub struct GpioLineTrigger {
    path: PathBuf,
}

impl GpioLineTrigger {
    /// Trigger reading the line level from `path`
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Trigger for GpioLineTrigger {
    fn is_held(&mut self) -> bool {
        match std::fs::read_to_string(&self.path) {
            // Active-low: the line reads 0 while the button is pressed
            Ok(level) => level.trim() == "0",
            Err(e) => {
                tracing::trace!(path = %self.path.display(), error = %e, "trigger read failed");
                false
            }
        }
    }
}

/// Stage of the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for a trigger edge
    Idle,
    /// Capturing microphone audio to the clip
    Recording,
    /// Clip sent to the transcription service
    Transcribing,
    /// Transcript sent to the language model
    Reasoning,
    /// Reply streaming through the speaker
    Speaking,
}

/// Tunable parameters of the session loop
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Trigger debounce poll interval
    pub trigger_poll: Duration,
    /// Capture parameters
    pub capture: CaptureOptions,
    /// Clip sample rate in Hz
    pub sample_rate: u32,
    /// Maximum characters per spoken chunk
    pub max_chunk_chars: usize,
    /// Speaker drain poll policy
    pub drain: PollPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            trigger_poll: Duration::from_millis(50),
            capture: CaptureOptions::default(),
            sample_rate: crate::config::DEFAULT_SAMPLE_RATE,
            max_chunk_chars: crate::config::DEFAULT_CHUNK_CHARS,
            drain: PollPolicy::default(),
        }
    }
}

impl SessionOptions {
    /// Derive session options from the loaded configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            trigger_poll: config.trigger.poll_interval,
            capture: CaptureOptions {
                block_samples: config.audio.block_samples,
                read_wait: Duration::from_millis(100),
                max_duration: config.audio.max_capture,
                gain_shift: config.audio.gain_shift,
            },
            sample_rate: config.audio.sample_rate,
            max_chunk_chars: config.speech.max_chunk_chars,
            drain: PollPolicy::default(),
        }
    }
}

/// The top-level control loop over one device's voice turns
pub struct SessionRunner<M, S, T> {
    arbiter: DuplexArbiter<M, S>,
    trigger: T,
    store: ClipStore,
    stt: Box<dyn TranscriptionService>,
    llm: Box<dyn LanguageModelService>,
    synth: Box<dyn Synthesizer>,
    net: Box<dyn NetworkTransport>,
    opts: SessionOptions,
    phase: SessionPhase,
    prev_held: bool,
    turns: u64,
}

impl<M, S, T> SessionRunner<M, S, T>
where
    M: MicrophonePort + SampleSource,
    S: SpeakerPort,
    T: Trigger,
{
    /// Assemble a runner from its collaborators
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        arbiter: DuplexArbiter<M, S>,
        trigger: T,
        store: ClipStore,
        stt: Box<dyn TranscriptionService>,
        llm: Box<dyn LanguageModelService>,
        synth: Box<dyn Synthesizer>,
        net: Box<dyn NetworkTransport>,
        opts: SessionOptions,
    ) -> Self {
        Self {
            arbiter,
            trigger,
            store,
            stt,
            llm,
            synth,
            net,
            opts,
            phase: SessionPhase::Idle,
            prev_held: false,
            turns: 0,
        }
    }

    /// Current stage of the loop
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Completed turns since startup
    #[must_use]
    pub const fn turns(&self) -> u64 {
        self.turns
    }

    /// Duplex arbiter, for state and transition inspection
    #[must_use]
    pub const fn arbiter(&self) -> &DuplexArbiter<M, S> {
        &self.arbiter
    }

    /// Run the session loop until the task is cancelled
    ///
    /// # Errors
    ///
    /// Never returns an error in practice; failures inside a turn degrade
    /// and the loop keeps polling
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("session loop started, waiting for trigger");
        loop {
            tokio::time::sleep(self.opts.trigger_poll).await;
            self.tick().await;
        }
    }

    /// One debounce tick: sample the trigger and run a turn on a rising edge.
    ///
    /// Edges observed while a turn is already running never start another
    /// one; the turn runs to completion within the tick.
    pub async fn tick(&mut self) {
        let held = self.trigger.is_held();
        let edge = held && !self.prev_held;
        self.prev_held = held;

        if edge && self.phase == SessionPhase::Idle {
            self.run_turn().await;
            // Re-sample so a still-held trigger doesn't edge again
            self.prev_held = self.trigger.is_held();
        }
    }

    /// Drive one complete turn; always lands back in `Idle`
    async fn run_turn(&mut self) {
        tracing::info!(turn = self.turns + 1, "trigger pressed, session started");

        self.phase = SessionPhase::Recording;
        let clip = ClipGuard::new(self.store.new_clip_path());

        let recorded = match self.record_clip(clip.path()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "recording failed");
                self.phase = SessionPhase::Idle;
                return;
            }
        };

        self.phase = SessionPhase::Transcribing;
        if !ensure_online(self.net.as_ref()).await {
            self.phase = SessionPhase::Idle;
            return;
        }

        let transcript = if recorded == 0 {
            tracing::warn!("nothing captured");
            None
        } else {
            self.transcribe_clip(clip.path()).await
        };

        // Deleted here, after transcription, whatever the outcome
        drop(clip);

        let Some(text) = transcript else {
            self.phase = SessionPhase::Speaking;
            self.speak_text(APOLOGY_PHRASE).await;
            self.finish_turn();
            return;
        };

        self.phase = SessionPhase::Reasoning;
        if !ensure_online(self.net.as_ref()).await {
            self.phase = SessionPhase::Idle;
            return;
        }

        let reply = match self.llm.complete(&text).await {
            Ok(r) if !r.trim().is_empty() => r,
            Ok(_) => {
                tracing::warn!("model returned an empty reply");
                FALLBACK_PHRASE.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "reasoning failed");
                FALLBACK_PHRASE.to_string()
            }
        };

        self.phase = SessionPhase::Speaking;
        self.speak_text(&reply).await;
        self.finish_turn();
    }

    /// Capture gain-adjusted audio into a finalized WAV clip
    fn record_clip(&mut self, path: &Path) -> Result<u64> {
        let mut artifact = WavArtifact::create(path, self.opts.sample_rate)?;

        let trigger = &mut self.trigger;
        let capture_opts = &self.opts.capture;
        let mic = self.arbiter.mic_mut();

        let written = capture(|| trigger.is_held(), mic, &mut artifact, capture_opts)?;
        let declared = artifact.finalize()?;
        debug_assert_eq!(u64::from(declared), written);

        tracing::info!(bytes = written, "clip recorded");
        Ok(written)
    }

    /// Transcribe the clip; any failure is an explicit absence for the turn
    async fn transcribe_clip(&mut self, path: &Path) -> Option<String> {
        let wav = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "could not read clip back");
                return None;
            }
        };

        match self.stt.transcribe(wav).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                tracing::warn!("transcription came back empty");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                None
            }
        }
    }

    /// Speak `text` through one speaker round trip; failures degrade to logs
    async fn speak_text(&mut self, text: &str) {
        if !ensure_online(self.net.as_ref()).await {
            tracing::warn!(text, "offline, dropping spoken message");
            return;
        }

        if let Err(e) = self.arbiter.enter_speaker() {
            tracing::error!(error = %e, "could not enter speaker mode");
            return;
        }

        let max_chunk = self.opts.max_chunk_chars;
        let synth = &*self.synth;
        let speaker = self.arbiter.speaker_mut();
        if let Err(e) = speak_reply(synth, speaker, text, max_chunk, &self.opts.drain).await {
            tracing::error!(error = %e, "playback failed mid-reply");
        }

        if let Err(e) = self.arbiter.return_to_mic(&self.opts.drain).await {
            tracing::error!(error = %e, "could not return pathway to mic");
        }
    }

    fn finish_turn(&mut self) {
        self.turns += 1;
        self.phase = SessionPhase::Idle;
        tracing::info!(turn = self.turns, "session complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpio_trigger_is_active_low() {
        let path = std::env::temp_dir().join(format!("talkback-gpio-{}", std::process::id()));

        std::fs::write(&path, "0\n").unwrap();
        let mut trigger = GpioLineTrigger::new(path.clone());
        assert!(trigger.is_held());

        std::fs::write(&path, "1\n").unwrap();
        assert!(!trigger.is_held());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_gpio_line_reads_as_released() {
        let mut trigger =
            GpioLineTrigger::new(PathBuf::from("/nonexistent/talkback/gpio/value"));
        assert!(!trigger.is_held());
    }

    #[test]
    fn options_follow_config() {
        let config = Config::load(Some(std::env::temp_dir())).unwrap();
        let opts = SessionOptions::from_config(&config);
        assert_eq!(opts.sample_rate, config.audio.sample_rate);
        assert_eq!(opts.max_chunk_chars, config.speech.max_chunk_chars);
        assert_eq!(opts.trigger_poll, config.trigger.poll_interval);
    }
}
