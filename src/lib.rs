//! Talkback - push-to-talk voice assistant loop
//!
//! This library provides the core functionality for a single-device voice
//! turn: trigger capture, streaming WAV framing, half-duplex arbitration of
//! one audio pathway, chunked speech synthesis, and session orchestration.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                Session Orchestrator                   │
//! │   trigger edge → record → transcribe → reason → speak │
//! └───────┬───────────────┬──────────────────┬───────────┘
//!         │               │                  │
//! ┌───────▼──────┐ ┌──────▼───────┐ ┌────────▼──────────┐
//! │ Duplex       │ │ Capture +    │ │ Chunker +         │
//! │ Arbiter      │ │ WAV Framer   │ │ Narrator          │
//! └───────┬──────┘ └──────┬───────┘ └────────┬──────────┘
//!         │               │                  │
//! ┌───────▼───────────────▼──────────────────▼───────────┐
//! │   Mic / Speaker ports   │   STT / LLM / TTS services  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! The microphone and speaker share one peripheral pathway; the duplex
//! arbiter guarantees they are never open at the same time and makes exactly
//! one mic→speaker→mic round trip per spoken reply.

pub mod audio;
pub mod config;
pub mod error;
pub mod net;
pub mod retry;
pub mod services;
pub mod session;
pub mod speech;
pub mod storage;

pub use audio::{CpalMicrophone, CpalSpeaker, DuplexArbiter, DuplexState};
pub use config::Config;
pub use error::{Error, Result};
pub use net::{ensure_online, HttpProbe, NetworkTransport};
pub use retry::{poll_until, PollOutcome, PollPolicy};
pub use services::{
    ChatClient, LanguageModelService, SynthesisClient, TranscriberClient, TranscriptionService,
};
pub use session::{
    GpioLineTrigger, SessionOptions, SessionPhase, SessionRunner, Trigger, APOLOGY_PHRASE,
    FALLBACK_PHRASE,
};
pub use speech::{chunk_reply, speak_reply, Synthesizer};
pub use storage::{ClipGuard, ClipStore};
