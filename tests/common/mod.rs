//! Shared fake devices and services for pipeline tests

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use talkback::audio::capture::SampleSource;
use talkback::audio::duplex::{MicrophonePort, SpeakerPort};
use talkback::net::NetworkTransport;
use talkback::services::{LanguageModelService, TranscriptionService};
use talkback::session::Trigger;
use talkback::speech::Synthesizer;
use talkback::{ClipStore, Error, Result};

/// Unique temp directory for a test's clip store
#[must_use]
pub fn temp_store(tag: &str) -> ClipStore {
    let dir = std::env::temp_dir().join(format!(
        "talkback-it-{tag}-{}-{:?}",
        std::process::id(),
        std::thread::current().id()
    ));
    std::fs::remove_dir_all(&dir).ok();
    ClipStore::new(dir).expect("failed to create test clip store")
}

/// Microphone that instantly emits blocks of a constant sample value
pub struct FakeMic {
    pub fill: i16,
    pub up: Arc<AtomicBool>,
    pub bring_ups: Arc<AtomicU32>,
}

impl FakeMic {
    #[must_use]
    pub fn new(fill: i16) -> Self {
        Self {
            fill,
            up: Arc::new(AtomicBool::new(false)),
            bring_ups: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl MicrophonePort for FakeMic {
    fn bring_up(&mut self) -> Result<()> {
        self.up.store(true, Ordering::SeqCst);
        self.bring_ups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn tear_down(&mut self) -> Result<()> {
        self.up.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl SampleSource for FakeMic {
    fn read_block(&mut self, out: &mut [i16], _max_wait: Duration) -> Result<usize> {
        if !self.up.load(Ordering::SeqCst) {
            return Err(Error::Audio("mic is down".to_string()));
        }
        out.fill(self.fill);
        Ok(out.len())
    }
}

/// Speaker that stays "busy" for a fixed number of drain polls per enqueue
/// and records ordering violations.
pub struct FakeSpeaker {
    pub busy_polls: u32,
    pub up: Arc<AtomicBool>,
    remaining: Arc<AtomicU32>,
    pub enqueues: Arc<AtomicU32>,
    pub overlaps: Arc<AtomicU32>,
}

impl FakeSpeaker {
    #[must_use]
    pub fn new(busy_polls: u32) -> Self {
        Self {
            busy_polls,
            up: Arc::new(AtomicBool::new(false)),
            remaining: Arc::new(AtomicU32::new(0)),
            enqueues: Arc::new(AtomicU32::new(0)),
            overlaps: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl SpeakerPort for FakeSpeaker {
    fn bring_up(&mut self) -> Result<()> {
        self.up.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn tear_down(&mut self) -> Result<()> {
        self.up.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn enqueue(&mut self, _samples: &[f32]) -> Result<()> {
        if !self.up.load(Ordering::SeqCst) {
            return Err(Error::Audio("speaker is down".to_string()));
        }
        if self.remaining.load(Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.enqueues.fetch_add(1, Ordering::SeqCst);
        self.remaining.store(self.busy_polls, Ordering::SeqCst);
        Ok(())
    }

    fn is_drained(&self) -> bool {
        let left = self.remaining.load(Ordering::SeqCst);
        if left > 0 {
            self.remaining.store(left - 1, Ordering::SeqCst);
        }
        left == 0
    }
}

/// Trigger following a fixed script of level readings; released once the
/// script runs out.
pub struct ScriptedTrigger {
    levels: VecDeque<bool>,
}

impl ScriptedTrigger {
    #[must_use]
    pub fn new(levels: impl IntoIterator<Item = bool>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
        }
    }

    /// Held for `reads` consecutive readings, then released
    #[must_use]
    pub fn held_for(reads: usize) -> Self {
        Self::new(std::iter::repeat(true).take(reads))
    }
}

impl Trigger for ScriptedTrigger {
    fn is_held(&mut self) -> bool {
        self.levels.pop_front().unwrap_or(false)
    }
}

/// Transcriber with scripted outcomes; records request sizes
pub struct FakeStt {
    responses: Mutex<VecDeque<Result<String>>>,
    pub requests: Arc<Mutex<Vec<usize>>>,
}

impl FakeStt {
    #[must_use]
    pub fn new(responses: impl IntoIterator<Item = Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl TranscriptionService for FakeStt {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        self.requests.lock().unwrap().push(wav.len());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Stt("no scripted response".to_string())))
    }
}

/// Language model with one scripted reply; counts invocations
pub struct FakeLlm {
    reply: Result<String>,
    pub calls: Arc<AtomicU32>,
}

impl FakeLlm {
    #[must_use]
    pub fn new(reply: Result<String>) -> Self {
        Self {
            reply,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl LanguageModelService for FakeLlm {
    async fn complete(&self, _user_text: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(r) => Ok(r.clone()),
            Err(_) => Err(Error::Llm("scripted failure".to_string())),
        }
    }
}

/// Synthesizer that records every chunk it is asked to speak
pub struct FakeSynth {
    pub chunks: Arc<Mutex<Vec<String>>>,
}

impl FakeSynth {
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunks: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Synthesizer for FakeSynth {
    async fn synthesize(&self, chunk: &str) -> Result<Vec<f32>> {
        self.chunks.lock().unwrap().push(chunk.to_string());
        Ok(vec![0.1; chunk.len().max(1)])
    }
}

/// Network transport with settable reachability
pub struct FakeNet {
    pub online: Arc<AtomicBool>,
    pub reconnect_succeeds: bool,
    pub reconnects: Arc<AtomicU32>,
}

impl FakeNet {
    #[must_use]
    pub fn new(online: bool, reconnect_succeeds: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
            reconnect_succeeds,
            reconnects: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl NetworkTransport for FakeNet {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    async fn reconnect(&self) -> Result<()> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        if self.reconnect_succeeds {
            self.online.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(Error::Network("still down".to_string()))
        }
    }
}

/// Path helper for standalone WAV tests
#[must_use]
pub fn temp_wav(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "talkback-it-{tag}-{}-{:?}.wav",
        std::process::id(),
        std::thread::current().id()
    ))
}
