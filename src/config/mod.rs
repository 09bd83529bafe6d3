//! Configuration management for the talkback loop
//!
//! Values are assembled from built-in defaults, an optional TOML overlay
//! (`~/.config/talkback/config.toml`), then environment overrides for keys.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Default capture sample rate (16 kHz for speech)
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Default capture block size in samples (100 ms at 16 kHz)
pub const DEFAULT_BLOCK_SAMPLES: usize = 1_600;

/// Default maximum chunk length for spoken replies
pub const DEFAULT_CHUNK_CHARS: usize = 50;

/// Talkback configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding capture artifacts
    pub data_dir: PathBuf,

    /// Audio capture settings
    pub audio: AudioConfig,

    /// Trigger input settings
    pub trigger: TriggerConfig,

    /// Playback chunking and voice settings
    pub speech: SpeechConfig,

    /// Remote service endpoints and models
    pub services: ServicesConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Audio capture configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Digital gain as a left-shift amount (1 = x2)
    pub gain_shift: u8,

    /// Samples per capture block
    pub block_samples: usize,

    /// Maximum capture duration
    pub max_capture: Duration,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            gain_shift: 1,
            block_samples: DEFAULT_BLOCK_SAMPLES,
            max_capture: Duration::from_secs(30),
        }
    }
}

/// Trigger input configuration
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// Path to the GPIO line value file (active-low input)
    pub gpio_value_path: PathBuf,

    /// Debounce poll interval
    pub poll_interval: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            gpio_value_path: PathBuf::from("/sys/class/gpio/gpio4/value"),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Playback chunking and voice configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Maximum characters per spoken chunk
    pub max_chunk_chars: usize,

    /// TTS model
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier
    pub tts_speed: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: DEFAULT_CHUNK_CHARS,
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
        }
    }
}

/// Remote service configuration
#[derive(Debug, Clone)]
pub struct ServicesConfig {
    /// Transcription endpoint URL
    pub stt_url: String,

    /// STT model
    pub stt_model: String,

    /// Chat completion endpoint URL
    pub llm_url: String,

    /// LLM model identifier
    pub llm_model: String,

    /// Speech synthesis endpoint URL
    pub tts_url: String,

    /// System instruction sent with every completion request
    pub system_prompt: String,

    /// URL probed to decide whether the network is reachable
    pub probe_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            stt_url: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            stt_model: "whisper-1".to_string(),
            llm_url: "https://api.openai.com/v1/chat/completions".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            tts_url: "https://api.openai.com/v1/audio/speech".to_string(),
            system_prompt: "You are a helpful voice assistant. \
                            Keep responses concise and conversational."
                .to_string(),
            probe_url: "https://www.gstatic.com/generate_204".to_string(),
        }
    }
}

/// API keys for the remote services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub stt: Option<String>,
    pub llm: Option<String>,
    pub tts: Option<String>,
}

impl Config {
    /// Load configuration from defaults, the TOML overlay, and environment
    ///
    /// # Errors
    ///
    /// Returns error if no data directory can be determined
    pub fn load(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let overlay = file::load_config_file();

        let data_dir = match data_dir_override {
            Some(dir) => dir,
            None => directories::ProjectDirs::from("", "", "talkback")
                .map(|d| d.data_dir().to_path_buf())
                .ok_or_else(|| Error::Config("could not determine data directory".to_string()))?,
        };

        let mut audio = AudioConfig::default();
        if let Some(rate) = overlay.audio.sample_rate {
            audio.sample_rate = rate;
        }
        if let Some(shift) = overlay.audio.gain_shift {
            audio.gain_shift = shift;
        }
        if let Some(block) = overlay.audio.block_samples {
            audio.block_samples = block;
        }
        if let Some(secs) = overlay.audio.max_capture_secs {
            audio.max_capture = Duration::from_secs(secs);
        }

        let mut trigger = TriggerConfig::default();
        if let Some(path) = overlay.trigger.gpio_value_path {
            trigger.gpio_value_path = PathBuf::from(path);
        }
        if let Some(ms) = overlay.trigger.poll_ms {
            trigger.poll_interval = Duration::from_millis(ms);
        }

        let mut speech = SpeechConfig::default();
        if let Some(chars) = overlay.speech.max_chunk_chars {
            speech.max_chunk_chars = chars;
        }
        if let Some(model) = overlay.speech.tts_model {
            speech.tts_model = model;
        }
        if let Some(voice) = overlay.speech.tts_voice {
            speech.tts_voice = voice;
        }
        if let Some(speed) = overlay.speech.tts_speed {
            speech.tts_speed = speed;
        }

        let mut services = ServicesConfig::default();
        if let Some(url) = overlay.services.stt_url {
            services.stt_url = url;
        }
        if let Some(model) = overlay.services.stt_model {
            services.stt_model = model;
        }
        if let Some(url) = overlay.services.llm_url {
            services.llm_url = url;
        }
        if let Some(model) = overlay.services.llm_model {
            services.llm_model = model;
        }
        if let Some(url) = overlay.services.tts_url {
            services.tts_url = url;
        }
        if let Some(prompt) = overlay.services.system_prompt {
            services.system_prompt = prompt;
        }
        if let Some(url) = overlay.services.probe_url {
            services.probe_url = url;
        }

        // Environment wins over the file for keys; a single TALKBACK_API_KEY
        // covers all three services when per-service keys aren't set.
        let shared = env_key("TALKBACK_API_KEY");
        let api_keys = ApiKeys {
            stt: env_key("TALKBACK_STT_API_KEY")
                .or(overlay.api_keys.stt)
                .or_else(|| shared.clone()),
            llm: env_key("TALKBACK_LLM_API_KEY")
                .or(overlay.api_keys.llm)
                .or_else(|| shared.clone()),
            tts: env_key("TALKBACK_TTS_API_KEY")
                .or(overlay.api_keys.tts)
                .or(shared),
        };

        Ok(Self {
            data_dir,
            audio,
            trigger,
            speech,
            services,
            api_keys,
        })
    }

    /// Directory where capture artifacts are stored
    #[must_use]
    pub fn clip_dir(&self) -> PathBuf {
        self.data_dir.join("clips")
    }
}

/// Read a non-empty environment variable
fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
