//! TOML configuration file loading
//!
//! Supports `~/.config/talkback/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct TalkbackConfigFile {
    /// Audio capture and gain configuration
    #[serde(default)]
    pub audio: AudioFileConfig,

    /// Trigger input configuration
    #[serde(default)]
    pub trigger: TriggerFileConfig,

    /// Playback chunking and voice configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Remote service endpoints and models
    #[serde(default)]
    pub services: ServicesFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Audio capture configuration
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    /// Capture sample rate in Hz (e.g. 16000)
    pub sample_rate: Option<u32>,

    /// Digital gain as a left-shift amount (1 = x2)
    pub gain_shift: Option<u8>,

    /// Samples per capture block
    pub block_samples: Option<usize>,

    /// Maximum capture duration in seconds
    pub max_capture_secs: Option<u64>,
}

/// Trigger input configuration
#[derive(Debug, Default, Deserialize)]
pub struct TriggerFileConfig {
    /// Path to the GPIO line value file
    pub gpio_value_path: Option<String>,

    /// Debounce poll interval in milliseconds
    pub poll_ms: Option<u64>,
}

/// Playback chunking and voice configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// Maximum characters per spoken chunk
    pub max_chunk_chars: Option<usize>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,
}

/// Remote service configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServicesFileConfig {
    /// Transcription endpoint URL
    pub stt_url: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// Chat completion endpoint URL
    pub llm_url: Option<String>,

    /// LLM model identifier
    pub llm_model: Option<String>,

    /// Speech synthesis endpoint URL
    pub tts_url: Option<String>,

    /// System instruction sent with every completion request
    pub system_prompt: Option<String>,

    /// URL probed to decide whether the network is reachable
    pub probe_url: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub stt: Option<String>,
    pub llm: Option<String>,
    pub tts: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `TalkbackConfigFile::default()` if the file doesn't exist or can't
/// be parsed.
pub fn load_config_file() -> TalkbackConfigFile {
    let Some(path) = config_file_path() else {
        return TalkbackConfigFile::default();
    };

    if !path.exists() {
        return TalkbackConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                TalkbackConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            TalkbackConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/talkback/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("talkback").join("config.toml"))
}
