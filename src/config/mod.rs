//! Configuration management for Larder
//!
//! Values resolve as env > TOML file > default.

pub mod file;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::voice::{DEFAULT_ACTIVITY_THRESHOLD, DEFAULT_SILENCE_TIMEOUT, SessionConfig};

pub use file::LarderConfigFile;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// Larder configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (database)
    pub data_dir: PathBuf,

    /// HTTP API server configuration
    pub server: ServerConfig,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,

    /// Requests per minute per client, unlimited when unset
    pub rate_limit_rpm: Option<u32>,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable voice input
    pub enabled: bool,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,

    /// Silence before a listening session auto-stops
    pub silence_timeout: Duration,

    /// Normalized energy above which audio counts as speech
    pub activity_threshold: f32,
}

impl VoiceConfig {
    /// Silence detection settings for a listening session
    #[must_use]
    pub const fn session(&self) -> SessionConfig {
        SessionConfig {
            silence_timeout: self.silence_timeout,
            activity_threshold: self.activity_threshold,
        }
    }
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (for Whisper and TTS)
    pub openai: Option<String>,
}

impl Config {
    /// Load configuration from the environment and config file
    #[must_use]
    pub fn load(disable_voice: bool) -> Self {
        let fc = file::load_config_file();
        let config = Self::from_sources(fc, |key| std::env::var(key).ok(), disable_voice);

        if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
            tracing::warn!(
                path = %config.data_dir.display(),
                error = %e,
                "failed to create data directory"
            );
        }

        config
    }

    /// Resolve configuration from a parsed file and an env lookup
    #[must_use]
    pub fn from_sources(
        fc: LarderConfigFile,
        env: impl Fn(&str) -> Option<String>,
        disable_voice: bool,
    ) -> Self {
        let flag = |key: &str| env(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        let data_dir = env("LARDER_DATA_DIR")
            .or(fc.server.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        let server = ServerConfig {
            port: parse_env(&env, "LARDER_PORT")
                .or_else(|| parse_env(&env, "PORT"))
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
            static_dir: env("LARDER_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
            rate_limit_rpm: parse_env(&env, "LARDER_RATE_LIMIT_RPM")
                .or(fc.server.rate_limit_rpm)
                .filter(|rpm| *rpm > 0),
        };

        let voice_disabled = disable_voice || flag("LARDER_DISABLE_VOICE").unwrap_or(false);
        if disable_voice {
            tracing::info!("voice explicitly disabled via --disable-voice");
        }

        let voice = VoiceConfig {
            enabled: !voice_disabled && fc.voice.enabled.unwrap_or(true),
            stt_model: env("LARDER_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| "whisper-1".to_string()),
            tts_model: env("LARDER_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| "tts-1".to_string()),
            tts_voice: env("LARDER_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| "alloy".to_string()),
            tts_speed: parse_env(&env, "LARDER_TTS_SPEED")
                .or(fc.voice.tts_speed)
                .unwrap_or(1.0_f32)
                .clamp(0.25, 4.0),
            silence_timeout: parse_env(&env, "LARDER_SILENCE_TIMEOUT_MS")
                .or(fc.voice.silence_timeout_ms)
                .map_or(DEFAULT_SILENCE_TIMEOUT, Duration::from_millis),
            activity_threshold: parse_env(&env, "LARDER_ACTIVITY_THRESHOLD")
                .or(fc.voice.activity_threshold)
                .unwrap_or(DEFAULT_ACTIVITY_THRESHOLD),
        };

        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .filter(|k| !k.is_empty()),
        };

        Self {
            data_dir,
            server,
            voice,
            api_keys,
        }
    }

    /// Path of the `SQLite` database
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("larder.db")
    }

    /// `OpenAI` key when voice is enabled and a key is configured
    #[must_use]
    pub fn voice_api_key(&self) -> Option<&str> {
        self.api_keys
            .openai
            .as_deref()
            .filter(|_| self.voice.enabled)
    }
}

fn parse_env<T: FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    env(key).and_then(|v| v.trim().parse().ok())
}

/// Default data directory: `~/.local/share/larder` on Linux
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("larder"))
}
