//! Server configuration loading from file and environment variables.

use chatrelay_pipeline::PipelineConfig;
use chatrelay_voice::{RendererKind, VoiceConfig};
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Queue location and drain timing.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Speech rendering and playback.
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Live chat feed source.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Command authentication.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "chatrelay_pipeline=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Where live chat events are read from.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Events for a live id are streamed from `{base_url}/{liveId}`.
    #[serde(default = "default_feed_base_url")]
    pub base_url: String,

    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
}

impl FeedConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Secret expected as a bearer token on command requests.
#[derive(Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub token: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_feed_base_url() -> String {
    "http://127.0.0.1:8080/live".to_string()
}

fn default_connect_timeout_seconds() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_base_url(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override held an unusable value.
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    /// A setting is out of its allowed range.
    #[error("invalid setting {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `CHATRELAY_HOST` overrides `server.host`
/// - `CHATRELAY_PORT` overrides `server.port`
/// - `CHATRELAY_DATA_DIR` overrides `pipeline.data_dir`
/// - `CHATRELAY_LOG_LEVEL` overrides `logging.level`
/// - `CHATRELAY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `CHATRELAY_RENDERER` overrides `voice.renderer` ("google" or "espeak")
/// - `CHATRELAY_FEED_URL` overrides `feed.base_url`
/// - `CHATRELAY_TOKEN` overrides `auth.token`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, if
/// `CHATRELAY_RENDERER` names an unknown renderer, or if a pipeline setting is
/// out of range.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.pipeline.drain_interval_ms == 0 {
        return Err(ConfigError::Invalid {
            field: "pipeline.drain_interval_ms",
            reason: "must be greater than zero",
        });
    }
    if config.pipeline.max_render_chars == 0 {
        return Err(ConfigError::Invalid {
            field: "pipeline.max_render_chars",
            reason: "must be greater than zero",
        });
    }
    Ok(())
}

/// Applies `CHATRELAY_*` overrides, reading variables through `lookup`.
fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(host) = lookup("CHATRELAY_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("CHATRELAY_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(dir) = lookup("CHATRELAY_DATA_DIR") {
        config.pipeline.data_dir = dir.into();
    }
    if let Some(level) = lookup("CHATRELAY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("CHATRELAY_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(renderer) = lookup("CHATRELAY_RENDERER") {
        config.voice.renderer = match renderer.trim().to_ascii_lowercase().as_str() {
            "google" => RendererKind::Google,
            "espeak" => RendererKind::Espeak,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    name: "CHATRELAY_RENDERER",
                    value: renderer,
                })
            }
        };
    }
    if let Some(url) = lookup("CHATRELAY_FEED_URL") {
        config.feed.base_url = url;
    }
    if let Some(token) = lookup("CHATRELAY_TOKEN") {
        config.auth.token = Some(token);
    }
    Ok(())
}
