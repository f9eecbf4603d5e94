use serde::{Deserialize, Serialize};

fn default_language() -> String {
    "id".to_string()
}

fn default_tts_base_url() -> String {
    "https://translate.google.com".to_string()
}

fn default_render_timeout_seconds() -> u64 {
    30
}

fn default_player_program() -> String {
    "ffplay".to_string()
}

fn default_player_args() -> Vec<String> {
    ["-nodisp", "-autoexit", "-loglevel", "quiet"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Speech backend used to render chat messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    /// Google Translate TTS over HTTPS (MP3 output).
    #[default]
    Google,
    /// Local `espeak-ng` process (WAV output).
    Espeak,
}

/// Rendering and playback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default)]
    pub renderer: RendererKind,
    /// Language code passed to the speech backend.
    #[serde(default = "default_language")]
    pub language: String,
    /// Base URL of the Google Translate TTS endpoint.
    #[serde(default = "default_tts_base_url")]
    pub tts_base_url: String,
    /// Upper bound on a single HTTP render request, in seconds.
    #[serde(default = "default_render_timeout_seconds")]
    pub render_timeout_seconds: u64,
    /// Audio player executable. It is invoked with `player_args` followed by
    /// the artifact path and must exit once playback finishes.
    #[serde(default = "default_player_program")]
    pub player_program: String,
    #[serde(default = "default_player_args")]
    pub player_args: Vec<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            renderer: RendererKind::default(),
            language: default_language(),
            tts_base_url: default_tts_base_url(),
            render_timeout_seconds: default_render_timeout_seconds(),
            player_program: default_player_program(),
            player_args: default_player_args(),
        }
    }
}
