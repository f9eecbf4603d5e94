use crate::config::{RendererKind, VoiceConfig};
use crate::error::VoiceError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Maximum text input size for a single render (64 KiB).
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Timeout for local TTS process execution.
const TTS_PROCESS_TIMEOUT: Duration = Duration::from_secs(60);

/// Audio produced by a [`SpeechRenderer`], stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAudio {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Converts text to a playable audio file.
#[async_trait]
pub trait SpeechRenderer: Send + Sync {
    /// Renders `text` into `output`, overwriting any previous contents.
    async fn render(&self, text: &str, output: &Path) -> Result<RenderedAudio, VoiceError>;
}

/// Builds the renderer selected in `config`.
pub fn build_renderer(config: &VoiceConfig) -> Result<Arc<dyn SpeechRenderer>, VoiceError> {
    match config.renderer {
        RendererKind::Google => Ok(Arc::new(GoogleTranslateTts::new(
            &config.tts_base_url,
            &config.language,
            Duration::from_secs(config.render_timeout_seconds),
        )?)),
        RendererKind::Espeak => Ok(Arc::new(EspeakTts::new("espeak-ng", &config.language))),
    }
}

fn check_input(text: &str) -> Result<(), VoiceError> {
    if text.len() > MAX_TTS_INPUT_BYTES {
        return Err(VoiceError::Render(format!(
            "text exceeds maximum size: {} bytes (limit: {} bytes)",
            text.len(),
            MAX_TTS_INPUT_BYTES
        )));
    }
    Ok(())
}

/// Renders speech through the Google Translate TTS endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslateTts {
    client: reqwest::Client,
    endpoint: String,
    language: String,
}

impl GoogleTranslateTts {
    pub fn new(base_url: &str, language: &str, timeout: Duration) -> Result<Self, VoiceError> {
        if language.trim().is_empty() {
            return Err(VoiceError::Config("language must not be empty".to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/translate_tts", base_url.trim_end_matches('/')),
            language: language.to_string(),
        })
    }
}

#[async_trait]
impl SpeechRenderer for GoogleTranslateTts {
    async fn render(&self, text: &str, output: &Path) -> Result<RenderedAudio, VoiceError> {
        check_input(text)?;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("q", text),
                ("tl", self.language.as_str()),
                ("client", "tw-ob"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoiceError::Render(format!(
                "TTS endpoint returned {}",
                status
            )));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(VoiceError::Render("TTS endpoint returned no audio".to_string()));
        }

        tokio::fs::write(output, &audio)
            .await
            .map_err(|e| VoiceError::Render(format!("Failed to write audio file: {}", e)))?;

        Ok(RenderedAudio {
            path: output.to_path_buf(),
            bytes: audio.len() as u64,
        })
    }
}

/// Renders speech with a local `espeak-ng` process.
#[derive(Debug, Clone)]
pub struct EspeakTts {
    binary: PathBuf,
    voice: String,
}

impl EspeakTts {
    pub fn new(binary: impl AsRef<Path>, voice: &str) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
            voice: voice.to_string(),
        }
    }
}

#[async_trait]
impl SpeechRenderer for EspeakTts {
    async fn render(&self, text: &str, output: &Path) -> Result<RenderedAudio, VoiceError> {
        check_input(text)?;

        let mut command = Command::new(&self.binary);
        command
            .arg("-v")
            .arg(&self.voice)
            .arg("-w")
            .arg(output)
            .arg("--")
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|e| VoiceError::Render(format!("Failed to spawn espeak-ng: {}", e)))?;

        let result = tokio::time::timeout(TTS_PROCESS_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| {
                VoiceError::Render(format!(
                    "espeak-ng timed out after {} seconds",
                    TTS_PROCESS_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| VoiceError::Render(format!("Failed to wait for espeak-ng: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(VoiceError::Render(format!("espeak-ng failed: {}", stderr)));
        }

        let bytes = tokio::fs::metadata(output)
            .await
            .map_err(|e| VoiceError::Render(format!("espeak-ng produced no output: {}", e)))?
            .len();

        Ok(RenderedAudio {
            path: output.to_path_buf(),
            bytes,
        })
    }
}
