use crate::config::VoiceConfig;
use crate::error::VoiceError;
use crate::tts::RenderedAudio;
use async_trait::async_trait;
use chatrelay_types::TenantId;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Notify;
use tracing::{info, warn};

/// Audio output bound to one tenant's voice connection.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Plays `audio` and resolves only once playback has finished.
    async fn play(&self, audio: &RenderedAudio) -> Result<(), VoiceError>;

    /// Halts playback in progress. A pending `play` resolves promptly.
    async fn stop(&self);

    /// Releases the connection. Later `play` calls fail with `NotConnected`.
    async fn disconnect(&self);
}

/// Opens voice connections for tenants.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    async fn connect(
        &self,
        tenant_id: &TenantId,
        channel: &str,
    ) -> Result<Arc<dyn AudioSink>, VoiceError>;
}

/// Gateway that plays audio locally through an external player process.
#[derive(Debug, Clone)]
pub struct CommandPlayerGateway {
    program: String,
    args: Vec<String>,
}

impl CommandPlayerGateway {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &VoiceConfig) -> Self {
        Self::new(config.player_program.clone(), config.player_args.clone())
    }
}

#[async_trait]
impl VoiceGateway for CommandPlayerGateway {
    async fn connect(
        &self,
        tenant_id: &TenantId,
        channel: &str,
    ) -> Result<Arc<dyn AudioSink>, VoiceError> {
        if self.program.trim().is_empty() {
            return Err(VoiceError::Connect("player program is not configured".to_string()));
        }
        info!(%tenant_id, channel, program = %self.program, "opened local playback connection");
        Ok(Arc::new(CommandPlayer {
            tenant_id: tenant_id.clone(),
            program: self.program.clone(),
            args: self.args.clone(),
            halt: Notify::new(),
            connected: AtomicBool::new(true),
        }))
    }
}

/// A connection whose output is an external player process per clip.
///
/// The player's exit is the "playback finished" signal.
#[derive(Debug)]
pub struct CommandPlayer {
    tenant_id: TenantId,
    program: String,
    args: Vec<String>,
    halt: Notify,
    connected: AtomicBool,
}

#[async_trait]
impl AudioSink for CommandPlayer {
    async fn play(&self, audio: &RenderedAudio) -> Result<(), VoiceError> {
        // Registered before the player starts so a `stop` that lands while it
        // is spawning still ends this clip.
        let halted = self.halt.notified();
        tokio::pin!(halted);
        halted.as_mut().enable();

        if !self.connected.load(Ordering::Acquire) {
            return Err(VoiceError::NotConnected);
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&audio.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VoiceError::Playback(format!("Failed to spawn player: {}", e)))?;

        info!(tenant_id = %self.tenant_id, bytes = audio.bytes, "playing audio");

        tokio::select! {
            status = child.wait() => {
                let status = status
                    .map_err(|e| VoiceError::Playback(format!("Failed to wait for player: {}", e)))?;
                if status.success() {
                    Ok(())
                } else {
                    Err(VoiceError::Playback(format!("player exited with {}", status)))
                }
            }
            () = &mut halted => {
                if let Err(e) = child.kill().await {
                    warn!(tenant_id = %self.tenant_id, "failed to kill player: {}", e);
                }
                Ok(())
            }
        }
    }

    async fn stop(&self) {
        self.halt.notify_waiters();
    }

    async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            self.halt.notify_waiters();
            info!(tenant_id = %self.tenant_id, "released playback connection");
        }
    }
}
