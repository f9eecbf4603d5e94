//! `join` and `stop` command handling.

use chatrelay_types::TenantId;
use chatrelay_voice::VoiceGateway;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::CommandError;
use crate::ingest::ChatIngestor;
use crate::lifecycle::LifecycleController;
use crate::playback::PlaybackScheduler;
use crate::tenant::TenantRegistry;

/// Successful command result, shown to the user who issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    Joined,
    Left,
    NotConnected,
}

impl fmt::Display for CommandReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CommandReply::Joined => "Joined the voice channel.",
            CommandReply::Left => "Left the voice channel and stopped all processing.",
            CommandReply::NotConnected => "Not connected to any voice channel.",
        };
        f.write_str(text)
    }
}

/// Executes tenant commands against the pipeline.
///
/// Commands for the same tenant are serialized; commands for different
/// tenants run independently.
#[derive(Clone)]
pub struct CommandHandler {
    registry: Arc<TenantRegistry>,
    lifecycle: LifecycleController,
    ingestor: ChatIngestor,
    scheduler: PlaybackScheduler,
    gateway: Arc<dyn VoiceGateway>,
}

impl CommandHandler {
    pub fn new(
        registry: Arc<TenantRegistry>,
        lifecycle: LifecycleController,
        ingestor: ChatIngestor,
        scheduler: PlaybackScheduler,
        gateway: Arc<dyn VoiceGateway>,
    ) -> Self {
        Self {
            registry,
            lifecycle,
            ingestor,
            scheduler,
            gateway,
        }
    }

    pub fn registry(&self) -> &Arc<TenantRegistry> {
        &self.registry
    }

    /// Resets the tenant, connects to `voice_channel`, and starts relaying
    /// the chat of `live_id`.
    ///
    /// The reset runs before validation, so a rejected `join` still clears
    /// the queue, as every command does.
    pub async fn join(
        &self,
        tenant_id: &TenantId,
        voice_channel: Option<&str>,
        live_id: Option<&str>,
    ) -> Result<CommandReply, CommandError> {
        let tenant = self.registry.get_or_create(tenant_id).await;
        let _serial = tenant.command_lock().lock().await;

        self.lifecycle.reset(&tenant).await;

        let channel = voice_channel
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(CommandError::NotInVoiceChannel)?;
        let live_id = live_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(CommandError::MissingLiveId)?
            .to_string();

        if let Some(previous) = tenant.take_sink() {
            previous.stop().await;
            previous.disconnect().await;
        }

        let sink = self
            .gateway
            .connect(tenant_id, channel)
            .await
            .map_err(|e| {
                error!(%tenant_id, channel, "failed to join voice channel: {}", e);
                CommandError::Connect(e)
            })?;
        tenant.set_sink(Arc::clone(&sink));

        let cancel = tenant.cancel_token();

        let scheduler = self.scheduler.clone();
        let scheduled_tenant = Arc::clone(&tenant);
        let scheduler_cancel = cancel.clone();
        tenant.attach_task(tokio::spawn(async move {
            scheduler.run(scheduled_tenant, sink, scheduler_cancel).await;
        }));

        let ingestor = self.ingestor.clone();
        let ingest_tenant = Arc::clone(&tenant);
        let ingest_live_id = live_id.clone();
        tenant.attach_task(tokio::spawn(async move {
            ingestor.run(ingest_tenant, ingest_live_id, cancel).await;
        }));

        info!(%tenant_id, channel, live_id = %live_id, "relay started");
        Ok(CommandReply::Joined)
    }

    /// Resets the tenant and leaves its voice channel, if any.
    pub async fn stop(&self, tenant_id: &TenantId) -> Result<CommandReply, CommandError> {
        let tenant = self.registry.get_or_create(tenant_id).await;
        let _serial = tenant.command_lock().lock().await;

        if self.lifecycle.stop(&tenant).await {
            Ok(CommandReply::Left)
        } else {
            Ok(CommandReply::NotConnected)
        }
    }

    /// Stops every known tenant. Used on process shutdown.
    pub async fn stop_all(&self) {
        for tenant in self.registry.tenants().await {
            let _serial = tenant.command_lock().lock().await;
            self.lifecycle.stop(&tenant).await;
        }
    }
}
