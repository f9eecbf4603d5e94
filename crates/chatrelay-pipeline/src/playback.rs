//! Periodic drain-and-play of a tenant's unplayed messages.

use chatrelay_types::Message;
use chatrelay_voice::{AudioSink, SpeechRenderer, VoiceError};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::tenant::TenantState;

/// Result of one drain attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The tenant was stopping or another drain held the slot.
    Skipped,
    /// Every selected message was played.
    Finished { played: Vec<u64> },
    /// Cancellation was observed between messages.
    Cancelled { played: Vec<u64> },
    /// Rendering or playback of `failed` failed; the rest of the batch waits
    /// for the next tick.
    Failed { played: Vec<u64>, failed: u64 },
}

/// Truncates `text` to at most `max_chars` characters.
pub fn truncate_for_render(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Drains a tenant's queue on a fixed period, one message at a time.
#[derive(Clone)]
pub struct PlaybackScheduler {
    renderer: Arc<dyn SpeechRenderer>,
    interval: Duration,
    max_render_chars: usize,
    announce_prefix: String,
}

impl PlaybackScheduler {
    pub fn new(renderer: Arc<dyn SpeechRenderer>, config: &PipelineConfig) -> Self {
        Self {
            renderer,
            interval: config.drain_interval(),
            max_render_chars: config.max_render_chars,
            announce_prefix: config.announce_prefix.clone(),
        }
    }

    /// The text spoken for `message`, before truncation.
    pub fn utterance(&self, message: &Message) -> String {
        if self.announce_prefix.is_empty() {
            format!("{}, {}", message.speaker, message.text)
        } else {
            format!("{} {}, {}", self.announce_prefix, message.speaker, message.text)
        }
    }

    /// Ticks every interval until `cancel` fires, draining on each tick.
    ///
    /// A tick that comes due while a drain is still running is dropped.
    pub async fn run(
        &self,
        tenant: Arc<TenantState>,
        sink: Arc<dyn AudioSink>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately; the first drain waits a full period.
        ticker.tick().await;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.drain(&tenant, sink.as_ref(), &cancel).await;
        }
        info!(tenant_id = %tenant.id(), "playback scheduler stopped");
    }

    /// Plays every currently unplayed message in arrival order.
    ///
    /// Played flags are written back and persisted once, after the batch.
    /// They are not written if the tenant was reset during the batch: the
    /// queue then belongs to the next generation.
    pub async fn drain(
        &self,
        tenant: &TenantState,
        sink: &dyn AudioSink,
        cancel: &CancellationToken,
    ) -> DrainOutcome {
        if cancel.is_cancelled() {
            return DrainOutcome::Skipped;
        }
        let Some(_slot) = tenant.try_begin_drain() else {
            return DrainOutcome::Skipped;
        };

        let (batch, artifact) = {
            let queue = tenant.queue().lock().await;
            (queue.unplayed(), queue.artifact_path().to_path_buf())
        };

        let mut played = Vec::with_capacity(batch.len());
        let mut outcome = None;

        for message in &batch {
            if cancel.is_cancelled() {
                outcome = Some(DrainOutcome::Cancelled {
                    played: played.clone(),
                });
                break;
            }

            if let Err(e) = self.play_one(tenant, sink, message, &artifact).await {
                error!(
                    tenant_id = %tenant.id(),
                    message_id = message.id,
                    "failed to play message: {}",
                    e
                );
                outcome = Some(DrainOutcome::Failed {
                    played: played.clone(),
                    failed: message.id,
                });
                break;
            }
            played.push(message.id);
        }

        if !played.is_empty() && !cancel.is_cancelled() {
            let mut queue = tenant.queue().lock().await;
            if !cancel.is_cancelled() {
                for id in &played {
                    queue.mark_played(*id);
                }
                if let Err(e) = queue.persist().await {
                    warn!(tenant_id = %tenant.id(), "failed to persist played flags: {}", e);
                }
            }
        }

        outcome.unwrap_or(DrainOutcome::Finished { played })
    }

    async fn play_one(
        &self,
        tenant: &TenantState,
        sink: &dyn AudioSink,
        message: &Message,
        artifact: &Path,
    ) -> Result<(), VoiceError> {
        let utterance = self.utterance(message);
        let text = truncate_for_render(&utterance, self.max_render_chars);
        info!(tenant_id = %tenant.id(), message_id = message.id, "{}", text);

        let audio = self.renderer.render(text, artifact).await?;
        sink.play(&audio).await?;

        match tokio::fs::remove_file(&audio.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(tenant_id = %tenant.id(), "failed to delete audio file: {}", e),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_text_is_cut_to_exact_length() {
        let text = "x".repeat(250);
        assert_eq!(truncate_for_render(&text, 200).chars().count(), 200);
    }

    #[test]
    fn short_text_passes_unchanged() {
        assert_eq!(truncate_for_render("halo", 200), "halo");
        let exact = "y".repeat(200);
        assert_eq!(truncate_for_render(&exact, 200), exact);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "é".repeat(10);
        let cut = truncate_for_render(&text, 3);
        assert_eq!(cut, "ééé");
    }
}
