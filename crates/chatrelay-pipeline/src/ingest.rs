//! Chat ingestion: live feed to tenant queue.

use futures_util::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::feed::ChatFeed;
use crate::tenant::TenantState;

/// Why an ingestion run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestExit {
    /// The tenant was reset or stopped.
    Cancelled,
    /// The live feed closed.
    FeedEnded,
    /// The feed could not be opened or failed mid-stream.
    FeedFailed,
}

/// Appends chat messages from a live feed to a tenant's queue.
#[derive(Clone)]
pub struct ChatIngestor {
    feed: Arc<dyn ChatFeed>,
}

impl ChatIngestor {
    pub fn new(feed: Arc<dyn ChatFeed>) -> Self {
        Self { feed }
    }

    /// Runs until cancelled or the feed ends or fails.
    ///
    /// Cancellation is checked while waiting for each event and again under
    /// the queue lock before appending, so nothing that arrives after the
    /// token fires reaches the queue. Feed errors end this tenant's
    /// ingestion only; there is no retry.
    pub async fn run(
        &self,
        tenant: Arc<TenantState>,
        live_id: String,
        cancel: CancellationToken,
    ) -> IngestExit {
        let tenant_id = tenant.id().clone();

        let opened = tokio::select! {
            () = cancel.cancelled() => return IngestExit::Cancelled,
            opened = self.feed.open(&live_id) => opened,
        };
        let mut events = match opened {
            Ok(events) => events,
            Err(e) => {
                error!(%tenant_id, live_id = %live_id, "failed to open live feed: {}", e);
                return IngestExit::FeedFailed;
            }
        };
        info!(%tenant_id, live_id = %live_id, "live chat ingestion started");

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return IngestExit::Cancelled,
                next = events.next() => next,
            };

            let action = match next {
                Some(Ok(action)) => action,
                Some(Err(e)) => {
                    error!(%tenant_id, live_id = %live_id, "error fetching live chat: {}", e);
                    return IngestExit::FeedFailed;
                }
                None => {
                    info!(%tenant_id, live_id = %live_id, "live feed ended");
                    return IngestExit::FeedEnded;
                }
            };

            let Some(draft) = action.into_draft() else {
                continue;
            };

            let mut queue = tenant.queue().lock().await;
            if cancel.is_cancelled() {
                return IngestExit::Cancelled;
            }
            match queue.append(draft).await {
                Ok(message) => {
                    debug!(%tenant_id, message_id = message.id, speaker = %message.speaker, "queued chat message")
                }
                Err(e) => warn!(%tenant_id, "failed to persist chat snapshot: {}", e),
            }
        }
    }
}
