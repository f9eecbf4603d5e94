//! Tenant reset and stop.
//!
//! A reset runs in four phases, in this order:
//!
//! 1. **Signal**: cancel the tenant's current token and release the drain
//!    slot.
//! 2. **Teardown**: delete the snapshot and the rendered-audio artifact and
//!    empty the in-memory queue.
//! 3. **Settle**: await the tenant's tasks, for at most the settle delay;
//!    abort whatever is still running after that.
//! 4. **Resume**: arm a fresh token and write an empty snapshot.
//!
//! Cancelling before deleting keeps an in-flight append or drain from
//! writing the snapshot back mid-teardown: both re-check the token under the
//! queue lock before touching it. A task blocked inside a render or playback
//! call only notices cancellation when that call returns, which is why the
//! settle phase is bounded and ends in an abort.

use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use crate::tenant::TenantState;

/// Runs resets and stops against tenant state.
#[derive(Debug, Clone)]
pub struct LifecycleController {
    settle_delay: Duration,
}

impl LifecycleController {
    pub fn new(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }

    /// Returns the tenant to an empty, uncancelled state with no running
    /// tasks. Safe to call repeatedly.
    pub async fn reset(&self, tenant: &TenantState) {
        // Signal
        tenant.signal_stop();
        tenant.clear_processing();

        // Teardown
        {
            let mut queue = tenant.queue().lock().await;
            if let Err(e) = queue.clear().await {
                warn!(tenant_id = %tenant.id(), "failed to delete chat snapshot: {}", e);
            }
            if let Err(e) = queue.remove_artifact().await {
                warn!(tenant_id = %tenant.id(), "failed to delete audio artifact: {}", e);
            }
        }

        // Settle
        self.settle(tenant).await;

        // Resume
        tenant.rearm();
        tenant.clear_processing();
        let queue = tenant.queue().lock().await;
        if let Err(e) = queue.persist().await {
            error!(tenant_id = %tenant.id(), "failed to initialize chat snapshot: {}", e);
        }
        // A render that was in flight during teardown may have written it again.
        if let Err(e) = queue.remove_artifact().await {
            warn!(tenant_id = %tenant.id(), "failed to delete audio artifact: {}", e);
        }
        info!(tenant_id = %tenant.id(), "tenant reset");
    }

    /// Resets the tenant, then halts playback and releases its connection.
    ///
    /// Returns `false` if the tenant had no connection.
    pub async fn stop(&self, tenant: &TenantState) -> bool {
        self.reset(tenant).await;

        match tenant.take_sink() {
            Some(sink) => {
                sink.stop().await;
                sink.disconnect().await;
                info!(tenant_id = %tenant.id(), "left voice channel");
                true
            }
            None => false,
        }
    }

    async fn settle(&self, tenant: &TenantState) {
        let deadline = Instant::now() + self.settle_delay;

        for mut handle in tenant.take_tasks() {
            match timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_panic() => {
                    error!(tenant_id = %tenant.id(), "tenant task panicked: {}", e);
                }
                Ok(Err(_)) => {}
                Err(_) => {
                    warn!(tenant_id = %tenant.id(), "task did not stop within settle delay, aborting");
                    handle.abort();
                    let _ = handle.await;
                }
            }
        }
    }
}
