//! Per-tenant runtime state and the registry that owns it.

use chatrelay_store::{MessageStore, TenantQueue};
use chatrelay_types::TenantId;
use chatrelay_voice::AudioSink;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Locks a std mutex, recovering the guard if a panicking thread poisoned it.
///
/// Every value guarded this way stays consistent across a panic (a token, a
/// list of handles, an optional sink).
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!("tenant state lock poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Runtime state of one tenant.
///
/// Created once per tenant by [`TenantRegistry::get_or_create`] and kept for
/// the life of the process; a reset clears its queue and flags but never
/// replaces it.
///
/// The std mutexes here are only held for field swaps and never across an
/// `.await`. The queue uses an async mutex because snapshot writes happen
/// while it is held.
pub struct TenantState {
    id: TenantId,
    queue: tokio::sync::Mutex<TenantQueue>,
    processing: AtomicBool,
    cancel: Mutex<CancellationToken>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    sink: Mutex<Option<Arc<dyn AudioSink>>>,
    commands: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for TenantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantState")
            .field("id", &self.id)
            .field("processing", &self.is_processing())
            .field("should_stop", &self.should_stop())
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl TenantState {
    pub fn new(id: TenantId, queue: TenantQueue) -> Self {
        Self {
            id,
            queue: tokio::sync::Mutex::new(queue),
            processing: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
            tasks: Mutex::new(Vec::new()),
            sink: Mutex::new(None),
            commands: tokio::sync::Mutex::new(()),
        }
    }

    pub fn id(&self) -> &TenantId {
        &self.id
    }

    /// The tenant's message queue. All store mutation goes through this lock.
    pub fn queue(&self) -> &tokio::sync::Mutex<TenantQueue> {
        &self.queue
    }

    /// Serializes command handling for this tenant.
    pub fn command_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.commands
    }

    /// Token of the current generation. Cancelled by the next reset.
    pub fn cancel_token(&self) -> CancellationToken {
        lock(&self.cancel).clone()
    }

    pub fn should_stop(&self) -> bool {
        lock(&self.cancel).is_cancelled()
    }

    /// Cancels the current generation's tasks.
    pub fn signal_stop(&self) {
        lock(&self.cancel).cancel();
    }

    /// Starts a new generation with a fresh, uncancelled token.
    pub fn rearm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *lock(&self.cancel) = token.clone();
        token
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    pub fn clear_processing(&self) {
        self.processing.store(false, Ordering::Release);
    }

    /// Claims the drain slot. Returns `None` if a drain is already running.
    pub fn try_begin_drain(&self) -> Option<DrainGuard<'_>> {
        self.processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard { tenant: self })
    }

    /// Registers a running task so a reset can await or abort it.
    pub fn attach_task(&self, handle: JoinHandle<()>) {
        let mut tasks = lock(&self.tasks);
        tasks.retain(|h| !h.is_finished());
        tasks.push(handle);
    }

    pub fn take_tasks(&self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut *lock(&self.tasks))
    }

    pub fn sink(&self) -> Option<Arc<dyn AudioSink>> {
        lock(&self.sink).clone()
    }

    pub fn set_sink(&self, sink: Arc<dyn AudioSink>) {
        *lock(&self.sink) = Some(sink);
    }

    pub fn take_sink(&self) -> Option<Arc<dyn AudioSink>> {
        lock(&self.sink).take()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.sink).is_some()
    }
}

/// Holds a tenant's drain slot; releases it on drop.
pub struct DrainGuard<'a> {
    tenant: &'a TenantState,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.tenant.clear_processing();
    }
}

/// Maps tenant ids to their state. Constructed once at startup.
#[derive(Debug)]
pub struct TenantRegistry {
    store: MessageStore,
    tenants: RwLock<HashMap<TenantId, Arc<TenantState>>>,
}

impl TenantRegistry {
    pub fn new(store: MessageStore) -> Self {
        Self {
            store,
            tenants: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Returns the tenant's state, creating it on first use.
    ///
    /// A new tenant starts from whatever snapshot is on disk (empty if none).
    pub async fn get_or_create(&self, id: &TenantId) -> Arc<TenantState> {
        if let Some(existing) = self.get(id).await {
            return existing;
        }

        let queue = self.store.open(id).await;
        let mut tenants = self.tenants.write().await;
        let state = tenants.entry(id.clone()).or_insert_with(|| {
            tracing::info!(tenant_id = %id, "registered tenant");
            Arc::new(TenantState::new(id.clone(), queue))
        });
        Arc::clone(state)
    }

    pub async fn get(&self, id: &TenantId) -> Option<Arc<TenantState>> {
        self.tenants.read().await.get(id).cloned()
    }

    pub async fn tenants(&self) -> Vec<Arc<TenantState>> {
        self.tenants.read().await.values().cloned().collect()
    }
}
