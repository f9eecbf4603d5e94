//! Shared fakes for pipeline integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chatrelay_pipeline::{
    ChatFeed, ChatIngestor, CommandHandler, FeedError, FeedStream, LifecycleController,
    PipelineConfig, PlaybackScheduler, TenantRegistry, TenantState,
};
use chatrelay_store::MessageStore;
use chatrelay_types::{FeedAction, MessageRun, TenantId};
use chatrelay_voice::{AudioSink, RenderedAudio, SpeechRenderer, VoiceError, VoiceGateway};
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, Notify, Semaphore};

pub fn tenant_id(id: &str) -> TenantId {
    TenantId::new(id).unwrap()
}

pub fn chat(author: &str, text: &str) -> FeedAction {
    FeedAction::AddChatItem {
        author_name: author.to_string(),
        message: vec![MessageRun::Text {
            text: text.to_string(),
        }],
    }
}

pub fn test_config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        data_dir: dir.to_path_buf(),
        drain_interval_ms: 50,
        settle_delay_ms: 200,
        ..PipelineConfig::default()
    }
}

/// Polls `check` until it holds or `limit` elapses.
pub async fn wait_until(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Renderer that writes the text itself into the output file.
#[derive(Default)]
pub struct FakeRenderer {
    rendered: Mutex<Vec<String>>,
    fail_containing: Mutex<Option<String>>,
}

impl FakeRenderer {
    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }

    pub fn fail_when_containing(&self, needle: Option<&str>) {
        *self.fail_containing.lock().unwrap() = needle.map(str::to_string);
    }
}

#[async_trait]
impl SpeechRenderer for FakeRenderer {
    async fn render(&self, text: &str, output: &Path) -> Result<RenderedAudio, VoiceError> {
        let fail = self.fail_containing.lock().unwrap().clone();
        if let Some(needle) = fail {
            if text.contains(&needle) {
                return Err(VoiceError::Render(format!("refusing {:?}", text)));
            }
        }
        self.rendered.lock().unwrap().push(text.to_string());
        tokio::fs::write(output, text.as_bytes())
            .await
            .map_err(|e| VoiceError::Render(e.to_string()))?;
        Ok(RenderedAudio {
            path: output.to_path_buf(),
            bytes: text.len() as u64,
        })
    }
}

/// Sink that records what it played. Optionally waits for a permit per clip.
pub struct RecordingSink {
    played: Mutex<Vec<String>>,
    gate: Option<Semaphore>,
    halt: Notify,
    active: AtomicUsize,
    max_active: AtomicUsize,
    stopped: AtomicBool,
    disconnected: AtomicBool,
}

impl RecordingSink {
    fn build(gate: Option<Semaphore>) -> Self {
        Self {
            played: Mutex::new(Vec::new()),
            gate,
            halt: Notify::new(),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        }
    }

    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(None))
    }

    /// Each `play` blocks until [`release`](Self::release) grants a permit.
    pub fn gated() -> Arc<Self> {
        Arc::new(Self::build(Some(Semaphore::new(0))))
    }

    pub fn release(&self, clips: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(clips);
        }
    }

    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }

    /// Number of `play` calls currently in progress.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, audio: &RenderedAudio) -> Result<(), VoiceError> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(VoiceError::NotConnected);
        }
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        let text = tokio::fs::read_to_string(&audio.path)
            .await
            .map_err(|e| VoiceError::Playback(e.to_string()))?;

        if let Some(gate) = &self.gate {
            tokio::select! {
                permit = gate.acquire() => {
                    if let Ok(permit) = permit {
                        permit.forget();
                    }
                }
                () = self.halt.notified() => {}
            }
        }

        self.played.lock().unwrap().push(text);
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.halt.notify_waiters();
    }

    async fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

/// Gateway handing out one fresh [`RecordingSink`] per connection.
#[derive(Default)]
pub struct FakeGateway {
    sinks: Mutex<Vec<(TenantId, Arc<RecordingSink>)>>,
    refuse: AtomicBool,
}

impl FakeGateway {
    pub fn refuse_connections(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.sinks.lock().unwrap().len()
    }

    /// The most recent sink opened for `tenant`.
    pub fn sink_for(&self, tenant: &TenantId) -> Option<Arc<RecordingSink>> {
        self.sinks
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(t, _)| t == tenant)
            .map(|(_, s)| Arc::clone(s))
    }
}

#[async_trait]
impl VoiceGateway for FakeGateway {
    async fn connect(
        &self,
        tenant_id: &TenantId,
        _channel: &str,
    ) -> Result<Arc<dyn AudioSink>, VoiceError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(VoiceError::Connect("refused".to_string()));
        }
        let sink = RecordingSink::new();
        self.sinks
            .lock()
            .unwrap()
            .push((tenant_id.clone(), Arc::clone(&sink)));
        Ok(sink)
    }
}

type FeedItem = Result<FeedAction, FeedError>;

/// Feed whose events are pushed by the test, one channel per live id.
#[derive(Default)]
pub struct ChannelFeed {
    pending: Mutex<HashMap<String, mpsc::UnboundedReceiver<FeedItem>>>,
}

impl ChannelFeed {
    /// Registers `live_id` and returns the sender that drives it.
    pub fn channel(&self, live_id: &str) -> mpsc::UnboundedSender<FeedItem> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.pending.lock().unwrap().insert(live_id.to_string(), rx);
        tx
    }
}

#[async_trait]
impl ChatFeed for ChannelFeed {
    async fn open(&self, live_id: &str) -> Result<FeedStream, FeedError> {
        let rx = self
            .pending
            .lock()
            .unwrap()
            .remove(live_id)
            .ok_or_else(|| FeedError::Unavailable(format!("unknown live id {}", live_id)))?;
        Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed())
    }
}

/// A wired-up pipeline over fakes, rooted in a temporary directory.
pub struct Harness {
    pub dir: TempDir,
    pub config: PipelineConfig,
    pub store: MessageStore,
    pub registry: Arc<TenantRegistry>,
    pub renderer: Arc<FakeRenderer>,
    pub gateway: Arc<FakeGateway>,
    pub feed: Arc<ChannelFeed>,
    pub scheduler: PlaybackScheduler,
    pub lifecycle: LifecycleController,
    pub handler: CommandHandler,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let store = MessageStore::new(dir.path());
        let registry = Arc::new(TenantRegistry::new(store.clone()));
        let renderer = Arc::new(FakeRenderer::default());
        let gateway = Arc::new(FakeGateway::default());
        let feed = Arc::new(ChannelFeed::default());
        let scheduler = PlaybackScheduler::new(renderer.clone(), &config);
        let lifecycle = LifecycleController::new(config.settle_delay());
        let handler = CommandHandler::new(
            Arc::clone(&registry),
            lifecycle.clone(),
            ChatIngestor::new(feed.clone()),
            scheduler.clone(),
            gateway.clone(),
        );
        Self {
            dir,
            config,
            store,
            registry,
            renderer,
            gateway,
            feed,
            scheduler,
            lifecycle,
            handler,
        }
    }

    pub async fn tenant(&self, id: &str) -> Arc<TenantState> {
        self.registry.get_or_create(&tenant_id(id)).await
    }

    /// Messages as persisted on disk for `id`.
    pub fn snapshot(&self, id: &str) -> Option<Vec<chatrelay_types::Message>> {
        let raw = std::fs::read_to_string(self.store.snapshot_path(&tenant_id(id))).ok()?;
        Some(serde_json::from_str(&raw).unwrap())
    }
}
