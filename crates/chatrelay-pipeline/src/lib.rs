//! Per-tenant chat-to-speech pipeline.
//!
//! Each tenant (one server or room) owns an independent pipeline made of two
//! concurrent tasks over shared [`TenantState`]:
//!
//! - the [`ChatIngestor`] reads a live chat feed and appends messages to the
//!   tenant's durable queue;
//! - the [`PlaybackScheduler`] wakes on a fixed period and plays every
//!   unplayed message, strictly in arrival order, through a
//!   [`SpeechRenderer`](chatrelay_voice::SpeechRenderer) and the tenant's
//!   [`AudioSink`](chatrelay_voice::AudioSink).
//!
//! The [`LifecycleController`] resets a tenant before every command and on
//! stop. Both tasks hold the tenant's current cancellation token; a reset
//! cancels it, tears down the queue, and awaits the tasks (bounded by the
//! settle delay) before arming a new one.
//!
//! # Invariants
//!
//! - Message ids increase strictly from 1 and restart at 1 after a reset.
//! - At most one drain runs per tenant at any time.
//! - `played` only ever flips from false to true.
//!
//! # Usage
//!
//! ```rust,ignore
//! let registry = Arc::new(TenantRegistry::new(MessageStore::new(&config.data_dir)));
//! let handler = CommandHandler::new(
//!     registry,
//!     LifecycleController::new(config.settle_delay()),
//!     ChatIngestor::new(feed),
//!     PlaybackScheduler::new(renderer, &config),
//!     gateway,
//! );
//! handler.join(&tenant_id, Some("voice-1"), Some("live-id")).await?;
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod lifecycle;
pub mod playback;
pub mod tenant;

pub use commands::{CommandHandler, CommandReply};
pub use config::PipelineConfig;
pub use error::{CommandError, FeedError};
pub use feed::{ChatFeed, FeedStream, HttpChatFeed};
pub use ingest::{ChatIngestor, IngestExit};
pub use lifecycle::LifecycleController;
pub use playback::{truncate_for_render, DrainOutcome, PlaybackScheduler};
pub use tenant::{DrainGuard, TenantRegistry, TenantState};
