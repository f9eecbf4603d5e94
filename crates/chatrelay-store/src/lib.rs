//! Durable per-tenant message queue.
//!
//! Each tenant's queue lives in memory as a [`TenantQueue`] and is mirrored
//! to a pretty-printed JSON snapshot, `chats_{tenant}.json`, inside the
//! store's data directory. Every mutation that must be durable rewrites the
//! whole snapshot: the new contents go to a temporary sibling first and are
//! renamed over the old file, so a reader never observes a half-written
//! snapshot.
//!
//! The store performs no locking of its own. Callers serialize all mutation
//! of one tenant's queue (the pipeline keeps each queue behind an async
//! mutex).
//!
//! # Usage
//!
//! ```rust,ignore
//! let store = MessageStore::new("./data");
//! let mut queue = store.open(&tenant_id).await;
//! let message = queue.append(MessageDraft::new("alice", "hi")).await?;
//! queue.mark_played(message.id);
//! queue.persist().await?;
//! ```

mod error;
mod queue;

pub use error::StoreError;
pub use queue::{MessageStore, TenantQueue};

#[cfg(test)]
mod tests;
