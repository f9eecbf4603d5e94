//! Snapshot-backed queue operations.

use chatrelay_types::{Message, MessageDraft, TenantId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Resolves snapshot and artifact locations for all tenants.
#[derive(Debug, Clone)]
pub struct MessageStore {
    data_dir: PathBuf,
}

impl MessageStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the tenant's persisted snapshot.
    pub fn snapshot_path(&self, tenant_id: &TenantId) -> PathBuf {
        self.data_dir.join(format!("chats_{}.json", tenant_id))
    }

    /// Path of the tenant's transient rendered-audio file.
    pub fn artifact_path(&self, tenant_id: &TenantId) -> PathBuf {
        self.data_dir.join(format!("output_{}.mp3", tenant_id))
    }

    /// Opens the tenant's queue, loading whatever snapshot is on disk.
    ///
    /// A missing snapshot is created empty. A snapshot that cannot be read or
    /// parsed is logged and treated as empty; it is overwritten on the next
    /// persist.
    pub async fn open(&self, tenant_id: &TenantId) -> TenantQueue {
        let mut queue = TenantQueue {
            tenant_id: tenant_id.clone(),
            snapshot_path: self.snapshot_path(tenant_id),
            artifact_path: self.artifact_path(tenant_id),
            messages: Vec::new(),
            next_id: 1,
        };
        queue.load().await;
        queue
    }
}

/// In-memory queue of one tenant, mirrored to its snapshot file.
#[derive(Debug)]
pub struct TenantQueue {
    tenant_id: TenantId,
    snapshot_path: PathBuf,
    artifact_path: PathBuf,
    messages: Vec<Message>,
    next_id: u64,
}

impl TenantQueue {
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// All queued messages in arrival order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The id the next appended message will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Replaces the in-memory queue with the persisted snapshot.
    ///
    /// Returns the loaded messages. Never fails: errors are logged and yield
    /// an empty queue.
    pub async fn load(&mut self) -> &[Message] {
        if let Err(e) = self.initialize().await {
            tracing::error!(tenant_id = %self.tenant_id, "failed to initialize snapshot: {}", e);
        }

        self.messages = match read_snapshot(&self.snapshot_path).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!(
                    tenant_id = %self.tenant_id,
                    path = %self.snapshot_path.display(),
                    "failed to load snapshot, starting empty: {}",
                    e
                );
                Vec::new()
            }
        };
        self.next_id = self.messages.iter().map(|m| m.id).max().map_or(1, |id| id + 1);

        &self.messages
    }

    /// Writes an empty snapshot if none exists yet.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        match tokio::fs::metadata(&self.snapshot_path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                write_snapshot(&self.snapshot_path, &[]).await
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Assigns the next id to `draft`, queues it, and rewrites the snapshot.
    ///
    /// The message stays queued in memory even when the snapshot write fails;
    /// the next successful persist will include it.
    pub async fn append(&mut self, draft: MessageDraft) -> Result<Message, StoreError> {
        let message = draft.into_message(self.next_id);
        self.next_id += 1;
        self.messages.push(message.clone());
        self.persist().await?;
        Ok(message)
    }

    /// Flags a message as played. Does not persist.
    ///
    /// Returns `false` if no message has that id.
    pub fn mark_played(&mut self, id: u64) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.played = true;
                true
            }
            None => false,
        }
    }

    /// Unplayed messages in arrival order.
    pub fn unplayed(&self) -> Vec<Message> {
        self.messages.iter().filter(|m| !m.played).cloned().collect()
    }

    /// Rewrites the full snapshot from the in-memory queue.
    pub async fn persist(&self) -> Result<(), StoreError> {
        write_snapshot(&self.snapshot_path, &self.messages).await
    }

    /// Deletes the snapshot and empties the queue. Ids restart at 1.
    ///
    /// Succeeds when the snapshot is already gone.
    pub async fn clear(&mut self) -> Result<(), StoreError> {
        self.messages.clear();
        self.next_id = 1;
        if remove_if_exists(&self.snapshot_path).await? {
            tracing::info!(tenant_id = %self.tenant_id, "deleted chat snapshot");
        }
        Ok(())
    }

    /// Deletes the rendered-audio artifact if present.
    pub async fn remove_artifact(&self) -> Result<(), StoreError> {
        if remove_if_exists(&self.artifact_path).await? {
            tracing::info!(tenant_id = %self.tenant_id, "deleted audio artifact");
        }
        Ok(())
    }
}

async fn read_snapshot(path: &Path) -> Result<Vec<Message>, StoreError> {
    let raw = tokio::fs::read_to_string(path).await?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&raw)?)
}

async fn write_snapshot(path: &Path, messages: &[Message]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec_pretty(messages)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<bool, StoreError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::Io(e)),
    }
}
