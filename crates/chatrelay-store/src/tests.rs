use chatrelay_types::{Message, MessageDraft, TenantId};
use tempfile::TempDir;

use crate::MessageStore;

fn tenant(id: &str) -> TenantId {
    TenantId::new(id).unwrap()
}

async fn read_disk(store: &MessageStore, tenant_id: &TenantId) -> Vec<Message> {
    let raw = tokio::fs::read_to_string(store.snapshot_path(tenant_id))
        .await
        .unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn open_creates_empty_snapshot() {
    let dir = TempDir::new().unwrap();
    let store = MessageStore::new(dir.path());
    let t = tenant("guild1");

    let queue = store.open(&t).await;

    assert!(queue.messages().is_empty());
    assert_eq!(queue.next_id(), 1);
    assert!(store.snapshot_path(&t).exists());
    assert!(read_disk(&store, &t).await.is_empty());
}

#[tokio::test]
async fn append_assigns_increasing_ids_and_persists() {
    let dir = TempDir::new().unwrap();
    let store = MessageStore::new(dir.path());
    let t = tenant("guild1");
    let mut queue = store.open(&t).await;

    let a = queue.append(MessageDraft::new("a", "one")).await.unwrap();
    let b = queue.append(MessageDraft::new("b", "two")).await.unwrap();
    let c = queue.append(MessageDraft::new("c", "three")).await.unwrap();

    assert_eq!((a.id, b.id, c.id), (1, 2, 3));
    assert!(!a.played);

    let on_disk = read_disk(&store, &t).await;
    assert_eq!(on_disk, queue.messages());
    assert_eq!(on_disk.len(), 3);
}

#[tokio::test]
async fn mark_played_is_persisted_only_on_persist() {
    let dir = TempDir::new().unwrap();
    let store = MessageStore::new(dir.path());
    let t = tenant("guild1");
    let mut queue = store.open(&t).await;
    queue.append(MessageDraft::new("a", "one")).await.unwrap();
    queue.append(MessageDraft::new("b", "two")).await.unwrap();

    assert!(queue.mark_played(1));
    assert!(!queue.mark_played(99));
    assert!(!read_disk(&store, &t).await[0].played);

    queue.persist().await.unwrap();
    let on_disk = read_disk(&store, &t).await;
    assert!(on_disk[0].played);
    assert!(!on_disk[1].played);

    let unplayed = queue.unplayed();
    assert_eq!(unplayed.len(), 1);
    assert_eq!(unplayed[0].id, 2);
}

#[tokio::test]
async fn clear_is_idempotent_and_restarts_ids() {
    let dir = TempDir::new().unwrap();
    let store = MessageStore::new(dir.path());
    let t = tenant("guild1");
    let mut queue = store.open(&t).await;
    queue.append(MessageDraft::new("a", "one")).await.unwrap();
    queue.append(MessageDraft::new("b", "two")).await.unwrap();

    queue.clear().await.unwrap();
    assert!(!store.snapshot_path(&t).exists());
    queue.clear().await.unwrap();

    queue.initialize().await.unwrap();
    assert!(read_disk(&store, &t).await.is_empty());

    let first = queue.append(MessageDraft::new("c", "again")).await.unwrap();
    assert_eq!(first.id, 1);
}

#[tokio::test]
async fn load_restores_next_id_from_snapshot() {
    let dir = TempDir::new().unwrap();
    let store = MessageStore::new(dir.path());
    let t = tenant("guild1");
    {
        let mut queue = store.open(&t).await;
        for i in 0..4 {
            queue
                .append(MessageDraft::new("a", format!("m{}", i)))
                .await
                .unwrap();
        }
    }

    let mut reopened = store.open(&t).await;
    assert_eq!(reopened.messages().len(), 4);
    assert_eq!(reopened.next_id(), 5);
    let next = reopened.append(MessageDraft::new("b", "x")).await.unwrap();
    assert_eq!(next.id, 5);
}

#[tokio::test]
async fn corrupt_snapshot_loads_empty() {
    let dir = TempDir::new().unwrap();
    let store = MessageStore::new(dir.path());
    let t = tenant("guild1");
    tokio::fs::write(store.snapshot_path(&t), b"{ not json")
        .await
        .unwrap();

    let mut queue = store.open(&t).await;
    assert!(queue.messages().is_empty());
    assert_eq!(queue.next_id(), 1);

    // The next write replaces the corrupt file with a valid snapshot.
    queue.append(MessageDraft::new("a", "one")).await.unwrap();
    assert_eq!(read_disk(&store, &t).await.len(), 1);
}

#[tokio::test]
async fn tenants_use_separate_files() {
    let dir = TempDir::new().unwrap();
    let store = MessageStore::new(dir.path());
    let t1 = tenant("guild1");
    let t2 = tenant("guild2");
    let mut q1 = store.open(&t1).await;
    let mut q2 = store.open(&t2).await;

    q1.append(MessageDraft::new("a", "one")).await.unwrap();
    q2.append(MessageDraft::new("b", "two")).await.unwrap();
    q1.clear().await.unwrap();

    assert!(!store.snapshot_path(&t1).exists());
    assert_eq!(read_disk(&store, &t2).await.len(), 1);
}

#[tokio::test]
async fn remove_artifact_ignores_missing_file() {
    let dir = TempDir::new().unwrap();
    let store = MessageStore::new(dir.path());
    let t = tenant("guild1");
    let queue = store.open(&t).await;

    queue.remove_artifact().await.unwrap();

    tokio::fs::write(queue.artifact_path(), b"ID3").await.unwrap();
    queue.remove_artifact().await.unwrap();
    assert!(!queue.artifact_path().exists());
}
