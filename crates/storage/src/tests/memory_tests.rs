use super::*;

use crate::{CallStore, MemoryStore, StatusUpdate, StorageError};
use tablecall_core::{CallId, CallStatus, TableNumber, Transition};

#[tokio::test]
async fn test_insert_is_idempotent_per_id() {
    let store = MemoryStore::new();
    let call = create_test_call("c-1", "5", 0);
    assert!(store.insert_call(&call).await.unwrap());

    let mut retry = call.clone();
    retry.table_number = TableNumber::from("9");
    assert!(!store.insert_call(&retry).await.unwrap());

    let stored = store.get_call(&call.id).await.unwrap().unwrap();
    assert_eq!(stored.table_number.as_str(), "5");
    assert_eq!(store.len().unwrap(), 1);
}

#[tokio::test]
async fn test_active_calls_newest_first() {
    let store = MemoryStore::new();
    store.insert_call(&create_test_call("a", "1", 0)).await.unwrap();
    store.insert_call(&create_test_call("b", "2", 10)).await.unwrap();
    store.insert_call(&create_test_call("c", "1", 20)).await.unwrap();
    store.advance_status(&CallId::from("c"), CallStatus::Done).await.unwrap();

    let ids: Vec<String> =
        store.active_calls().await.unwrap().into_iter().map(|c| c.id.to_string()).collect();
    assert_eq!(ids, vec!["b", "a"]);

    let table_one = store.active_calls_for_table(&TableNumber::from("1")).await.unwrap();
    assert_eq!(table_one.len(), 1);
    assert_eq!(table_one[0].id.as_str(), "a");
}

#[tokio::test]
async fn test_advance_status_is_forward_only() {
    let store = MemoryStore::new();
    let call = create_test_call("c-2", "3", 0);
    store.insert_call(&call).await.unwrap();

    let done = store.advance_status(&call.id, CallStatus::Done).await.unwrap();
    assert!(done.applied());
    assert_eq!(done.call().status, CallStatus::Done);

    let back = store.advance_status(&call.id, CallStatus::Processing).await.unwrap();
    assert!(matches!(back, StatusUpdate::Unchanged(ref c) if c.status == CallStatus::Done));

    let again = store.advance_status(&call.id, CallStatus::Done).await.unwrap();
    assert!(!again.applied());
}

#[tokio::test]
async fn test_advance_unknown_id_is_not_found() {
    let store = MemoryStore::new();
    let err = store.advance_status(&CallId::from("ghost"), CallStatus::Done).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, StorageError::NotFound { entity: "call", .. }));
}

#[tokio::test]
async fn test_change_feed_reports_transitions() {
    let store = MemoryStore::new();
    let mut feed = store.subscribe_changes();
    let call = create_test_call("c-3", "7", 0);

    store.insert_call(&call).await.unwrap();
    store.insert_call(&call).await.unwrap();
    store.advance_status(&call.id, CallStatus::Processing).await.unwrap();
    store.advance_status(&call.id, CallStatus::Pending).await.unwrap();

    let first = feed.recv().await.unwrap();
    assert_eq!(first.transition, Transition::Appear);
    let second = feed.recv().await.unwrap();
    assert_eq!(second.transition, Transition::Update);
    assert_eq!(second.call.status, CallStatus::Processing);

    // Duplicate insert and backward advance emitted nothing.
    let nothing =
        tokio::time::timeout(std::time::Duration::from_millis(50), feed.recv()).await;
    assert!(nothing.is_err());
}

#[tokio::test]
async fn test_feed_closes_when_store_dropped() {
    let store = MemoryStore::new();
    let mut feed = store.subscribe_changes();
    drop(store);
    assert!(feed.recv().await.is_none());
}
