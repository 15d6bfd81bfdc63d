use super::*;

use chrono::{Duration, Utc};
use tablecall_core::CallType;

use crate::{CallRequest, IngestService, ResolutionService, ServiceError, parse_target_status};

async fn seed(store: &FlakyStore, id: &str, table: &str, offset_secs: i64) -> Call {
    let call = Call::pending(
        id.into(),
        table.into(),
        CallType::Waiter,
        Utc::now() + Duration::seconds(offset_secs),
    );
    store.inner.insert_call(&call).await.unwrap();
    call
}

#[test]
fn test_target_status_parsing() {
    assert_eq!(parse_target_status(None).unwrap(), CallStatus::Done);
    assert_eq!(parse_target_status(Some(" Processing ")).unwrap(), CallStatus::Processing);
    assert!(matches!(parse_target_status(Some("pending")), Err(ServiceError::InvalidInput(_))));
    assert!(matches!(parse_target_status(Some("eaten")), Err(ServiceError::InvalidInput(_))));
}

#[tokio::test]
async fn test_resolve_one_broadcasts_then_writes() {
    let store = FlakyStore::new();
    let channel = FlakyChannel::new();
    let mut sub = channel.subscribe();
    let call = seed(&store, "a", "5", 0).await;

    let outcome = ResolutionService::new(store.clone(), channel.clone())
        .resolve_one(&call.id, CallStatus::Done)
        .await
        .unwrap();

    assert_eq!(outcome.applied, 1);
    assert_eq!(
        sub.recv().await.unwrap(),
        BroadcastEvent::status_changed(call.id.clone(), CallStatus::Done)
    );
    assert_eq!(store.get_call(&call.id).await.unwrap().unwrap().status, CallStatus::Done);
}

#[tokio::test]
async fn test_resolve_unknown_single_id_is_not_found() {
    let store = FlakyStore::new();
    let channel = FlakyChannel::new();
    let err = ResolutionService::new(store, channel)
        .resolve_one(&CallId::from("ghost"), CallStatus::Done)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_batch_ignores_unknown_ids_and_duplicates() {
    let store = FlakyStore::new();
    let channel = FlakyChannel::new();
    let a = seed(&store, "a", "5", 0).await;
    let ids = vec![a.id.clone(), CallId::from("ghost"), a.id.clone()];

    let outcome = ResolutionService::new(store, channel)
        .resolve_ids(&ids, CallStatus::Done)
        .await
        .unwrap();
    assert_eq!(outcome.requested, 2);
    assert_eq!(outcome.unknown, 1);
    assert_eq!(outcome.resolved(), 1);
}

#[tokio::test]
async fn test_backward_resolution_is_a_no_op() {
    let store = FlakyStore::new();
    let channel = FlakyChannel::new();
    let call = seed(&store, "a", "5", 0).await;
    let gateway = ResolutionService::new(store.clone(), channel);

    gateway.resolve_one(&call.id, CallStatus::Done).await.unwrap();
    let outcome = gateway.resolve_one(&call.id, CallStatus::Processing).await.unwrap();
    assert_eq!(outcome.applied, 0);
    assert_eq!(store.get_call(&call.id).await.unwrap().unwrap().status, CallStatus::Done);
}

#[tokio::test]
async fn test_resolve_table_completes_every_active_call() {
    let store = FlakyStore::new();
    let channel = FlakyChannel::new();
    seed(&store, "a", "5", 0).await;
    seed(&store, "b", "5", 10).await;
    seed(&store, "c", "6", 20).await;
    let gateway = ResolutionService::new(store.clone(), channel);

    let outcome = gateway.resolve_table(&TableNumber::from("5"), CallStatus::Done).await.unwrap();
    assert_eq!(outcome.applied, 2);
    assert!(store.active_calls_for_table(&TableNumber::from("5")).await.unwrap().is_empty());
    assert_eq!(store.active_calls().await.unwrap().len(), 1);

    let again = gateway.resolve_table(&TableNumber::from("5"), CallStatus::Done).await.unwrap();
    assert_eq!(again, crate::ResolveOutcome::default());
}

#[tokio::test]
async fn test_pending_target_and_oversized_batch_are_rejected() {
    let store = FlakyStore::new();
    let channel = FlakyChannel::new();
    let gateway = ResolutionService::new(store, channel);

    let err = gateway.resolve_ids(&[CallId::from("a")], CallStatus::Pending).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let too_many: Vec<CallId> =
        (0..=tablecall_core::MAX_BATCH_IDS).map(|i| CallId::from(format!("c-{i}"))).collect();
    let err = gateway.resolve_ids(&too_many, CallStatus::Done).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let err = gateway.resolve_ids(&[], CallStatus::Done).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn test_single_transport_failure_is_tolerated() {
    let store = FlakyStore::new();
    let channel = FlakyChannel::new();
    let call = seed(&store, "a", "5", 0).await;
    let gateway = ResolutionService::new(store.clone(), channel.clone());

    channel.fail(true);
    let outcome = gateway.resolve_one(&call.id, CallStatus::Processing).await.unwrap();
    assert_eq!(outcome.applied, 1);

    channel.fail(false);
    store.fail(true);
    gateway.resolve_one(&call.id, CallStatus::Done).await.unwrap();
}

#[tokio::test]
async fn test_both_transports_failing_is_an_error() {
    let store = FlakyStore::new();
    let channel = FlakyChannel::new();
    let call = seed(&store, "a", "5", 0).await;
    store.fail(true);
    channel.fail(true);

    let err = ResolutionService::new(store, channel)
        .resolve_one(&call.id, CallStatus::Done)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AllTransportsFailed { .. }));
}

fn gateways(
    store: &Arc<FlakyStore>,
    channel: &Arc<FlakyChannel>,
) -> (IngestService, ResolutionService) {
    let ingest = IngestService::new(store.clone(), channel.clone());
    let resolution = ResolutionService::new(store.clone(), channel.clone())
        .with_in_flight_writes(ingest.in_flight_writes());
    (ingest, resolution)
}

#[tokio::test]
async fn test_resolve_waits_for_background_insert() {
    let store = FlakyStore::new();
    let channel = FlakyChannel::new();
    store.delay_inserts(std::time::Duration::from_millis(50));
    let (ingest, resolution) = gateways(&store, &channel);

    let call = ingest.create_call(CallRequest::new("12", CallType::Waiter)).await.unwrap();
    assert_eq!(ingest.in_flight_writes().len(), 1);

    let outcome = resolution.resolve_one(&call.id, CallStatus::Done).await.unwrap();
    assert_eq!(outcome.applied, 1);
    assert_eq!(store.get_call(&call.id).await.unwrap().unwrap().status, CallStatus::Done);
    assert!(ingest.in_flight_writes().is_empty());
}

#[tokio::test]
async fn test_resolve_table_includes_calls_still_being_written() {
    let store = FlakyStore::new();
    let channel = FlakyChannel::new();
    store.delay_inserts(std::time::Duration::from_millis(50));
    let (ingest, resolution) = gateways(&store, &channel);

    ingest.create_call(CallRequest::new("5", CallType::Waiter)).await.unwrap();
    ingest.create_call(CallRequest::new("5", CallType::Bill)).await.unwrap();
    let outcome =
        resolution.resolve_table(&TableNumber::from("5"), CallStatus::Done).await.unwrap();
    assert_eq!(outcome.applied, 2);
    assert!(store.active_calls().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_background_insert_releases_waiters() {
    let store = FlakyStore::new();
    let channel = FlakyChannel::new();
    store.delay_inserts(std::time::Duration::from_millis(20));
    store.fail(true);
    let (ingest, resolution) = gateways(&store, &channel);

    let call = ingest.create_call(CallRequest::new("3", CallType::Bill)).await.unwrap();
    assert_eq!(ingest.in_flight_writes().len(), 1);

    // Broadcast still carries the resolution while the store is down.
    resolution.resolve_one(&call.id, CallStatus::Done).await.unwrap();
    assert!(ingest.in_flight_writes().is_empty());
}
