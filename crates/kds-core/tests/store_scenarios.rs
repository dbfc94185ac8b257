//! End-to-end lifecycle scenarios against the in-memory API

use chrono::Duration;
use kds_core::prelude::*;
use kds_core::{
    prep_duration_at, DateRange, KdsConfig, PrepDuration, RemoteOperation, RetryPolicy,
    ValidationError,
};
use kds_test_utils::{burger_draft, business, draft_for, t0, InMemoryKdsApi};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn setup() -> (Arc<InMemoryKdsApi>, OrderStore) {
    let api = Arc::new(InMemoryKdsApi::new().with_clock(t0()));
    let store = OrderStore::new(business(), api.clone());
    (api, store)
}

#[tokio::test]
async fn created_order_starts_pending() {
    let (_api, store) = setup();

    let order = store.create_order(burger_draft()).await.unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.prep_start_time, None);
    assert_eq!(order.station, Station::Grill);
    assert_eq!(order.priority, Priority::NORMAL);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].name(), "Burger");
    assert_eq!(order.items[0].quantity(), 2);
    assert!(order.items[0].modifiers().is_empty());
    assert_eq!(order.items[0].special_instructions(), None);
    assert_eq!(store.list_orders(), vec![order]);
}

#[tokio::test]
async fn preparing_sets_start_once_and_rejects_repeat() {
    let (_api, store) = setup();
    let order = store.create_order(burger_draft()).await.unwrap();

    let before = chrono::Utc::now();
    let preparing = store
        .transition(&order.id, OrderStatus::Preparing)
        .await
        .unwrap();
    let start = preparing.prep_start_time.expect("start recorded");
    assert!(start >= before);

    let err = store
        .transition(&order.id, OrderStatus::Preparing)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        KdsError::Validation(ValidationError::InvalidTransition {
            from: OrderStatus::Preparing,
            to: OrderStatus::Preparing
        })
    ));
    assert_eq!(store.get(&order.id).unwrap().prep_start_time, Some(start));
}

#[tokio::test]
async fn ready_freezes_prep_duration() {
    let (_api, store) = setup();
    let order = store.create_order(burger_draft()).await.unwrap();
    store.transition(&order.id, OrderStatus::Preparing).await.unwrap();
    let ready = store.transition(&order.id, OrderStatus::Ready).await.unwrap();

    let start = ready.prep_start_time.unwrap();
    let end = ready.prep_end_time.unwrap();
    assert!(end >= start);

    let now = prep_duration_at(&ready, end + Duration::hours(2));
    let later = prep_duration_at(&ready, end + Duration::hours(9));
    assert!(matches!(now, PrepDuration::Finished { .. }));
    assert_eq!(now, later);
    let expected = ((end - start).num_milliseconds() / 60_000) as u64;
    assert_eq!(now.display_minutes(), Some(expected));
}

#[tokio::test]
async fn served_is_terminal() {
    let (api, store) = setup();
    let order = store.create_order(burger_draft()).await.unwrap();
    for status in [OrderStatus::Preparing, OrderStatus::Ready, OrderStatus::Served] {
        store.transition(&order.id, status).await.unwrap();
    }
    let updates = api.calls().update;

    let err = store
        .transition(&order.id, OrderStatus::Preparing)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(store.get(&order.id).unwrap().status, OrderStatus::Served);
    assert_eq!(api.calls().update, updates);
    assert!(store.next_statuses(&order.id).unwrap().is_empty());

    let journal: Vec<OrderStatus> = store
        .journal()
        .for_order(&order.id)
        .into_iter()
        .map(|r| r.to)
        .collect();
    assert_eq!(
        journal,
        vec![OrderStatus::Preparing, OrderStatus::Ready, OrderStatus::Served]
    );
}

#[tokio::test]
async fn filter_by_status_preserves_order() {
    let (_api, store) = setup();
    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(store.create_order(burger_draft()).await.unwrap().id);
    }
    store.transition(&ids[1], OrderStatus::Preparing).await.unwrap();
    store.transition(&ids[3], OrderStatus::Preparing).await.unwrap();

    let preparing = store.filtered(&OrderFilter::all().with_status(OrderStatus::Preparing));
    let got: Vec<&OrderRecordId> = preparing.iter().map(|o| &o.id).collect();
    assert_eq!(got, vec![&ids[1], &ids[3]]);

    let counts = store.counts_by_status();
    assert_eq!(counts.get(OrderStatus::Pending), 3);
    assert_eq!(counts.get(OrderStatus::Preparing), 2);
    assert_eq!(counts.total(), 5);
}

#[tokio::test]
async fn refresh_round_trips_draft_fields() {
    let (api, store) = setup();
    let draft = draft_for(Station::Dessert).with_priority(Priority::URGENT);
    let created = store.create_order(draft.clone()).await.unwrap();

    let fresh = OrderStore::new(business(), api.clone());
    fresh
        .refresh_all(DateRange::trailing_hours(t0() + Duration::minutes(1), 24))
        .await
        .unwrap();

    let fetched = fresh.get(&created.id).unwrap();
    assert_eq!(fetched.items, draft.items);
    assert_eq!(fetched.station, draft.station);
    assert_eq!(fetched.priority, draft.priority);

    let report = fresh.performance().unwrap();
    assert_eq!(report.snapshot.total_orders, 1);
    assert_eq!(report.completion_percent, 0);
    assert_eq!(fresh.stations_in_use(), vec![Station::Dessert]);
}

#[tokio::test]
async fn remote_failure_keeps_last_known_good_state() {
    let (api, store) = setup();
    let order = store.create_order(burger_draft()).await.unwrap();
    let snapshot = store.list_orders();

    api.fail_next(1);
    let err = store
        .transition(&order.id, OrderStatus::Preparing)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        KdsError::Remote {
            operation: RemoteOperation::UpdateOrder,
            ..
        }
    ));
    assert_eq!(store.list_orders(), snapshot);
    assert!(store.journal().is_empty());

    api.fail_next(1);
    assert!(store.create_order(burger_draft()).await.is_err());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn early_prep_end_is_refused_and_preparation_still_starts() {
    let (api, store) = setup();
    let order = store.create_order(burger_draft()).await.unwrap();

    let early_end = OrderPatch::default().with_prep_end(t0() - Duration::minutes(5));
    let err = store.update_order(&order.id, early_end).await.unwrap_err();
    assert!(matches!(
        err,
        KdsError::Validation(ValidationError::PrepWindowOpen(OrderStatus::Pending))
    ));
    assert_eq!(api.calls().update, 0);
    assert_eq!(store.get(&order.id).unwrap().prep_end_time, None);

    let preparing = store
        .transition(&order.id, OrderStatus::Preparing)
        .await
        .unwrap();
    assert_eq!(preparing.status, OrderStatus::Preparing);
    assert!(preparing.prep_start_time.is_some());
    assert_eq!(preparing.prep_end_time, None);
}

#[tokio::test]
async fn cancelling_unstarted_order_records_end_only() {
    let (_api, store) = setup();
    let order = store.create_order(burger_draft()).await.unwrap();

    let cancelled = store
        .transition(&order.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.prep_start_time, None);
    assert!(cancelled.prep_end_time.is_some());
}

#[tokio::test]
async fn orders_refresh_keeps_performance_report() {
    let (api, store) = setup();
    store.create_order(burger_draft()).await.unwrap();

    let fresh = OrderStore::new(business(), api.clone());
    fresh
        .refresh_all(DateRange::trailing_hours(t0() + Duration::minutes(5), 1))
        .await
        .unwrap();
    store.create_order(draft_for(Station::Salad)).await.unwrap();

    let performance_calls = api.calls().performance;
    fresh.refresh_orders().await.unwrap();
    assert_eq!(api.calls().performance, performance_calls);
    assert_eq!(fresh.len(), 2);
    assert_eq!(fresh.performance().unwrap().snapshot.total_orders, 1);
}

#[tokio::test]
async fn caller_level_retry_recovers_from_transient_failure() {
    let (api, store) = setup();
    let order = store.create_order(burger_draft()).await.unwrap();
    api.fail_next(2);

    let policy = RetryPolicy::default()
        .with_max_attempts(3)
        .with_base_delay(std::time::Duration::from_millis(1));
    let updated = policy
        .run(|| store.transition(&order.id, OrderStatus::Preparing))
        .await
        .unwrap();

    assert_eq!(updated.status, OrderStatus::Preparing);
    assert_eq!(api.calls().update, 3);
    assert_eq!(store.journal().len(), 1);
}

#[tokio::test]
async fn assignment_does_not_touch_status_or_history() {
    let (_api, store) = setup();
    let order = store.create_order(burger_draft()).await.unwrap();

    let updated = store.assign(&order.id, "chef-ana").await.unwrap();
    assert_eq!(updated.assigned_to.as_deref(), Some("chef-ana"));
    assert_eq!(updated.status, OrderStatus::Pending);
    assert!(store.journal().is_empty());
}

#[tokio::test]
async fn store_built_from_config() {
    let config = KdsConfig::from_toml_str("business_id = \"bistro-42\"").unwrap();
    let api = Arc::new(InMemoryKdsApi::new());
    let store = OrderStore::new(config.business_id().unwrap(), api);
    assert_eq!(store.business_id(), &business());
}
