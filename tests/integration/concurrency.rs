//! Overlapping-start tests: which settlement writes the containers under
//! each concurrency policy.

use serde_json::json;
use std::time::Duration;
use tokio::sync::oneshot;

use remora::contract::UnknownContract;
use remora::query::{ConcurrencyPolicy, JsonQuery, QueryStatus};

use super::test_utils::{any_request, raw, GatedPort};

#[tokio::test]
async fn last_settlement_wins_publishes_the_later_settlement() {
    let (tx_a, rx_a) = oneshot::channel();
    let (tx_b, rx_b) = oneshot::channel();
    let port = GatedPort::new(vec![("a", rx_a), ("b", rx_b)]);

    let query = JsonQuery::builder(any_request(), UnknownContract)
        .transport(port)
        .concurrency(ConcurrencyPolicy::LastSettlementWins)
        .build()
        .unwrap();

    // Settle b first, then a: the pass started first settles last and wins.
    let controller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx_b.send(raw(json!("from-b"))).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx_a.send(raw(json!("from-a"))).unwrap();
    });

    futures::join!(query.start(Some(json!("a"))), query.start(Some(json!("b"))));
    controller.await.unwrap();

    assert_eq!(query.data(), Some(json!("from-a")));
    assert_eq!(query.status(), QueryStatus::Done);
}

#[tokio::test]
async fn cancel_stale_discards_settlements_of_superseded_passes() {
    let (tx_a, rx_a) = oneshot::channel();
    let (tx_b, rx_b) = oneshot::channel();
    let port = GatedPort::new(vec![("a", rx_a), ("b", rx_b)]);

    let query = JsonQuery::builder(any_request(), UnknownContract)
        .transport(port)
        .concurrency(ConcurrencyPolicy::CancelStale)
        .build()
        .unwrap();

    // Pass "a" starts before pass "b", so "b" is the latest pass. Settling
    // "b" first and "a" afterwards must leave "b" published: the stale
    // settlement of "a" is dropped even though it arrives last.
    let controller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx_b.send(raw(json!("from-b"))).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx_a.send(raw(json!("from-a"))).unwrap();
    });

    futures::join!(query.start(Some(json!("a"))), query.start(Some(json!("b"))));
    controller.await.unwrap();

    assert_eq!(query.data(), Some(json!("from-b")));
    assert_eq!(query.status(), QueryStatus::Done);
}

#[tokio::test]
async fn cancel_stale_does_not_affect_a_single_pass() {
    let (tx, rx) = oneshot::channel();
    let port = GatedPort::new(vec![("only", rx)]);

    let query = JsonQuery::builder(any_request(), UnknownContract)
        .transport(port)
        .concurrency(ConcurrencyPolicy::CancelStale)
        .build()
        .unwrap();

    let controller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send(raw(json!("value"))).unwrap();
    });

    query.start(Some(json!("only"))).await;
    controller.await.unwrap();

    assert_eq!(query.data(), Some(json!("value")));
    assert_eq!(query.status(), QueryStatus::Done);
}
