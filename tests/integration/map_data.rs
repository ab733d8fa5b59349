//! Derivation pipeline tests: static and source-bound mapData shapes, the
//! parameter and metadata inputs, and snapshot semantics of sources.

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use remora::contract::UnknownContract;
use remora::mapper::Mapper;
use remora::query::{JsonQuery, QueryStatus};
use remora::source::SharedValue;

use super::test_utils::{any_request, raw_with_headers, MockPort};

#[tokio::test]
async fn static_mapper_transforms_published_data() {
    let port = MockPort::ok(json!({"marker": "R1"}));
    let query = JsonQuery::builder(any_request(), UnknownContract)
        .map_data(Mapper::static_fn(|ctx| {
            assert_eq!(ctx.result, &json!({"marker": "R1"}));
            assert_eq!(ctx.params, Some(&json!("p")));
            json!({"marker": "T1"})
        }))
        .transport(port)
        .build()
        .unwrap();

    query.start(Some(json!("p"))).await;

    assert_eq!(query.status(), QueryStatus::Done);
    assert_eq!(query.data(), Some(json!({"marker": "T1"})));
}

#[tokio::test]
async fn source_bound_mapper_sees_snapshot_at_derivation_time() {
    let source = SharedValue::new(json!("first"));
    let port = MockPort::ok(json!("response"));
    let query = JsonQuery::builder(any_request(), UnknownContract)
        .map_data(Mapper::source_bound(source.clone(), |ctx, snapshot| {
            assert_eq!(ctx.result, &json!("response"));
            json!({"source": snapshot.clone()})
        }))
        .transport(port)
        .build()
        .unwrap();

    query.start(None).await;
    assert_eq!(query.data(), Some(json!({"source": "first"})));

    // A source change on its own does not re-run the derivation.
    source.set(json!("second"));
    assert_eq!(query.data(), Some(json!({"source": "first"})));

    // The next pass snapshots the new value.
    query.start(None).await;
    assert_eq!(query.data(), Some(json!({"source": "second"})));
}

#[tokio::test]
async fn derivation_runs_exactly_once_per_pass() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = invocations.clone();
    let source = SharedValue::new(json!(0));

    let port = MockPort::ok(json!("response"));
    let query = JsonQuery::builder(any_request(), UnknownContract)
        .map_data(Mapper::source_bound(source.clone(), move |_ctx, snapshot| {
            counter.fetch_add(1, Ordering::SeqCst);
            snapshot.clone()
        }))
        .transport(port)
        .build()
        .unwrap();

    query.start(None).await;
    source.set(json!(1));
    source.set(json!(2));

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn response_metadata_is_passed_unchanged_to_the_mapper() {
    let port = MockPort::new(vec![Ok(raw_with_headers(
        json!("body"),
        &[("content-type", "application/json")],
    ))]);
    let query = JsonQuery::builder(any_request(), UnknownContract)
        .map_data(Mapper::static_fn(|ctx| {
            assert_eq!(
                ctx.meta.headers.get("content-type").map(String::as_str),
                Some("application/json")
            );
            json!({"headers": ctx.meta.headers.clone()})
        }))
        .transport(port)
        .build()
        .unwrap();

    query.start(None).await;

    assert_eq!(
        query.data(),
        Some(json!({"headers": {"content-type": "application/json"}}))
    );
}
