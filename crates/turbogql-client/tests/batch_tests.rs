//! Batching plugin tests
//!
//! All tests run on a paused clock so the debounce window is deterministic.

mod common;

use common::{MockTransport, response};
use futures::future::join_all;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use turbogql_client::plugins::{BatchConfig, BatchPlugin, CachePlugin, DedupPlugin};
use turbogql_client::transport::TransportError;
use turbogql_client::{CachePolicy, Client, Operation};

fn batching_client(transport: &Arc<MockTransport>, config: BatchConfig) -> Client {
    let batch = BatchPlugin::new(Arc::clone(transport) as _, config);
    Client::builder()
        .with_url("https://api.example.com/graphql")
        .with_cache_policy(CachePolicy::NetworkOnly)
        .with_cache_plugin(CachePlugin::new())
        .with_plugin(Arc::new(DedupPlugin::new()))
        .with_plugin(Arc::new(batch))
        .build()
        .unwrap()
}

fn lookup(id: usize) -> Operation {
    Operation::query("query ($id: ID!) { node(id: $id) { id } }")
        .with_variables(json!({"id": id}))
}

#[tokio::test(start_paused = true)]
async fn test_operations_in_window_share_one_request() {
    common::init_tracing();
    let transport = Arc::new(MockTransport::echo_batch());
    let client = batching_client(
        &transport,
        BatchConfig {
            timeout: Duration::from_millis(10),
            max_operation_count: None,
        },
    );

    let results = join_all((0..5).map(|id| client.execute(lookup(id)))).await;

    assert_eq!(transport.calls(), 1);
    let body = &transport.bodies()[0];
    assert_eq!(body.as_array().map(Vec::len), Some(5));
    assert_eq!(
        body[0],
        json!({
            "query": "query ($id: ID!) { node(id: $id) { id } }",
            "variables": {"id": 0}
        })
    );

    for (id, result) in results.into_iter().enumerate() {
        let result = result.unwrap();
        assert_eq!(result.data, Some(json!({"echo": {"id": id}})));
        assert!(result.error.is_none());
    }
}

#[tokio::test(start_paused = true)]
async fn test_max_operation_count_splits_batches() {
    let transport = Arc::new(MockTransport::echo_batch());
    let client = batching_client(
        &transport,
        BatchConfig {
            timeout: Duration::from_millis(10),
            max_operation_count: Some(2),
        },
    );

    let results = join_all((0..5).map(|id| client.execute(lookup(id)))).await;

    assert_eq!(transport.calls(), 3);
    let mut sizes: Vec<usize> = transport
        .bodies()
        .iter()
        .map(|body| body.as_array().map_or(0, Vec::len))
        .collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 2, 2]);

    for (id, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap().data, Some(json!({"echo": {"id": id}})));
    }
}

#[tokio::test(start_paused = true)]
async fn test_window_restarts_on_each_arrival() {
    common::init_tracing();
    let transport = Arc::new(MockTransport::echo_batch());
    let client = batching_client(&transport, BatchConfig::default());

    let first = tokio::spawn({
        let client = client.clone();
        async move { client.execute(lookup(1)).await }
    });
    tokio::time::sleep(Duration::from_millis(8)).await;

    let second = tokio::spawn({
        let client = client.clone();
        async move { client.execute(lookup(2)).await }
    });
    tokio::time::sleep(Duration::from_millis(8)).await;

    // 16ms after the first arrival, but only 8ms after the second
    assert_eq!(transport.calls(), 0);

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.bodies()[0].as_array().map(Vec::len), Some(2));

    assert_eq!(
        first.await.unwrap().unwrap().data,
        Some(json!({"echo": {"id": 1}}))
    );
    assert_eq!(
        second.await.unwrap().unwrap().data,
        Some(json!({"echo": {"id": 2}}))
    );
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_reaches_every_operation() {
    let transport = Arc::new(MockTransport::new(|_, _| {
        Err(TransportError::request("connection reset"))
    }));
    let client = batching_client(&transport, BatchConfig::default());

    let results = join_all((0..3).map(|id| client.execute(lookup(id)))).await;

    assert_eq!(transport.calls(), 1);
    let errors: Vec<_> = results
        .into_iter()
        .map(|result| result.unwrap().error.unwrap())
        .collect();
    assert!(errors.iter().all(|error| error.is_network_error()));
    assert!(errors.iter().all(|error| error == &errors[0]));
}

#[tokio::test(start_paused = true)]
async fn test_http_error_reaches_every_operation() {
    let transport = Arc::new(MockTransport::new(|_, _| {
        Ok(response(500, &json!({"message": "overloaded"})))
    }));
    let client = batching_client(&transport, BatchConfig::default());

    let results = join_all((0..2).map(|id| client.execute(lookup(id)))).await;

    for result in results {
        let error = result.unwrap().error.unwrap();
        assert_eq!(error.message(), "[Network] Internal Server Error");
    }
}

#[tokio::test(start_paused = true)]
async fn test_short_response_fails_missing_entries() {
    let transport = Arc::new(MockTransport::new(|_, _| {
        Ok(response(200, &json!([{"data": {"first": true}}])))
    }));
    let client = batching_client(&transport, BatchConfig::default());

    let results = join_all((0..2).map(|id| client.execute(lookup(id)))).await;

    let first = results[0].as_ref().unwrap();
    assert_eq!(first.data, Some(json!({"first": true})));
    assert!(first.error.is_none());

    let second = results[1].as_ref().unwrap();
    assert_eq!(second.data, None);
    assert!(second.error.as_ref().unwrap().is_network_error());
}

#[tokio::test(start_paused = true)]
async fn test_null_entry_is_a_network_error() {
    let transport = Arc::new(MockTransport::new(|_, _| {
        Ok(response(200, &json!([{"data": {"a": 1}}, null])))
    }));
    let client = batching_client(&transport, BatchConfig::default());

    let results = join_all((0..2).map(|id| client.execute(lookup(id)))).await;

    assert_eq!(results[0].as_ref().unwrap().data, Some(json!({"a": 1})));
    let second = results[1].as_ref().unwrap();
    assert_eq!(second.data, None);
    assert!(second.error.as_ref().unwrap().is_network_error());
}

#[tokio::test(start_paused = true)]
async fn test_entry_errors_stay_with_their_operation() {
    let transport = Arc::new(MockTransport::new(|_, _| {
        Ok(response(
            200,
            &json!([
                {"data": {"ok": 1}},
                {"data": null, "errors": [{"message": "not found"}]}
            ]),
        ))
    }));
    let client = batching_client(&transport, BatchConfig::default());

    let results = join_all((0..2).map(|id| client.execute(lookup(id)))).await;

    assert!(results[0].as_ref().unwrap().error.is_none());
    let error = results[1].as_ref().unwrap().error.clone().unwrap();
    assert!(error.is_graphql_error());
    assert_eq!(error.message(), "[GraphQL] not found");
}

#[tokio::test(start_paused = true)]
async fn test_identical_operations_are_deduplicated_before_batching() {
    let transport = Arc::new(MockTransport::echo_batch());
    let client = batching_client(&transport, BatchConfig::default());

    let results = join_all((0..4).map(|_| client.execute(lookup(7)))).await;

    assert_eq!(transport.bodies()[0].as_array().map(Vec::len), Some(1));
    let expected = Some(json!({"echo": {"id": 7}}));
    assert!(results.iter().all(|r| r.as_ref().unwrap().data == expected));
}
