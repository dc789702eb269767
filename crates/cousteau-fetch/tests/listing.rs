mod common;

use common::client_for;
use cousteau_fetch::{Listing, probe_stream};
use cousteau_types::{CousteauError, Filters, Probe, ProbeId};
use futures::TryStreamExt;
use httpmock::prelude::*;
use serde_json::{Value, json};

fn ids(records: &[Value]) -> Vec<u64> {
    records.iter().filter_map(|r| r["id"].as_u64()).collect()
}

async fn collect(listing: &mut Listing<'_>) -> Result<Vec<Value>, CousteauError> {
    let mut records = Vec::new();
    while let Some(record) = listing.next().await? {
        records.push(record);
    }
    Ok(records)
}

#[tokio::test]
async fn test_follows_next_links() {
    let server = MockServer::start_async().await;
    let first = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/probes/")
                .query_param("country_code", "GR")
                .query_param_missing("cursor");
            then.status(200).json_body(json!({
                "count": 4,
                "next": server.url("/api/v2/probes/?country_code=GR&cursor=p2"),
                "results": [{"id": 1}, {"id": 2}]
            }));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/probes/")
                .query_param("country_code", "GR")
                .query_param("cursor", "p2");
            then.status(200).json_body(json!({
                "count": 4,
                "next": null,
                "results": [{"id": 3}, {"id": 4}]
            }));
        })
        .await;

    let client = client_for(&server);
    let mut listing = Listing::probes(&client, Filters::new().with("country_code", "GR"));
    let records = collect(&mut listing).await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(ids(&records), vec![1, 2, 3, 4]);
    assert_eq!(listing.total_count(), 4);
    assert!(listing.current_url().is_none());
}

#[tokio::test]
async fn test_no_request_before_first_record() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2/measurements/");
            then.status(200)
                .json_body(json!({"count": 0, "next": null, "results": []}));
        })
        .await;

    let client = client_for(&server);
    let mut listing = Listing::measurements(&client, Filters::new());
    assert_eq!(mock.hits_async().await, 0);

    assert!(listing.next().await.unwrap().is_none());
    assert_eq!(mock.hits_async().await, 1);
    assert_eq!(listing.total_count(), 0);
}

#[tokio::test]
async fn test_long_id_filter_is_split_and_counted_per_segment() {
    let all: Vec<u64> = (1..=1999).collect();
    let chunks: Vec<String> = all
        .chunks(500)
        .map(|chunk| {
            chunk
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();
    assert_eq!(chunks.len(), 4);

    let server = MockServer::start_async().await;
    let mut mocks = Vec::new();

    mocks.push(
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v2/probes/")
                    .query_param("status", "1")
                    .query_param("id__in", chunks[0].as_str())
                    .query_param_missing("cursor");
                then.status(200).json_body(json!({
                    "count": 500,
                    "next": format!("/api/v2/probes/?status=1&id__in={}&cursor=s1", chunks[0]),
                    "results": [{"id": 1}]
                }));
            })
            .await,
    );
    // Same segment total again on the second page.
    mocks.push(
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v2/probes/")
                    .query_param("cursor", "s1");
                then.status(200).json_body(json!({
                    "count": 500,
                    "next": null,
                    "results": [{"id": 2}]
                }));
            })
            .await,
    );
    // An empty segment must not end the listing.
    mocks.push(
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v2/probes/")
                    .query_param("id__in", chunks[1].as_str());
                then.status(200)
                    .json_body(json!({"count": 500, "next": null, "results": []}));
            })
            .await,
    );
    mocks.push(
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v2/probes/")
                    .query_param("id__in", chunks[2].as_str());
                then.status(200).json_body(json!({
                    "count": 500,
                    "next": null,
                    "results": [{"id": 1001}]
                }));
            })
            .await,
    );
    mocks.push(
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v2/probes/")
                    .query_param("id__in", chunks[3].as_str());
                then.status(200).json_body(json!({
                    "count": 499,
                    "next": null,
                    "results": [{"id": 1999}]
                }));
            })
            .await,
    );

    let client = client_for(&server);
    let filters = Filters::new().with("status", 1).with("id__in", all.clone());
    let mut listing = Listing::probes(&client, filters);
    assert_eq!(listing.pending_segments().count(), 3);

    let records = collect(&mut listing).await.unwrap();
    for mock in &mocks {
        mock.assert_async().await;
    }
    assert_eq!(ids(&records), vec![1, 2, 1001, 1999]);
    assert_eq!(listing.total_count(), 1999);
}

#[tokio::test]
async fn test_first_page_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2/probes/");
            then.status(400)
                .json_body(json!({"error": {"detail": "bad filter"}}));
        })
        .await;

    let client = client_for(&server);
    let mut listing = Listing::probes(&client, Filters::new().with("bogus", "x"));
    match listing.next().await {
        Err(CousteauError::ApiResponse(payload)) => {
            assert_eq!(payload.get("error"), Some(&json!({"detail": "bad filter"})));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(listing.total_count(), 0);
}

#[tokio::test]
async fn test_relative_next_link_is_followed() {
    let server = MockServer::start_async().await;
    let first = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/probes/")
                .query_param("status", "1")
                .query_param_missing("page");
            then.status(200).json_body(json!({
                "count": 3,
                "next": "?status=1&page=2",
                "results": [{"id": 1}, {"id": 2}]
            }));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/probes/")
                .query_param("status", "1")
                .query_param("page", "2");
            then.status(200).json_body(json!({
                "count": 3,
                "next": null,
                "results": [{"id": 3}]
            }));
        })
        .await;

    let client = client_for(&server);
    let mut listing = Listing::probes(&client, Filters::new().with("status", 1));
    let records = collect(&mut listing).await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(ids(&records), vec![1, 2, 3]);
    assert_eq!(listing.total_count(), 3);
}

#[tokio::test]
async fn test_unusable_next_link_is_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2/probes/");
            then.status(200).json_body(json!({
                "count": 400,
                "next": "http://[::1/api/v2/probes/?page=2",
                "results": [{"id": 1}]
            }));
        })
        .await;

    let client = client_for(&server);
    let mut listing = Listing::probes(&client, Filters::new());
    match listing.next().await {
        Err(CousteauError::Generic(message)) => assert!(message.contains("next page link")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_probe_stream_yields_typed_objects() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2/probes/");
            then.status(200).json_body(json!({
                "count": 2,
                "next": null,
                "results": [
                    {"id": 10, "country_code": "NL", "status": {"id": 1, "name": "Connected"}},
                    {"id": 11, "country_code": "GR", "status": {"id": 2, "name": "Disconnected"}}
                ]
            }));
        })
        .await;

    let client = client_for(&server);
    let probes: Vec<Probe> = probe_stream(&client, Filters::new())
        .try_collect()
        .await
        .unwrap();

    assert_eq!(probes.len(), 2);
    assert_eq!(probes[0].id(), Some(ProbeId::from(10)));
    assert_eq!(probes[0].status(), Some("Connected"));
    assert_eq!(probes[1].country_code(), Some("GR"));
}
