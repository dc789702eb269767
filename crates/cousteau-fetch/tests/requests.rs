mod common;

use chrono::{TimeZone, Utc};
use common::client_for;
use cousteau_fetch::{
    CreateRequest, ResultsRequest, add_tag, change_participants, latest_results, remove_tag,
    stop_measurement,
};
use cousteau_types::{
    AtlasSource, ChangeSource, CousteauError, FilterValue, MeasurementDefinition, MeasurementId,
    MeasurementType, SourceAction, SourceType,
};
use httpmock::prelude::*;
use serde_json::json;

#[tokio::test]
async fn test_create_measurement() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v2/measurements/")
                .query_param("key", "secret")
                .json_body(json!({
                    "definitions": [{
                        "type": "ping",
                        "af": 4,
                        "target": "www.ripe.net",
                        "description": "testing"
                    }],
                    "probes": [{"type": "country", "value": "GR", "requested": 2}],
                    "is_oneoff": true
                }));
            then.status(201).json_body(json!({"measurements": [1000002]}));
        })
        .await;

    let client = cousteau_fetch::AtlasClient::new(
        cousteau_fetch::ClientConfig {
            base_url: server.base_url(),
            ..cousteau_fetch::ClientConfig::default()
        }
        .key("secret"),
    )
    .unwrap();

    let payload = CreateRequest::new()
        .definition(
            MeasurementDefinition::new(MeasurementType::Ping)
                .option("af", 4)
                .option("target", "www.ripe.net")
                .option("description", "testing"),
        )
        .source(AtlasSource::new(SourceType::Country, "GR", 2))
        .oneoff(true)
        .send(&client)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(payload.get("measurements"), Some(&json!([1_000_002])));
}

#[tokio::test]
async fn test_create_malformed_sends_nothing() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(201);
        })
        .await;

    let result = CreateRequest::new()
        .definition(MeasurementDefinition::new(MeasurementType::Ping).option("af", 4))
        .source(AtlasSource::new(SourceType::Area, "WW", 0))
        .send(&client_for(&server))
        .await;

    assert!(matches!(result, Err(CousteauError::MalformedMeasurement(_))));
    assert_eq!(mock.hits_async().await, 0);
}

#[tokio::test]
async fn test_change_participants() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v2/measurements/1000002/participation-requests/")
                .json_body(json!([
                    {"action": "remove", "type": "probes", "value": "1,2", "requested": 2}
                ]));
            then.status(201).json_body(json!({"request_ids": [7]}));
        })
        .await;

    let sources = [ChangeSource::new(
        SourceAction::Remove,
        SourceType::Probes,
        "1,2",
        2,
    )];
    let payload = change_participants(&client_for(&server), MeasurementId::from(1_000_002), &sources)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(payload.get("request_ids"), Some(&json!([7])));
}

#[tokio::test]
async fn test_stop_measurement() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/v2/measurements/1000002");
            then.status(204);
        })
        .await;

    stop_measurement(&client_for(&server), MeasurementId::from(1_000_002))
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_latest_results_with_probe_ids() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/measurements/1001/latest")
                .query_param("probe_ids", "1,2,3");
            then.status(200).json_body(json!([{"prb_id": 1}, {"prb_id": 2}]));
        })
        .await;

    let payload = latest_results(
        &client_for(&server),
        MeasurementId::from(1001),
        Some(FilterValue::from(vec![1, 2, 3])),
    )
    .await
    .unwrap();

    mock.assert_async().await;
    assert_eq!(payload.into_json().as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_results_window() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/measurements/1001/results")
                .query_param("start", "1321833600")
                .query_param("stop", "1322352000")
                .query_param("probe_ids", "5");
            then.status(200).json_body(json!([]));
        })
        .await;

    ResultsRequest::new(MeasurementId::from(1001))
        .start(Utc.with_ymd_and_hms(2011, 11, 21, 0, 0, 0).unwrap())
        .stop(Utc.with_ymd_and_hms(2011, 11, 27, 0, 0, 0).unwrap())
        .probe_ids("5")
        .send(&client_for(&server))
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_tags() {
    let server = MockServer::start_async().await;
    let add = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v2/measurements/1001/tags/")
                .json_body(json!({"tag": "ipv6"}));
            then.status(201);
        })
        .await;
    let remove = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/v2/measurements/1001/tags/ipv6/");
            then.status(204);
        })
        .await;

    let client = client_for(&server);
    add_tag(&client, MeasurementId::from(1001), "ipv6").await.unwrap();
    remove_tag(&client, MeasurementId::from(1001), "ipv6")
        .await
        .unwrap();

    add.assert_async().await;
    remove.assert_async().await;
}
