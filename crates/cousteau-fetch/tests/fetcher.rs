mod common;

use common::client_for;
use cousteau_fetch::{EntityRequest, fetch_measurement, fetch_probe};
use cousteau_types::{CousteauError, Measurement, MeasurementId, Probe, ProbeId};
use httpmock::prelude::*;
use serde_json::json;

fn probe_meta() -> serde_json::Value {
    json!({
        "id": 1,
        "is_anchor": false,
        "country_code": "GR",
        "asn_v4": 3333,
        "address_v4": "193.0.0.1",
        "status": {"id": 1, "name": "Connected", "since": "2015-01-01T00:00:00"}
    })
}

#[tokio::test]
async fn test_fetch_probe_with_fields() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v2/probes/1/")
                .query_param("fields", "status,country_code");
            then.status(200).json_body(probe_meta());
        })
        .await;

    let client = client_for(&server);
    let probe: Probe = EntityRequest::by_id(ProbeId::from(1))
        .fields(["status", "country_code"])
        .load(&client)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(probe.id(), Some(ProbeId::from(1)));
    assert_eq!(probe.country_code(), Some("GR"));
    assert_eq!(probe.asn_v4(), Some(3333));
    assert_eq!(probe.status(), Some("Connected"));
}

#[tokio::test]
async fn test_metadata_equals_fetched_object() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2/probes/1/");
            then.status(200).json_body(probe_meta());
        })
        .await;

    let client = client_for(&server);
    let fetched = fetch_probe(&client, ProbeId::from(1)).await.unwrap();
    assert_eq!(mock.hits_async().await, 1);

    let supplied: Probe = EntityRequest::from_metadata(probe_meta())
        .load(&client)
        .await
        .unwrap();
    assert_eq!(mock.hits_async().await, 1);
    assert_eq!(fetched, supplied);
}

#[tokio::test]
async fn test_fetch_measurement() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2/measurements/1000002/");
            then.status(200).json_body(json!({
                "id": 1000002,
                "af": 4,
                "type": "ping",
                "start_time": 1_444_953_600,
                "stop_time": 0,
                "status": {"id": 2, "name": "Ongoing"},
                "result": "https://atlas.ripe.net/api/v2/measurements/1000002/results"
            }));
        })
        .await;

    let client = client_for(&server);
    let measurement: Measurement = fetch_measurement(&client, MeasurementId::from(1_000_002))
        .await
        .unwrap();

    assert_eq!(measurement.id(), Some(MeasurementId::from(1_000_002)));
    assert_eq!(measurement.protocol(), Some(4));
    assert_eq!(measurement.kind(), Some("ping"));
    assert_eq!(measurement.status(), Some("Ongoing"));
    assert_eq!(measurement.status_id(), Some(2));
    assert_eq!(
        measurement.start_time().map(|t| t.timestamp()),
        Some(1_444_953_600)
    );
    assert!(measurement.stop_time().is_none());
}

#[tokio::test]
async fn test_fetch_error_carries_payload() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2/probes/99/");
            then.status(404)
                .json_body(json!({"error": {"status": 404, "title": "Not Found"}}));
        })
        .await;

    let client = client_for(&server);
    match fetch_probe(&client, ProbeId::from(99)).await {
        Err(CousteauError::ApiResponse(payload)) => {
            assert_eq!(payload.get("error").and_then(|e| e.get("status")), Some(&json!(404)));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
