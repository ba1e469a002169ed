//! Integration tests for the distance-matrix client against a mock server.

use rover_maps::{DrivingTimePair, DrivingTimesClient, MapsError};
use serde_json::json;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> DrivingTimesClient {
    DrivingTimesClient::with_base_url("test-key", 30, "rover-test/0.1", base_url)
        .expect("client construction should not fail")
}

fn pair(origin: &str, destination: &str) -> DrivingTimePair {
    DrivingTimePair {
        origin_address: origin.to_string(),
        destination_address: destination.to_string(),
    }
}

fn ok_body(seconds: i64, duration_text: &str, distance_text: &str) -> serde_json::Value {
    json!({
        "status": "OK",
        "rows": [{
            "elements": [{
                "status": "OK",
                "duration": { "text": duration_text, "value": seconds },
                "distance": { "text": distance_text, "value": 15_200 }
            }]
        }]
    })
}

#[tokio::test]
async fn resolved_pair_carries_duration_and_distance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("origins", "Hauptplatz 1, 8010 Graz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(1260, "21 Minuten", "15,2 km")))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client
        .driving_time(&pair("Hauptplatz 1, 8010 Graz", "Murpark 1, 8041 Graz"))
        .await
        .expect("lookup should succeed");

    assert!(result.is_ok());
    assert_eq!(result.duration_seconds, Some(1260));
    assert_eq!(result.duration_text.as_deref(), Some("21 Minuten"));
    assert_eq!(result.distance_text.as_deref(), Some("15,2 km"));
}

#[tokio::test]
async fn unresolvable_pair_is_a_failed_slot_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "rows": [{ "elements": [{ "status": "NOT_FOUND" }] }]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client
        .driving_time(&pair("Nirgendwo 99", "Hauptplatz 1"))
        .await
        .expect("element-level failure is not a client error");

    assert!(!result.is_ok());
    assert_eq!(result.status, "NOT_FOUND");
    assert_eq!(result.duration_seconds, None);
}

#[tokio::test]
async fn request_denied_surfaces_as_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .driving_time(&pair("A", "B"))
        .await
        .expect_err("top-level rejection should error");

    match err {
        MapsError::ApiError(msg) => assert!(msg.contains("API key is invalid"), "{msg}"),
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn over_query_limit_surfaces_as_quota_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "OVER_QUERY_LIMIT" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.driving_time(&pair("A", "B")).await.unwrap_err();
    assert!(matches!(err, MapsError::QuotaExceeded(_)));
}

#[tokio::test]
async fn batch_results_keep_the_pair_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("origins", "Erster Weg 1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(600, "10 Minuten", "8 km")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("origins", "Zweiter Weg 2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(ok_body(1800, "30 Minuten", "32 km")),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let results = client
        .driving_times(&[
            pair("Erster Weg 1", "Ziel 1"),
            pair("Zweiter Weg 2", "Ziel 2"),
        ])
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].duration_seconds, Some(600));
    assert_eq!(results[1].duration_seconds, Some(1800));
}

#[tokio::test]
async fn failed_lookup_degrades_its_slot_in_a_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("origins", "Kaputt 1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("origins", "Heil 2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(300, "5 Minuten", "3 km")))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let results = client
        .driving_times(&[pair("Kaputt 1", "Ziel"), pair("Heil 2", "Ziel")])
        .await;

    assert_eq!(results[0].status, "ERROR");
    assert_eq!(results[0].duration_seconds, None);
    assert_eq!(results[1].duration_seconds, Some(300));
}
