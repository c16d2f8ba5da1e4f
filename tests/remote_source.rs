//! Integration tests for `RemoteSource` against a mocked parking service.

use parkpulse::error::AppError;
use parkpulse::pipeline::{Pipeline, PipelineOptions};
use parkpulse::source::fixture::FixtureSource;
use parkpulse::source::remote::RemoteSource;
use parkpulse::source::{DataSource, Place};
use parkpulse::state::ResolvePhase;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_source(base_url: &str) -> RemoteSource {
    RemoteSource::new(base_url).expect("client construction should not fail")
}

#[tokio::test]
async fn geo_search_parses_the_items_envelope() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "items": [
            { "name": "Federation Square", "lat": -37.817979, "lng": 144.969093 },
            { "name": "Federation Wharf", "lat": -37.818860, "lng": 144.971174 }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/api/v1/geo/search"))
        .and(query_param("q", "fed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let source = test_source(&server.uri());
    let places = source.geo_search("fed").await.expect("should parse places");

    assert_eq!(places.len(), 2);
    assert_eq!(places[0].name, "Federation Square");
    assert_eq!(places[0].id, None);
    assert_eq!(places[1].lat, -37.818860);
}

#[tokio::test]
async fn parking_by_name_normalises_wire_records() {
    let server = MockServer::start().await;

    let body = serde_json::json!([
        {
            "id": "PARK001",
            "name": "Flinders Street Car Park",
            "lat": -37.8175,
            "lng": 144.9658,
            "capacity": 450,
            "available": 900
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/api/v1/parking"))
        .and(query_param("dest", "flinders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let source = test_source(&server.uri());
    let lots = source
        .parking_by_name("flinders")
        .await
        .expect("should parse lots");

    assert_eq!(lots.len(), 1);
    assert_eq!(lots[0].id, "PARK001");
    assert_eq!(lots[0].available_spots, 450);
    assert_eq!(lots[0].price, None);
}

#[tokio::test]
async fn push_updates_skips_lots_the_service_no_longer_knows() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "id": "PARK001",
        "name": "Flinders Street Car Park",
        "lat": -37.8175,
        "lng": 144.9658,
        "capacity": 450,
        "available": 200
    });

    Mock::given(method("GET"))
        .and(path("/api/v1/parking/PARK001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/parking/PARK404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(
            &serde_json::json!({ "error": "Not found" }),
        ))
        .mount(&server)
        .await;

    let source = test_source(&server.uri());
    let updates = source
        .push_updates(&["PARK001".to_string(), "PARK404".to_string()])
        .await
        .expect("should skip the missing lot");

    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].id, "PARK001");
    assert_eq!(updates[0].available_spots, 200);
}

#[tokio::test]
async fn server_errors_are_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/parking"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = test_source(&server.uri());
    let err = source
        .parking_by_name("flinders")
        .await
        .expect_err("server error should surface");

    assert!(matches!(err, AppError::Http(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn resolve_falls_back_to_fixtures_when_the_service_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/parking"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let pipeline = Arc::new(Pipeline::new(
        Arc::new(test_source(&server.uri())),
        Some(Arc::new(FixtureSource::melbourne_demo())),
        PipelineOptions::default(),
    ));

    pipeline
        .resolve(Place::new("Federation Square", -37.817979, 144.969093))
        .await
        .expect("fallback should serve the resolve");

    let state = pipeline.state();
    let guard = state.read().expect("session lock");
    assert_eq!(guard.phase(), ResolvePhase::Ready);
    let snapshot = guard.snapshot().expect("published snapshot");
    assert_eq!(snapshot.lot_ids(), vec!["CP-101", "CP-102", "CP-103"]);
}

#[tokio::test]
async fn resolve_renders_empty_when_no_fallback_exists() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/parking"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let pipeline = Arc::new(Pipeline::new(
        Arc::new(test_source(&server.uri())),
        None,
        PipelineOptions::default(),
    ));

    pipeline
        .resolve(Place::new("Federation Square", -37.817979, 144.969093))
        .await
        .expect("failed fetch should render, not error");

    let state = pipeline.state();
    let guard = state.read().expect("session lock");
    assert_eq!(guard.phase(), ResolvePhase::Ready);
    let snapshot = guard.snapshot().expect("published snapshot");
    assert!(snapshot.lots.is_empty());
    assert_eq!(snapshot.advice().nearest_km, None);
}

#[tokio::test]
async fn suggestions_fall_back_when_geocoding_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/geo/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let options = PipelineOptions {
        debounce: Duration::from_millis(25),
        ..PipelineOptions::default()
    };
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(test_source(&server.uri())),
        Some(Arc::new(FixtureSource::melbourne_demo())),
        options,
    ));

    pipeline.search_input("federation").expect("schedule search");
    tokio::time::sleep(Duration::from_millis(500)).await;

    let state = pipeline.state();
    let guard = state.read().expect("session lock");
    let names: Vec<&str> = guard
        .candidates()
        .iter()
        .map(|place| place.name.as_str())
        .collect();
    assert_eq!(names, vec!["Federation Square"]);
}
