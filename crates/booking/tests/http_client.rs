//! Integration tests for `HttpBookingService` against a loopback axum
//! server standing in for the booking API.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use gatewatch_booking::config::ApiConfig;
use gatewatch_booking::{
    BookingService, BookingServiceError, CreateSessionRequest, DeviceInfo, HttpBookingService,
};

const TOKEN: &str = "test-token";

#[derive(Clone, Default)]
struct Recorded {
    session_bodies: Arc<Mutex<Vec<Value>>>,
    closed_sessions: Arc<Mutex<Vec<String>>>,
}

fn booking_json(pnr: &str, gate: &str) -> Value {
    json!({
        "passenger": {
            "id": "p-42",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "loyaltyPoints": 1200
        },
        "booking": {
            "pnr": pnr,
            "status": "PENDING",
            "flight": {
                "id": "f-9",
                "flightNumber": "QF1",
                "origin": {"code": "SYD", "city": "Sydney", "country": "Australia"},
                "destination": {"code": "LHR", "city": "London", "country": "United Kingdom"},
                "departureTime": "2026-03-01T16:00:00+11:00",
                "arrivalTime": "2026-03-02T06:00:00+00:00",
                "boardingGate": gate
            }
        }
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn retrieve(
    headers: HeaderMap,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    match (params.get("pnr").map(String::as_str), params.get("lastName").map(String::as_str)) {
        (Some("QF1ABC"), Some("Lovelace")) => Ok(Json(booking_json("QF1ABC", "7"))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn passenger_me() -> Json<Value> {
    Json(json!({"passenger": booking_json("QF1ABC", "7")["passenger"].clone()}))
}

async fn create_session(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    rec.session_bodies.lock().unwrap().push(body);
    Json(json!({
        "sessionId": "sess-1",
        "wsUrl": "ws://127.0.0.1:1/ws",
        "expiresAt": "2030-01-01T00:00:00Z",
        "heartbeatIntervalSec": 15
    }))
}

async fn close_session(State(rec): State<Recorded>, Path(id): Path<String>) -> StatusCode {
    rec.closed_sessions.lock().unwrap().push(id);
    StatusCode::NO_CONTENT
}

async fn spawn_api() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/api/v1/bookings/retrieve", get(retrieve))
        .route("/api/v1/passenger/me", get(passenger_me))
        .route("/api/v1/notifications/sessions", post(create_session))
        .route("/api/v1/notifications/sessions/{id}", delete(close_session))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), recorded)
}

/// A base URL nothing is listening on.
async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn config(base_url: String, fallback: bool) -> ApiConfig {
    ApiConfig {
        base_url,
        token: TOKEN.into(),
        fallback_to_fixture: fallback,
        request_timeout: Duration::from_secs(5),
    }
}

// ---------------------------------------------------------------------------
// Test: retrieval sends the bearer token and parses the booking
// ---------------------------------------------------------------------------

#[tokio::test]
async fn retrieve_booking_parses_service_response() {
    let (base, _) = spawn_api().await;
    let client = HttpBookingService::new(&config(base, false)).unwrap();

    let found = client.retrieve_booking("qf1abc", "Lovelace").await.unwrap();

    assert_eq!(found.booking.pnr.as_str(), "QF1ABC");
    assert_eq!(found.booking.flight.boarding_gate.as_deref(), Some("7"));
    assert_eq!(found.passenger.first_name, "Ada");
}

// ---------------------------------------------------------------------------
// Test: a 404 without fallback surfaces as NotFound
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_booking_is_not_found_without_fallback() {
    let (base, _) = spawn_api().await;
    let client = HttpBookingService::new(&config(base, false)).unwrap();

    let err = client.retrieve_booking("ZZ99ZZ", "Nobody").await.unwrap_err();

    assert_matches!(err, BookingServiceError::NotFound(_));
}

// ---------------------------------------------------------------------------
// Test: invalid input is rejected before any request
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_pnr_is_rejected_locally() {
    let client = HttpBookingService::new(&config(dead_base_url().await, true)).unwrap();

    let err = client.retrieve_booking("AB1", "Nightingale").await.unwrap_err();

    assert_matches!(err, BookingServiceError::Validation(_));
}

// ---------------------------------------------------------------------------
// Test: unreachable service falls back to the fixture
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_service_uses_fixture_when_enabled() {
    let client = HttpBookingService::new(&config(dead_base_url().await, true)).unwrap();

    let found = client.retrieve_booking("AB12CD", "nightingale").await.unwrap();
    assert_eq!(found.booking.flight.flight_number, "VA801");

    let err = client.retrieve_booking("QF1ABC", "Lovelace").await.unwrap_err();
    assert_matches!(err, BookingServiceError::NotFound(_));
}

#[tokio::test]
async fn unreachable_service_fails_when_fallback_disabled() {
    let client = HttpBookingService::new(&config(dead_base_url().await, false)).unwrap();

    let err = client.retrieve_booking("AB12CD", "Nightingale").await.unwrap_err();

    assert_matches!(err, BookingServiceError::Request(_));
}

// ---------------------------------------------------------------------------
// Test: gate changes reach the fallback fixture
// ---------------------------------------------------------------------------

#[tokio::test]
async fn gate_change_is_visible_through_fallback() {
    let client = HttpBookingService::new(&config(dead_base_url().await, true)).unwrap();

    client.apply_gate_change("14");
    let found = client.retrieve_booking("AB12CD", "Nightingale").await.unwrap();

    assert_eq!(found.booking.flight.boarding_gate.as_deref(), Some("14"));
}

// ---------------------------------------------------------------------------
// Test: session lifecycle endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_session_posts_camel_case_request() {
    let (base, recorded) = spawn_api().await;
    let client = HttpBookingService::new(&config(base, false)).unwrap();

    let session = client
        .create_channel_session(&CreateSessionRequest {
            passenger_id: "p-42".into(),
            booking_pnr: "QF1ABC".into(),
            device: Some(DeviceInfo {
                client_type: Some("cli".into()),
                user_agent: Some("test".into()),
            }),
        })
        .await
        .unwrap();

    assert_eq!(session.session_id, "sess-1");
    assert_eq!(session.channel_url, "ws://127.0.0.1:1/ws");
    assert_eq!(session.heartbeat_interval_sec, 15);

    let bodies = recorded.session_bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["bookingPnr"], "QF1ABC");
    assert_eq!(bodies[0]["device"]["clientType"], "cli");
}

#[tokio::test]
async fn close_session_sends_delete() {
    let (base, recorded) = spawn_api().await;
    let client = HttpBookingService::new(&config(base, false)).unwrap();

    client.close_channel_session("sess-1").await.unwrap();

    assert_eq!(*recorded.closed_sessions.lock().unwrap(), vec!["sess-1".to_string()]);
}

#[tokio::test]
async fn session_falls_back_to_fixture_descriptor() {
    let client = HttpBookingService::new(&config(dead_base_url().await, true)).unwrap();

    let session = client
        .create_channel_session(&CreateSessionRequest {
            passenger_id: "p".into(),
            booking_pnr: "AB12CD".into(),
            device: None,
        })
        .await
        .unwrap();

    assert!(session.channel_url.starts_with("ws://localhost:0/"));
}

// ---------------------------------------------------------------------------
// Test: current passenger is best-effort
// ---------------------------------------------------------------------------

#[tokio::test]
async fn current_passenger_comes_from_service() {
    let (base, _) = spawn_api().await;
    let client = HttpBookingService::new(&config(base, false)).unwrap();

    assert_eq!(client.current_passenger().await.last_name, "Lovelace");
}

#[tokio::test]
async fn current_passenger_defaults_to_demo_passenger() {
    let client = HttpBookingService::new(&config(dead_base_url().await, false)).unwrap();

    assert_eq!(client.current_passenger().await.last_name, "Nightingale");
}
