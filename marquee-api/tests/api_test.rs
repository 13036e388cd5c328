use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use marquee_api::middleware::auth::{encode_token, Claims};
use marquee_api::{app, AppState, AuthConfig};
use marquee_core::LogMailer;
use marquee_ledger::MemoryStore;
use marquee_shared::Role;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "test-secret";

struct Caller {
    id: Uuid,
    token: String,
}

fn caller(role: Role) -> Caller {
    let id = Uuid::new_v4();
    let claims = Claims::new(
        id,
        &format!("{}@example.com", id.simple()),
        "Test Caller",
        role,
        Duration::hours(1),
    );
    Caller {
        id,
        token: encode_token(&claims, SECRET).unwrap(),
    }
}

fn test_app() -> Router {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        ledger: store.clone(),
        events: store.clone(),
        users: store,
        mailer: Arc::new(LogMailer::new("noreply@marquee.test")),
        auth: AuthConfig {
            secret: SECRET.to_string(),
        },
    };
    app(state, &[])
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create_event(app: &Router, organizer: &Caller, capacity: i32) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/events",
        Some(&organizer.token),
        Some(json!({
            "name": "Rust Conf",
            "description": "Talks and workshops",
            "venue": "Hall A",
            "date_time": (Utc::now() + Duration::days(7)).to_rfc3339(),
            "category": "Technology",
            "capacity": capacity,
            "ticket_price": "25.00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["event_id"].as_str().unwrap().to_string()
}

async fn book(app: &Router, attendee: &Caller, event_id: &str, tickets: i32) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/bookings",
        Some(&attendee.token),
        Some(json!({ "event_id": event_id, "tickets_booked": tickets })),
    )
    .await
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn test_protected_routes_require_a_valid_token() {
    let app = test_app();

    let (status, _) = send(&app, Method::GET, "/api/bookings/my-bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/bookings/my-bookings", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = Claims::new(Uuid::new_v4(), "late@example.com", "Late", Role::Attendee, Duration::hours(-2));
    let token = encode_token(&expired, SECRET).unwrap();
    let (status, _) = send(&app, Method::GET, "/api/bookings/my-bookings", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_attendees_cannot_create_events() {
    let app = test_app();
    let attendee = caller(Role::Attendee);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/events",
        Some(&attendee.token),
        Some(json!({
            "name": "Sneaky",
            "venue": "Nowhere",
            "date_time": (Utc::now() + Duration::days(1)).to_rfc3339(),
            "category": "Other",
            "capacity": 10,
            "ticket_price": "0",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_event_is_rejected() {
    let app = test_app();
    let organizer = caller(Role::Organizer);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/events",
        Some(&organizer.token),
        Some(json!({
            "name": "Yesterday",
            "venue": "Hall B",
            "date_time": (Utc::now() - Duration::days(1)).to_rfc3339(),
            "category": "Music",
            "capacity": 0,
            "ticket_price": "10.00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("capacity"));
    assert!(message.contains("future"));
}

#[tokio::test]
async fn test_booking_flow_enforces_capacity() {
    let app = test_app();
    let organizer = caller(Role::Organizer);
    let first = caller(Role::Attendee);
    let second = caller(Role::Attendee);
    let event_id = create_event(&app, &organizer, 10).await;

    let (status, body) = book(&app, &first, &event_id, 6).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["message"], "Booking confirmed successfully");
    assert_eq!(body["booking"]["total_price"], "150.00");
    assert_eq!(body["booking"]["event_name"], "Rust Conf");

    let (status, body) = book(&app, &second, &event_id, 6).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["available"], 4);

    let (status, _) = book(&app, &second, &event_id, 4).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::GET, &format!("/api/events/{}", event_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tickets_sold"], 10);
    assert_eq!(body["available_tickets"], 0);
}

#[tokio::test]
async fn test_zero_tickets_is_bad_request() {
    let app = test_app();
    let organizer = caller(Role::Organizer);
    let attendee = caller(Role::Attendee);
    let event_id = create_event(&app, &organizer, 10).await;

    let (status, _) = book(&app, &attendee, &event_id, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, Method::GET, "/api/bookings/my-bookings", Some(&attendee.token), None).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_unknown_event_is_not_found() {
    let app = test_app();
    let attendee = caller(Role::Attendee);

    let (status, body) = book(&app, &attendee, &Uuid::new_v4().to_string(), 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Event not found");
}

#[tokio::test]
async fn test_cancel_returns_refund_once() {
    let app = test_app();
    let organizer = caller(Role::Organizer);
    let attendee = caller(Role::Attendee);
    let event_id = create_event(&app, &organizer, 10).await;
    let (_, body) = book(&app, &attendee, &event_id, 2).await;
    let booking_uri = format!("/api/bookings/{}", body["booking"]["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        Method::DELETE,
        &booking_uri,
        Some(&attendee.token),
        Some(json!({ "reason": "Plans changed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["refund_amount"], "50.00");
    assert_eq!(body["refund_note"], "Refund will be processed within 5-7 business days");

    let (status, body) = send(&app, Method::DELETE, &booking_uri, Some(&attendee.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Booking is already cancelled");
}

#[tokio::test]
async fn test_booking_visibility() {
    let app = test_app();
    let organizer = caller(Role::Organizer);
    let attendee = caller(Role::Attendee);
    let stranger = caller(Role::Attendee);
    let event_id = create_event(&app, &organizer, 10).await;
    let (_, body) = book(&app, &attendee, &event_id, 1).await;
    let booking_uri = format!("/api/bookings/{}", body["booking"]["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::GET, &booking_uri, Some(&attendee.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &booking_uri, Some(&organizer.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &booking_uri, Some(&stranger.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let attendees_uri = format!("/api/bookings/event/{}/attendees", event_id);
    let (status, body) = send(&app, Method::GET, &attendees_uri, Some(&organizer.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    let (status, _) = send(&app, Method::GET, &attendees_uri, Some(&stranger.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_only_owner_updates_event() {
    let app = test_app();
    let owner = caller(Role::Organizer);
    let rival = caller(Role::Organizer);
    let event_id = create_event(&app, &owner, 10).await;
    let uri = format!("/api/events/{}", event_id);

    let (status, _) = send(&app, Method::PUT, &uri, Some(&rival.token), Some(json!({ "name": "Hijacked" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&owner.token),
        Some(json!({ "name": "Rust Conf 2", "capacity": 9999 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"]["name"], "Rust Conf 2");
    assert_eq!(body["event"]["capacity"], 10);
}

#[tokio::test]
async fn test_admin_cancels_event_and_its_bookings() {
    let app = test_app();
    let organizer = caller(Role::Organizer);
    let attendee = caller(Role::Attendee);
    let admin = caller(Role::Admin);
    let event_id = create_event(&app, &organizer, 10).await;
    book(&app, &attendee, &event_id, 3).await;

    let (status, body) = send(&app, Method::DELETE, &format!("/api/events/{}", event_id), Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bookings_cancelled"], 1);

    let (_, body) = send(&app, Method::GET, "/api/bookings/my-bookings", Some(&attendee.token), None).await;
    assert_eq!(body[0]["status"], "cancelled");

    let (status, _) = book(&app, &attendee, &event_id, 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_event_listing_pagination() {
    let app = test_app();
    let organizer = caller(Role::Organizer);
    for _ in 0..3 {
        create_event(&app, &organizer, 10).await;
    }

    let (status, body) = send(&app, Method::GET, "/api/events", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, body) = send(&app, Method::GET, "/api/events?page=2&limit=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["events"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_organizer_dashboard() {
    let app = test_app();
    let organizer = caller(Role::Organizer);
    let attendee = caller(Role::Attendee);
    let event_id = create_event(&app, &organizer, 10).await;
    book(&app, &attendee, &event_id, 4).await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/events/organizer/dashboard-stats",
        Some(&organizer.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalEvents"], 1);
    assert_eq!(body["totalAttendees"], 4);
    assert_eq!(body["totalRevenue"], "100.00");

    let (status, body) = send(&app, Method::GET, "/api/events/organizer/my-events", Some(&organizer.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["tickets_sold"], 4);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/events/organizer/dashboard-stats",
        Some(&attendee.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_profile_update_rules() {
    let app = test_app();
    let first = caller(Role::Attendee);
    let second = caller(Role::Attendee);

    let (status, body) = send(&app, Method::GET, "/api/users/profile", Some(&first.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], first.id.to_string());
    let first_email = body["email"].as_str().unwrap().to_string();

    // Provision the second user before trying to steal the first one's email.
    send(&app, Method::GET, "/api/users/profile", Some(&second.token), None).await;
    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/users/profile",
        Some(&second.token),
        Some(json!({ "name": "Second", "email": first_email })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/users/profile",
        Some(&second.token),
        Some(json!({ "name": "S", "email": "second@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/users/profile",
        Some(&second.token),
        Some(json!({ "name": "Second", "email": "Second@Example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "second@example.com");
}
