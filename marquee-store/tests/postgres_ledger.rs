//! Runs against a real database only when `MARQUEE_TEST_DATABASE_URL` is set.

use std::sync::Arc;

use chrono::{Duration, Utc};
use marquee_core::repository::{EventFilter, NewEvent, ReserveRequest};
use marquee_core::{Actor, BookingLedger, EventRepository, LedgerError, UserRepository};
use marquee_ledger::catalog::{self, MAX_CAPACITY};
use marquee_shared::{Event, EventCategory, Role, User};
use marquee_store::app_config::DatabaseConfig;
use marquee_store::{DbClient, PgBookingLedger, PgEventRepository, PgUserRepository};
use rust_decimal::Decimal;
use uuid::Uuid;

struct Fixture {
    ledger: Arc<PgBookingLedger>,
    events: PgEventRepository,
    users: PgUserRepository,
}

async fn fixture() -> Option<Fixture> {
    let url = std::env::var("MARQUEE_TEST_DATABASE_URL").ok()?;
    let db = DbClient::new(&DatabaseConfig {
        url,
        max_connections: 10,
        acquire_timeout_seconds: 5,
    })
    .await
    .expect("connect to test database");
    db.migrate().await.expect("run migrations");

    Some(Fixture {
        ledger: Arc::new(PgBookingLedger::new(db.pool.clone())),
        events: PgEventRepository::new(db.pool.clone()),
        users: PgUserRepository::new(db.pool),
    })
}

async fn user(f: &Fixture, role: Role) -> User {
    let id = Uuid::new_v4();
    let user = User::new(id, format!("{}@example.com", id.simple()), "Test User", role);
    f.users.ensure_user(&user).await.unwrap();
    user
}

async fn event(f: &Fixture, organizer: &User, capacity: i32, starts_in: Duration) -> Event {
    let draft = NewEvent {
        name: "Integration Night".to_string(),
        description: Some("Storage round trip".to_string()),
        venue: "Basement".to_string(),
        date_time: Utc::now() + starts_in,
        category: EventCategory::Music,
        capacity,
        ticket_price: Decimal::new(1250, 2),
        image_url: None,
    };
    f.events.create_event(organizer.id, &draft).await.unwrap()
}

#[tokio::test]
async fn test_concurrent_reservations_respect_capacity() {
    let Some(f) = fixture().await else { return };
    let organizer = user(&f, Role::Organizer).await;
    let e = event(&f, &organizer, 10, Duration::days(3)).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let attendee = user(&f, Role::Attendee).await;
        let ledger = f.ledger.clone();
        let request = ReserveRequest {
            event_id: e.id,
            attendee_id: attendee.id,
            tickets: 6,
        };
        handles.push(tokio::spawn(async move { ledger.reserve(request, Utc::now()).await }));
    }

    let mut confirmed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => confirmed += 1,
            Err(LedgerError::CapacityExceeded { .. }) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(confirmed, 1);

    let listing = f.events.get_event(e.id).await.unwrap().unwrap();
    assert_eq!(listing.tickets_sold, 6);
    assert_eq!(listing.available_tickets, 4);
}

#[tokio::test]
async fn test_cancel_is_guarded_against_repeats() {
    let Some(f) = fixture().await else { return };
    let organizer = user(&f, Role::Organizer).await;
    let attendee = user(&f, Role::Attendee).await;
    let e = event(&f, &organizer, 5, Duration::days(3)).await;

    let reservation = f
        .ledger
        .reserve(
            ReserveRequest {
                event_id: e.id,
                attendee_id: attendee.id,
                tickets: 2,
            },
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(reservation.booking.total_price, Decimal::new(2500, 2));

    let actor = Actor::new(attendee.id, Role::Attendee);
    let refund = f.ledger.cancel(reservation.booking.id, &actor, Utc::now()).await.unwrap();
    assert_eq!(refund.amount, Decimal::new(2500, 2));

    assert!(matches!(
        f.ledger.cancel(reservation.booking.id, &actor, Utc::now()).await,
        Err(LedgerError::AlreadyCancelled)
    ));
}

#[tokio::test]
async fn test_unknown_attendee_is_not_found() {
    let Some(f) = fixture().await else { return };
    let organizer = user(&f, Role::Organizer).await;
    let e = event(&f, &organizer, 5, Duration::days(3)).await;

    let result = f
        .ledger
        .reserve(
            ReserveRequest {
                event_id: e.id,
                attendee_id: Uuid::new_v4(),
                tickets: 1,
            },
            Utc::now(),
        )
        .await;
    assert!(matches!(result, Err(LedgerError::NotFound("User"))));
}

#[tokio::test]
async fn test_cancel_event_cascades() {
    let Some(f) = fixture().await else { return };
    let organizer = user(&f, Role::Organizer).await;
    let attendee = user(&f, Role::Attendee).await;
    let e = event(&f, &organizer, 5, Duration::days(3)).await;
    for tickets in [1, 2] {
        f.ledger
            .reserve(
                ReserveRequest {
                    event_id: e.id,
                    attendee_id: attendee.id,
                    tickets,
                },
                Utc::now(),
            )
            .await
            .unwrap();
    }

    assert_eq!(f.events.cancel_event(e.id).await.unwrap(), 2);
    assert!(f.ledger.event_attendees(e.id).await.unwrap().is_empty());

    let stats = f.events.organizer_stats(organizer.id, Utc::now()).await.unwrap();
    assert_eq!(stats.total_events, 1);
    assert_eq!(stats.active_events, 0);
    assert_eq!(stats.total_bookings, 0);
    assert_eq!(stats.total_revenue, Decimal::ZERO);
}

#[tokio::test]
async fn test_reservation_at_maximum_price_is_stored() {
    let Some(f) = fixture().await else { return };
    let organizer = user(&f, Role::Organizer).await;
    let attendee = user(&f, Role::Attendee).await;

    let draft = NewEvent {
        name: "Gala Dinner".to_string(),
        description: None,
        venue: "Grand Ballroom".to_string(),
        date_time: Utc::now() + Duration::days(30),
        category: EventCategory::Charity,
        capacity: MAX_CAPACITY,
        ticket_price: Decimal::from(100_000),
        image_url: None,
    };
    catalog::validate_new_event(&draft, Utc::now()).unwrap();
    let e = f.events.create_event(organizer.id, &draft).await.unwrap();

    let reservation = f
        .ledger
        .reserve(
            ReserveRequest {
                event_id: e.id,
                attendee_id: attendee.id,
                tickets: MAX_CAPACITY,
            },
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(reservation.booking.total_price, Decimal::from(1_000_000_000));

    let stored = f.ledger.get_booking(reservation.booking.id).await.unwrap().unwrap();
    assert_eq!(stored.booking.total_price, Decimal::from(1_000_000_000));
}

#[tokio::test]
async fn test_identical_requests_at_same_instant_both_book() {
    let Some(f) = fixture().await else { return };
    let organizer = user(&f, Role::Organizer).await;
    let attendee = user(&f, Role::Attendee).await;
    let e = event(&f, &organizer, 10, Duration::days(3)).await;

    let now = Utc::now();
    let request = ReserveRequest {
        event_id: e.id,
        attendee_id: attendee.id,
        tickets: 2,
    };
    let first = f.ledger.reserve(request, now).await.unwrap().booking;
    let second = f.ledger.reserve(request, now).await.unwrap().booking;

    assert_ne!(first.ticket_code, second.ticket_code);
    assert_eq!(f.ledger.event_attendees(e.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let Some(f) = fixture().await else { return };
    let organizer = user(&f, Role::Organizer).await;
    let term = format!("{}_50%", Uuid::new_v4().simple());

    let draft = NewEvent {
        name: format!("Sale {}", term),
        description: None,
        venue: "Market Hall".to_string(),
        date_time: Utc::now() + Duration::days(3),
        category: EventCategory::Business,
        capacity: 10,
        ticket_price: Decimal::ZERO,
        image_url: None,
    };
    let literal = f.events.create_event(organizer.id, &draft).await.unwrap();

    let lookalike = NewEvent {
        name: format!("Sale {}", term.replace('_', "x").replace('%', "0")),
        ..draft
    };
    f.events.create_event(organizer.id, &lookalike).await.unwrap();

    let filter = EventFilter {
        search: Some(term),
        ..Default::default()
    };
    let page = f.events.list_events(&filter, Utc::now()).await.unwrap();
    let ids: Vec<Uuid> = page.events.iter().map(|l| l.event.id).collect();
    assert_eq!(ids, vec![literal.id]);
}
