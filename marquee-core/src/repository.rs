use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use marquee_shared::{Booking, BookingDetails, Event, EventCategory, EventListing, User};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::Actor;
use crate::LedgerResult;

// ============================================================================
// Ledger types
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct ReserveRequest {
    pub event_id: Uuid,
    pub attendee_id: Uuid,
    pub tickets: i32,
}

/// A successful reservation, with the event facts a confirmation needs.
#[derive(Debug, Clone, Serialize)]
pub struct Reservation {
    pub booking: Booking,
    pub event_name: String,
    pub event_date: DateTime<Utc>,
    pub venue: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Refund {
    pub booking_id: Uuid,
    pub amount: Decimal,
    pub note: String,
    /// The booking as it was just before cancellation.
    #[serde(skip)]
    pub booking: BookingDetails,
}

// ============================================================================
// Catalogue types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub description: Option<String>,
    pub venue: String,
    pub date_time: DateTime<Utc>,
    pub category: EventCategory,
    pub capacity: i32,
    pub ticket_price: Decimal,
    pub image_url: Option<String>,
}

/// Editable event fields. Capacity is fixed at creation and deliberately absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub venue: Option<String>,
    pub date_time: Option<DateTime<Utc>>,
    pub category: Option<EventCategory>,
    pub ticket_price: Option<Decimal>,
    pub image_url: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.venue.is_none()
            && self.date_time.is_none()
            && self.category.is_none()
            && self.ticket_price.is_none()
            && self.image_url.is_none()
    }

    pub fn apply(&self, event: &mut Event) {
        if let Some(name) = &self.name {
            event.name = name.clone();
        }
        if let Some(description) = &self.description {
            event.description = Some(description.clone());
        }
        if let Some(venue) = &self.venue {
            event.venue = venue.clone();
        }
        if let Some(date_time) = self.date_time {
            event.date_time = date_time;
        }
        if let Some(category) = self.category {
            event.category = category;
        }
        if let Some(price) = self.ticket_price {
            event.ticket_price = price;
        }
        if let Some(image_url) = &self.image_url {
            event.image_url = Some(image_url.clone());
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub category: Option<EventCategory>,
    pub venue: Option<String>,
    pub search: Option<String>,
    pub date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl EventFilter {
    /// Pagination applies only when both `page` and `limit` are given.
    pub fn pagination(&self) -> Option<(u32, u32)> {
        match (self.page, self.limit) {
            (Some(page), Some(limit)) => Some((page.max(1), limit.clamp(1, 100))),
            _ => None,
        }
    }

    /// In-process form of the filter, shared by the in-memory store and tests.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(category) = self.category {
            if event.category != category {
                return false;
            }
        }
        if let Some(venue) = &self.venue {
            if !event.venue.to_lowercase().contains(&venue.to_lowercase()) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let term = search.to_lowercase();
            let in_name = event.name.to_lowercase().contains(&term);
            let in_description = event
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&term))
                .unwrap_or(false);
            if !in_name && !in_description {
                return false;
            }
        }
        if let Some(date) = self.date {
            if event.date_time.date_naive() != date {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventPage {
    pub events: Vec<EventListing>,
    pub total: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerStats {
    pub total_events: i64,
    pub active_events: i64,
    pub total_attendees: i64,
    pub total_revenue: Decimal,
    pub total_bookings: i64,
}

// ============================================================================
// Reminder types
// ============================================================================

#[derive(Debug, Clone)]
pub struct ReminderTarget {
    pub booking_id: Uuid,
    pub attendee_name: String,
    pub attendee_email: String,
    pub event_name: String,
    pub event_date: DateTime<Utc>,
    pub venue: String,
    pub tickets_booked: i32,
}

// ============================================================================
// Traits
// ============================================================================

/// The booking ledger: the only way bookings are created or cancelled.
#[async_trait]
pub trait BookingLedger: Send + Sync {
    /// Atomically check remaining capacity and record a confirmed booking.
    async fn reserve(&self, request: ReserveRequest, now: DateTime<Utc>) -> LedgerResult<Reservation>;

    /// Cancel a confirmed booking on behalf of `actor`.
    async fn cancel(&self, booking_id: Uuid, actor: &Actor, now: DateTime<Utc>) -> LedgerResult<Refund>;

    async fn get_booking(&self, booking_id: Uuid) -> LedgerResult<Option<BookingDetails>>;

    async fn bookings_for_attendee(&self, attendee_id: Uuid) -> LedgerResult<Vec<BookingDetails>>;

    /// Confirmed bookings of an event, newest first.
    async fn event_attendees(&self, event_id: Uuid) -> LedgerResult<Vec<BookingDetails>>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create_event(&self, organizer_id: Uuid, event: &NewEvent) -> LedgerResult<Event>;

    async fn get_event(&self, id: Uuid) -> LedgerResult<Option<EventListing>>;

    /// Active events that have not started yet, soonest first.
    async fn list_events(&self, filter: &EventFilter, now: DateTime<Utc>) -> LedgerResult<EventPage>;

    async fn events_by_organizer(&self, organizer_id: Uuid) -> LedgerResult<Vec<EventListing>>;

    async fn update_event(&self, id: Uuid, patch: &EventPatch) -> LedgerResult<Event>;

    /// Cancel the event and every confirmed booking for it in one unit.
    /// Returns the number of bookings cancelled.
    async fn cancel_event(&self, id: Uuid) -> LedgerResult<u64>;

    async fn organizer_stats(&self, organizer_id: Uuid, now: DateTime<Utc>) -> LedgerResult<OrganizerStats>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Record a user known from a verified token if it is not stored yet.
    async fn ensure_user(&self, user: &User) -> LedgerResult<()>;

    async fn find_user(&self, id: Uuid) -> LedgerResult<Option<User>>;

    async fn update_profile(&self, id: Uuid, name: &str, email: &str) -> LedgerResult<User>;
}

#[async_trait]
pub trait ReminderRepository: Send + Sync {
    /// Confirmed, not-yet-reminded bookings of active events starting in `[from, to)`.
    async fn due_reminders(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> LedgerResult<Vec<ReminderTarget>>;

    async fn mark_reminder_sent(&self, booking_id: Uuid) -> LedgerResult<()>;
}
