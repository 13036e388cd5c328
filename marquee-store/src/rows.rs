//! Row shapes returned by queries and their conversion into shared models.
//! Text columns holding enums are parsed here; a value the schema should
//! never allow surfaces as a storage error.

use chrono::{DateTime, Utc};
use marquee_core::repository::{OrganizerStats, ReminderTarget};
use marquee_core::{LedgerError, LedgerResult};
use marquee_shared::{Booking, BookingDetails, Event, EventListing, Masked, User};
use rust_decimal::Decimal;
use uuid::Uuid;

pub(crate) const EVENT_COLUMNS: &str = "id, organizer_id, name, description, venue, date_time, \
     category, capacity, ticket_price, image_url, status, created_at";

pub(crate) const LISTING_SELECT: &str = "SELECT e.id, e.organizer_id, e.name, e.description, e.venue, e.date_time, \
     e.category, e.capacity, e.ticket_price, e.image_url, e.status, e.created_at, \
     u.name AS organizer_name, \
     COALESCE((SELECT SUM(b.tickets_booked) FROM bookings b \
               WHERE b.event_id = e.id AND b.status = 'confirmed'), 0)::BIGINT AS tickets_sold \
     FROM events e LEFT JOIN users u ON u.id = e.organizer_id";

pub(crate) const DETAILS_SELECT: &str = "SELECT b.id, b.event_id, b.attendee_id, b.tickets_booked, b.total_price, \
     b.status, b.ticket_code, b.reminder_sent, b.booking_time, \
     e.name AS event_name, e.venue, e.date_time AS event_date, e.organizer_id, \
     u.name AS attendee_name, u.email AS attendee_email \
     FROM bookings b \
     JOIN events e ON e.id = b.event_id \
     LEFT JOIN users u ON u.id = b.attendee_id";

pub(crate) const USER_COLUMNS: &str = "id, email, name, role, created_at";

pub(crate) fn db_error(err: sqlx::Error) -> LedgerError {
    LedgerError::storage(err)
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[derive(sqlx::FromRow)]
pub(crate) struct EventRow {
    id: Uuid,
    organizer_id: Uuid,
    name: String,
    description: Option<String>,
    venue: String,
    date_time: DateTime<Utc>,
    category: String,
    capacity: i32,
    ticket_price: Decimal,
    image_url: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = LedgerError;

    fn try_from(row: EventRow) -> LedgerResult<Self> {
        Ok(Event {
            id: row.id,
            organizer_id: row.organizer_id,
            name: row.name,
            description: row.description,
            venue: row.venue,
            date_time: row.date_time,
            category: row.category.parse().map_err(LedgerError::storage)?,
            capacity: row.capacity,
            ticket_price: row.ticket_price,
            image_url: row.image_url,
            status: row.status.parse().map_err(LedgerError::storage)?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ListingRow {
    #[sqlx(flatten)]
    event: EventRow,
    organizer_name: Option<String>,
    tickets_sold: i64,
}

impl TryFrom<ListingRow> for EventListing {
    type Error = LedgerError;

    fn try_from(row: ListingRow) -> LedgerResult<Self> {
        Ok(EventListing::new(
            row.event.try_into()?,
            row.organizer_name,
            row.tickets_sold,
        ))
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookingRow {
    id: Uuid,
    event_id: Uuid,
    attendee_id: Uuid,
    tickets_booked: i32,
    total_price: Decimal,
    status: String,
    ticket_code: String,
    reminder_sent: bool,
    booking_time: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = LedgerError;

    fn try_from(row: BookingRow) -> LedgerResult<Self> {
        Ok(Booking {
            id: row.id,
            event_id: row.event_id,
            attendee_id: row.attendee_id,
            tickets_booked: row.tickets_booked,
            total_price: row.total_price,
            status: row.status.parse().map_err(LedgerError::storage)?,
            ticket_code: row.ticket_code,
            reminder_sent: row.reminder_sent,
            booking_time: row.booking_time,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct DetailsRow {
    #[sqlx(flatten)]
    booking: BookingRow,
    event_name: String,
    venue: String,
    event_date: DateTime<Utc>,
    organizer_id: Uuid,
    attendee_name: Option<String>,
    attendee_email: Option<String>,
}

impl TryFrom<DetailsRow> for BookingDetails {
    type Error = LedgerError;

    fn try_from(row: DetailsRow) -> LedgerResult<Self> {
        Ok(BookingDetails {
            booking: row.booking.try_into()?,
            event_name: row.event_name,
            venue: row.venue,
            event_date: row.event_date,
            organizer_id: row.organizer_id,
            attendee_name: row.attendee_name,
            attendee_email: row.attendee_email.map(Masked),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = LedgerError;

    fn try_from(row: UserRow) -> LedgerResult<Self> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role.parse().map_err(LedgerError::storage)?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct StatsRow {
    total_events: i64,
    active_events: i64,
    total_attendees: i64,
    total_revenue: Decimal,
    total_bookings: i64,
}

impl From<StatsRow> for OrganizerStats {
    fn from(row: StatsRow) -> Self {
        OrganizerStats {
            total_events: row.total_events,
            active_events: row.active_events,
            total_attendees: row.total_attendees,
            total_revenue: row.total_revenue,
            total_bookings: row.total_bookings,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ReminderRow {
    booking_id: Uuid,
    attendee_name: String,
    attendee_email: String,
    event_name: String,
    event_date: DateTime<Utc>,
    venue: String,
    tickets_booked: i32,
}

impl From<ReminderRow> for ReminderTarget {
    fn from(row: ReminderRow) -> Self {
        ReminderTarget {
            booking_id: row.booking_id,
            attendee_name: row.attendee_name,
            attendee_email: row.attendee_email,
            event_name: row.event_name,
            event_date: row.event_date,
            venue: row.venue,
            tickets_booked: row.tickets_booked,
        }
    }
}

pub(crate) fn collect<R, T>(rows: Vec<R>) -> LedgerResult<Vec<T>>
where
    T: TryFrom<R, Error = LedgerError>,
{
    rows.into_iter().map(T::try_from).collect()
}
