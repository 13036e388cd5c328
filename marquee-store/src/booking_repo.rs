use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_core::repository::{Refund, Reservation, ReserveRequest};
use marquee_core::{Actor, BookingLedger, LedgerError, LedgerResult};
use marquee_ledger::policy;
use marquee_shared::{Booking, BookingDetails, BookingStatus, Event};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::rows::{self, db_error, DetailsRow, EventRow, DETAILS_SELECT, EVENT_COLUMNS};

/// Postgres ledger. Every reservation and cancellation runs in one
/// transaction holding the event (or booking) row lock, so concurrent
/// writers for the same event are serialized by the database.
pub struct PgBookingLedger {
    pool: PgPool,
}

impl PgBookingLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingLedger for PgBookingLedger {
    async fn reserve(&self, request: ReserveRequest, now: DateTime<Utc>) -> LedgerResult<Reservation> {
        policy::validate_ticket_count(request.tickets)?;

        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row: Option<EventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM events WHERE id = $1 FOR UPDATE",
            EVENT_COLUMNS
        ))
        .bind(request.event_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;
        let event: Event = row.ok_or(LedgerError::NotFound("Event"))?.try_into()?;

        policy::check_bookable(&event, now)?;

        let already_booked: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(tickets_booked), 0)::BIGINT FROM bookings \
             WHERE event_id = $1 AND status = 'confirmed'",
        )
        .bind(event.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        if let Err(e) = policy::check_capacity(event.capacity, already_booked, request.tickets) {
            warn!(event_id = %event.id, requested = request.tickets, already_booked, "Reservation rejected: sold out");
            return Err(e);
        }

        let booking_id = Uuid::new_v4();
        let booking = Booking {
            id: booking_id,
            event_id: event.id,
            attendee_id: request.attendee_id,
            tickets_booked: request.tickets,
            total_price: policy::total_price(event.ticket_price, request.tickets),
            status: BookingStatus::Confirmed,
            ticket_code: policy::ticket_code(booking_id, event.id, now),
            reminder_sent: false,
            booking_time: now,
        };

        sqlx::query(
            "INSERT INTO bookings \
             (id, event_id, attendee_id, tickets_booked, total_price, status, ticket_code, reminder_sent, booking_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(booking.id)
        .bind(booking.event_id)
        .bind(booking.attendee_id)
        .bind(booking.tickets_booked)
        .bind(booking.total_price)
        .bind(booking.status.as_str())
        .bind(&booking.ticket_code)
        .bind(booking.reminder_sent)
        .bind(booking.booking_time)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if rows::is_foreign_key_violation(&e) {
                LedgerError::NotFound("User")
            } else {
                db_error(e)
            }
        })?;

        tx.commit().await.map_err(db_error)?;

        info!(booking_id = %booking.id, event_id = %event.id, tickets = booking.tickets_booked, "Booking confirmed");

        Ok(Reservation {
            booking,
            event_name: event.name,
            event_date: event.date_time,
            venue: event.venue,
        })
    }

    async fn cancel(&self, booking_id: Uuid, actor: &Actor, now: DateTime<Utc>) -> LedgerResult<Refund> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row: Option<DetailsRow> = sqlx::query_as(&format!(
            "{} WHERE b.id = $1 FOR UPDATE OF b",
            DETAILS_SELECT
        ))
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;
        let details: BookingDetails = row.ok_or(LedgerError::NotFound("Booking"))?.try_into()?;

        policy::authorize_cancel(
            actor,
            &details.booking,
            details.organizer_id,
            details.event_date,
            now,
        )?;

        let result = sqlx::query(
            "UPDATE bookings SET status = 'cancelled' WHERE id = $1 AND status = 'confirmed'",
        )
        .bind(booking_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::AlreadyCancelled);
        }

        tx.commit().await.map_err(db_error)?;

        info!(booking_id = %booking_id, actor = %actor.user_id, "Booking cancelled");

        Ok(Refund {
            booking_id,
            amount: details.booking.total_price,
            note: policy::REFUND_NOTE.to_string(),
            booking: details,
        })
    }

    async fn get_booking(&self, booking_id: Uuid) -> LedgerResult<Option<BookingDetails>> {
        let row: Option<DetailsRow> = sqlx::query_as(&format!("{} WHERE b.id = $1", DETAILS_SELECT))
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(BookingDetails::try_from).transpose()
    }

    async fn bookings_for_attendee(&self, attendee_id: Uuid) -> LedgerResult<Vec<BookingDetails>> {
        let rows: Vec<DetailsRow> = sqlx::query_as(&format!(
            "{} WHERE b.attendee_id = $1 ORDER BY b.booking_time DESC",
            DETAILS_SELECT
        ))
        .bind(attendee_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows::collect(rows)
    }

    async fn event_attendees(&self, event_id: Uuid) -> LedgerResult<Vec<BookingDetails>> {
        let rows: Vec<DetailsRow> = sqlx::query_as(&format!(
            "{} WHERE b.event_id = $1 AND b.status = 'confirmed' ORDER BY b.booking_time DESC",
            DETAILS_SELECT
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows::collect(rows)
    }
}
