use chrono::{DateTime, Duration, Utc};
use marquee_core::{Actor, LedgerError, LedgerResult};
use marquee_shared::{Booking, BookingStatus, Event, EventStatus};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Attendees may cancel their own booking only this long before the event.
pub const ATTENDEE_CANCELLATION_WINDOW_HOURS: i64 = 24;

pub const REFUND_NOTE: &str = "Refund will be processed within 5-7 business days";

/// Reject non-positive ticket counts before any storage is touched.
pub fn validate_ticket_count(tickets: i32) -> LedgerResult<()> {
    if tickets <= 0 {
        return Err(LedgerError::InvalidRequest(
            "tickets_booked must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// The event must be active and not yet started to accept bookings.
pub fn check_bookable(event: &Event, now: DateTime<Utc>) -> LedgerResult<()> {
    if event.status != EventStatus::Active {
        return Err(LedgerError::EventNotActive);
    }
    if event.has_started(now) {
        return Err(LedgerError::PastEvent);
    }
    Ok(())
}

/// Enforce `already_booked + requested <= capacity`.
pub fn check_capacity(capacity: i32, already_booked: i64, requested: i32) -> LedgerResult<()> {
    let available = (i64::from(capacity) - already_booked).max(0);
    if i64::from(requested) > available {
        return Err(LedgerError::CapacityExceeded {
            requested,
            available,
        });
    }
    Ok(())
}

pub fn total_price(ticket_price: Decimal, tickets: i32) -> Decimal {
    ticket_price * Decimal::from(tickets)
}

/// Opaque admission code printed on the ticket. Unique per booking id.
pub fn ticket_code(booking_id: Uuid, event_id: Uuid, now: DateTime<Utc>) -> String {
    format!(
        "{}-{}-{}",
        event_id.simple(),
        now.timestamp_millis(),
        booking_id.simple()
    )
}

/// Why an actor is allowed to cancel a booking. The strongest capability wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCapability {
    Attendee,
    Organizer,
    Admin,
}

pub fn cancel_capability(
    actor: &Actor,
    attendee_id: Uuid,
    organizer_id: Uuid,
) -> LedgerResult<CancelCapability> {
    if actor.is_admin() {
        Ok(CancelCapability::Admin)
    } else if actor.is_organizer() && actor.user_id == organizer_id {
        Ok(CancelCapability::Organizer)
    } else if actor.user_id == attendee_id {
        Ok(CancelCapability::Attendee)
    } else {
        Err(LedgerError::Unauthorized(
            "not allowed to cancel this booking".to_string(),
        ))
    }
}

/// Nobody cancels once the event has started; attendees also lose the last 24 hours.
pub fn check_cancel_window(
    capability: CancelCapability,
    event_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> LedgerResult<()> {
    if event_start <= now {
        return Err(LedgerError::PastEvent);
    }
    if capability == CancelCapability::Attendee
        && event_start - now < Duration::hours(ATTENDEE_CANCELLATION_WINDOW_HOURS)
    {
        return Err(LedgerError::TooCloseToEvent);
    }
    Ok(())
}

/// Full cancellation decision for a booking, in check order:
/// authorization, status, time window.
pub fn authorize_cancel(
    actor: &Actor,
    booking: &Booking,
    organizer_id: Uuid,
    event_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> LedgerResult<CancelCapability> {
    let capability = cancel_capability(actor, booking.attendee_id, organizer_id)?;
    if booking.status == BookingStatus::Cancelled {
        return Err(LedgerError::AlreadyCancelled);
    }
    check_cancel_window(capability, event_start, now)?;
    Ok(capability)
}

/// Transition: Confirmed -> Cancelled
pub fn mark_cancelled(booking: &mut Booking) -> LedgerResult<()> {
    if booking.status != BookingStatus::Confirmed {
        return Err(LedgerError::AlreadyCancelled);
    }
    booking.status = BookingStatus::Cancelled;
    Ok(())
}
