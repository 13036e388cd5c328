use std::sync::Arc;

use marquee_core::notify::{BookingConfirmation, CancellationConfirmation};
use marquee_core::repository::{Refund, Reservation};
use marquee_core::{Mailer, Notification};
use tracing::{error, warn};

use crate::state::AppState;

/// Fire-and-forget delivery. Failures are logged and never reach the caller.
pub fn send_in_background(mailer: Arc<dyn Mailer>, notification: Notification) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&notification).await {
            error!(subject = %notification.subject(), "Failed to send notification: {}", e);
        }
    });
}

pub fn booking_confirmed(state: &AppState, reservation: &Reservation) {
    let users = state.users.clone();
    let mailer = state.mailer.clone();
    let reservation = reservation.clone();

    tokio::spawn(async move {
        let booking = &reservation.booking;
        let attendee = match users.find_user(booking.attendee_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(booking_id = %booking.id, "No attendee record for confirmation email");
                return;
            }
            Err(e) => {
                error!(booking_id = %booking.id, "Failed to load attendee for confirmation email: {}", e);
                return;
            }
        };

        let notification = Notification::BookingConfirmation(BookingConfirmation {
            attendee_name: attendee.name,
            attendee_email: attendee.email,
            event_name: reservation.event_name.clone(),
            event_date: reservation.event_date,
            venue: reservation.venue.clone(),
            tickets_booked: booking.tickets_booked,
            total_price: booking.total_price,
            booking_id: booking.id,
            ticket_code: booking.ticket_code.clone(),
        });
        if let Err(e) = mailer.send(&notification).await {
            error!(booking_id = %booking.id, "Failed to send booking confirmation: {}", e);
        }
    });
}

pub fn booking_cancelled(state: &AppState, refund: &Refund, reason: Option<String>) {
    let details = &refund.booking;
    let (Some(name), Some(email)) = (&details.attendee_name, &details.attendee_email) else {
        warn!(booking_id = %refund.booking_id, "No attendee contact for cancellation email");
        return;
    };

    let notification = Notification::CancellationConfirmation(CancellationConfirmation {
        attendee_name: name.clone(),
        attendee_email: email.expose().clone(),
        event_name: details.event_name.clone(),
        event_date: details.event_date,
        tickets_booked: details.booking.tickets_booked,
        refund_amount: refund.amount,
        booking_id: refund.booking_id,
        reason: reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "No reason provided".to_string()),
    });
    send_in_background(state.mailer.clone(), notification);
}
