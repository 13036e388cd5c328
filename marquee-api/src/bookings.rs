use axum::{
    body::Bytes,
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use marquee_core::repository::ReserveRequest;
use marquee_shared::BookingDetails;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Claims;
use crate::notify;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub event_id: Uuid,
    pub tickets_booked: i32,
}

#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct BookingSummary {
    id: Uuid,
    event_id: Uuid,
    tickets_booked: i32,
    total_price: Decimal,
    ticket_code: String,
    event_name: String,
    event_date: DateTime<Utc>,
    venue: String,
}

#[derive(Debug, Serialize)]
struct BookingCreatedResponse {
    message: &'static str,
    booking: BookingSummary,
}

#[derive(Debug, Serialize)]
struct BookingCancelledResponse {
    message: &'static str,
    refund_amount: Decimal,
    refund_note: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/my-bookings", get(my_bookings))
        .route("/api/bookings/{id}", get(get_booking).delete(cancel_booking))
        .route("/api/bookings/event/{id}/attendees", get(event_attendees))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingCreatedResponse>), AppError> {
    let reservation = state
        .ledger
        .reserve(
            ReserveRequest {
                event_id: req.event_id,
                attendee_id: claims.sub,
                tickets: req.tickets_booked,
            },
            Utc::now(),
        )
        .await?;

    notify::booking_confirmed(&state, &reservation);

    let booking = reservation.booking;
    Ok((
        StatusCode::CREATED,
        Json(BookingCreatedResponse {
            message: "Booking confirmed successfully",
            booking: BookingSummary {
                id: booking.id,
                event_id: booking.event_id,
                tickets_booked: booking.tickets_booked,
                total_price: booking.total_price,
                ticket_code: booking.ticket_code,
                event_name: reservation.event_name,
                event_date: reservation.event_date,
                venue: reservation.venue,
            },
        }),
    ))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    Ok(Json(state.ledger.bookings_for_attendee(claims.sub).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingDetails>, AppError> {
    let details = state
        .ledger
        .get_booking(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Booking not found".to_string()))?;

    let actor = claims.actor();
    if details.booking.attendee_id != actor.user_id && !actor.manages(details.organizer_id) {
        return Err(AppError::AuthorizationError(
            "Not authorized to view this booking".to_string(),
        ));
    }

    Ok(Json(details))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<BookingCancelledResponse>, AppError> {
    // The body is optional; an empty one means no reason was given.
    let reason = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<CancelBookingRequest>(&body)
            .map_err(|e| AppError::ValidationError(format!("Invalid request body: {}", e)))?
            .reason
    };

    let refund = state.ledger.cancel(id, &claims.actor(), Utc::now()).await?;
    info!(booking_id = %id, refund = %refund.amount, "Refund issued");

    notify::booking_cancelled(&state, &refund, reason);

    Ok(Json(BookingCancelledResponse {
        message: "Booking cancelled successfully",
        refund_amount: refund.amount,
        refund_note: refund.note,
    }))
}

async fn event_attendees(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    let listing = state
        .events
        .get_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Event not found".to_string()))?;

    if !claims.actor().manages(listing.event.organizer_id) {
        return Err(AppError::AuthorizationError(
            "Not authorized to view attendees".to_string(),
        ));
    }

    Ok(Json(state.ledger.event_attendees(event_id).await?))
}
