use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::ParseStatusError;
use crate::pii::Masked;

/// Booking status. `Confirmed -> Cancelled` is the only transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(ParseStatusError {
                kind: "booking status",
                value: other.to_string(),
            }),
        }
    }
}

/// A confirmed (or later cancelled) purchase of tickets for one event.
/// Ticket count and price are never edited after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub event_id: Uuid,
    pub attendee_id: Uuid,
    pub tickets_booked: i32,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub ticket_code: String,
    pub reminder_sent: bool,
    pub booking_time: DateTime<Utc>,
}

impl Booking {
    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

/// Booking joined with the event and attendee it refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub event_name: String,
    pub venue: String,
    pub event_date: DateTime<Utc>,
    pub organizer_id: Uuid,
    pub attendee_name: Option<String>,
    pub attendee_email: Option<Masked<String>>,
}
