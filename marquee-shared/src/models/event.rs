use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::ParseStatusError;

/// Event status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Cancelled,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Active => "active",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Completed => "completed",
        }
    }
}

impl FromStr for EventStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EventStatus::Active),
            "cancelled" => Ok(EventStatus::Cancelled),
            "completed" => Ok(EventStatus::Completed),
            other => Err(ParseStatusError {
                kind: "event status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventCategory {
    Music,
    Workshop,
    Conference,
    Sports,
    Technology,
    Business,
    #[serde(rename = "Arts & Culture")]
    ArtsAndCulture,
    #[serde(rename = "Food & Drink")]
    FoodAndDrink,
    #[serde(rename = "Health & Wellness")]
    HealthAndWellness,
    Education,
    Entertainment,
    Networking,
    Charity,
    Fashion,
    Travel,
    Other,
}

impl EventCategory {
    pub const ALL: [EventCategory; 16] = [
        EventCategory::Music,
        EventCategory::Workshop,
        EventCategory::Conference,
        EventCategory::Sports,
        EventCategory::Technology,
        EventCategory::Business,
        EventCategory::ArtsAndCulture,
        EventCategory::FoodAndDrink,
        EventCategory::HealthAndWellness,
        EventCategory::Education,
        EventCategory::Entertainment,
        EventCategory::Networking,
        EventCategory::Charity,
        EventCategory::Fashion,
        EventCategory::Travel,
        EventCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Music => "Music",
            EventCategory::Workshop => "Workshop",
            EventCategory::Conference => "Conference",
            EventCategory::Sports => "Sports",
            EventCategory::Technology => "Technology",
            EventCategory::Business => "Business",
            EventCategory::ArtsAndCulture => "Arts & Culture",
            EventCategory::FoodAndDrink => "Food & Drink",
            EventCategory::HealthAndWellness => "Health & Wellness",
            EventCategory::Education => "Education",
            EventCategory::Entertainment => "Entertainment",
            EventCategory::Networking => "Networking",
            EventCategory::Charity => "Charity",
            EventCategory::Fashion => "Fashion",
            EventCategory::Travel => "Travel",
            EventCategory::Other => "Other",
        }
    }
}

impl FromStr for EventCategory {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseStatusError {
                kind: "event category",
                value: s.to_string(),
            })
    }
}

/// A ticketed event. `capacity` is fixed at creation; availability is always
/// derived from confirmed bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub venue: String,
    pub date_time: DateTime<Utc>,
    pub category: EventCategory,
    pub capacity: i32,
    pub ticket_price: Decimal,
    pub image_url: Option<String>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.date_time <= now
    }
}

/// Event plus the figures derived from its confirmed bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventListing {
    #[serde(flatten)]
    pub event: Event,
    pub organizer_name: Option<String>,
    pub tickets_sold: i64,
    pub available_tickets: i64,
}

impl EventListing {
    pub fn new(event: Event, organizer_name: Option<String>, tickets_sold: i64) -> Self {
        let available_tickets = i64::from(event.capacity) - tickets_sold;
        Self {
            event,
            organizer_name,
            tickets_sold,
            available_tickets,
        }
    }
}
