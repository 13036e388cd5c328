use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use marquee_core::repository::{EventPatch, NewEvent};
use marquee_core::{LedgerError, LedgerResult};
use regex::Regex;
use rust_decimal::Decimal;

pub const MAX_CAPACITY: i32 = 10_000;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid email pattern"));

fn max_ticket_price() -> Decimal {
    Decimal::from(100_000)
}

fn check_len(errors: &mut Vec<String>, field: &str, value: &str, min: usize, max: usize) {
    let len = value.trim().chars().count();
    if len < min || len > max {
        errors.push(format!("{} must be between {} and {} characters", field, min, max));
    }
}

fn check_price(errors: &mut Vec<String>, price: Decimal) {
    if price.is_sign_negative() || price > max_ticket_price() {
        errors.push("ticket_price must be between 0 and 100000".to_string());
    }
    if price.normalize().scale() > 2 {
        errors.push("ticket_price must not have more than 2 decimal places".to_string());
    }
}

fn check_future(errors: &mut Vec<String>, date_time: DateTime<Utc>, now: DateTime<Utc>) {
    if date_time <= now {
        errors.push("Event date and time must be in the future".to_string());
    }
}

fn into_result(errors: Vec<String>) -> LedgerResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(LedgerError::InvalidRequest(errors.join("; ")))
    }
}

pub fn validate_new_event(event: &NewEvent, now: DateTime<Utc>) -> LedgerResult<()> {
    let mut errors = Vec::new();

    check_len(&mut errors, "name", &event.name, 3, 100);
    check_len(&mut errors, "venue", &event.venue, 3, 200);
    if let Some(description) = &event.description {
        check_len(&mut errors, "description", description, 0, 1000);
    }
    if event.capacity < 1 || event.capacity > MAX_CAPACITY {
        errors.push(format!("capacity must be between 1 and {}", MAX_CAPACITY));
    }
    check_price(&mut errors, event.ticket_price);
    check_future(&mut errors, event.date_time, now);

    into_result(errors)
}

pub fn validate_event_patch(patch: &EventPatch, now: DateTime<Utc>) -> LedgerResult<()> {
    if patch.is_empty() {
        return Err(LedgerError::InvalidRequest("no fields to update".to_string()));
    }

    let mut errors = Vec::new();

    if let Some(name) = &patch.name {
        check_len(&mut errors, "name", name, 3, 100);
    }
    if let Some(venue) = &patch.venue {
        check_len(&mut errors, "venue", venue, 3, 200);
    }
    if let Some(description) = &patch.description {
        check_len(&mut errors, "description", description, 0, 1000);
    }
    if let Some(price) = patch.ticket_price {
        check_price(&mut errors, price);
    }
    if let Some(date_time) = patch.date_time {
        check_future(&mut errors, date_time, now);
    }

    into_result(errors)
}

/// Trim text fields the way they are stored.
pub fn normalize_new_event(mut event: NewEvent) -> NewEvent {
    event.name = event.name.trim().to_string();
    event.venue = event.venue.trim().to_string();
    event.description = event
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    event.image_url = event.image_url.filter(|u| !u.trim().is_empty());
    event
}

pub fn validate_profile(name: &str, email: &str) -> LedgerResult<()> {
    if name.trim().chars().count() < 2 {
        return Err(LedgerError::InvalidRequest(
            "Name must be at least 2 characters".to_string(),
        ));
    }
    if !EMAIL.is_match(email) {
        return Err(LedgerError::InvalidRequest("Valid email is required".to_string()));
    }
    Ok(())
}
