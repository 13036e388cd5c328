use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use marquee_core::repository::{EventFilter, EventPatch, NewEvent, OrganizerStats};
use marquee_ledger::catalog;
use marquee_shared::{Event, EventListing};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EventList {
    Page {
        events: Vec<EventListing>,
        total: i64,
        page: u32,
        limit: u32,
        total_pages: i64,
    },
    All(Vec<EventListing>),
}

#[derive(Debug, Serialize)]
struct EventCreatedResponse {
    message: &'static str,
    event_id: Uuid,
    event: Event,
}

#[derive(Debug, Serialize)]
struct EventUpdatedResponse {
    message: &'static str,
    event: Event,
}

#[derive(Debug, Serialize)]
struct EventCancelledResponse {
    message: &'static str,
    bookings_cancelled: u64,
}

/// Catalogue reads anyone may make.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events))
        .route("/api/events/{id}", get(get_event))
}

pub fn organizer_routes() -> Router<AppState> {
    Router::new()
        .route("/api/events", post(create_event))
        .route("/api/events/{id}", put(update_event).delete(cancel_event))
        .route("/api/events/organizer/my-events", get(my_events))
        .route("/api/events/organizer/dashboard-stats", get(dashboard_stats))
}

async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Result<Json<EventList>, AppError> {
    let page = state.events.list_events(&filter, Utc::now()).await?;

    let body = match filter.pagination() {
        Some((page_num, limit)) => {
            let limit_i64 = i64::from(limit);
            EventList::Page {
                total_pages: (page.total + limit_i64 - 1) / limit_i64,
                events: page.events,
                total: page.total,
                page: page_num,
                limit,
            }
        }
        None => EventList::All(page.events),
    };

    Ok(Json(body))
}

async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventListing>, AppError> {
    state
        .events
        .get_event(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError("Event not found".to_string()))
}

async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<NewEvent>,
) -> Result<(StatusCode, Json<EventCreatedResponse>), AppError> {
    claims.require_organizer()?;

    let draft = catalog::normalize_new_event(draft);
    catalog::validate_new_event(&draft, Utc::now())?;

    let event = state.events.create_event(claims.sub, &draft).await?;

    Ok((
        StatusCode::CREATED,
        Json(EventCreatedResponse {
            message: "Event created successfully",
            event_id: event.id,
            event,
        }),
    ))
}

async fn load_event(state: &AppState, id: Uuid) -> Result<Event, AppError> {
    state
        .events
        .get_event(id)
        .await?
        .map(|listing| listing.event)
        .ok_or_else(|| AppError::NotFoundError("Event not found".to_string()))
}

async fn update_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(patch): Json<EventPatch>,
) -> Result<Json<EventUpdatedResponse>, AppError> {
    claims.require_organizer()?;

    // Only the owning organizer edits an event.
    let existing = load_event(&state, id).await?;
    if existing.organizer_id != claims.sub {
        return Err(AppError::AuthorizationError(
            "Not authorized to update this event".to_string(),
        ));
    }

    catalog::validate_event_patch(&patch, Utc::now())?;
    let event = state.events.update_event(id, &patch).await?;

    Ok(Json(EventUpdatedResponse {
        message: "Event updated successfully",
        event,
    }))
}

async fn cancel_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventCancelledResponse>, AppError> {
    claims.require_organizer()?;

    let existing = load_event(&state, id).await?;
    if !claims.actor().manages(existing.organizer_id) {
        return Err(AppError::AuthorizationError(
            "Not authorized to delete this event".to_string(),
        ));
    }

    let bookings_cancelled = state.events.cancel_event(id).await?;

    Ok(Json(EventCancelledResponse {
        message: "Event cancelled successfully",
        bookings_cancelled,
    }))
}

async fn my_events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<EventListing>>, AppError> {
    claims.require_organizer()?;
    Ok(Json(state.events.events_by_organizer(claims.sub).await?))
}

async fn dashboard_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<OrganizerStats>, AppError> {
    claims.require_organizer()?;
    Ok(Json(state.events.organizer_stats(claims.sub, Utc::now()).await?))
}
