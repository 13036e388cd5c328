use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_core::repository::{EventFilter, EventPage, EventPatch, NewEvent, OrganizerStats};
use marquee_core::{EventRepository, LedgerError, LedgerResult};
use marquee_shared::{Event, EventListing, EventStatus};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::rows::{self, db_error, EventRow, ListingRow, StatsRow, EVENT_COLUMNS, LISTING_SELECT};

pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `%term%` for `ILIKE … ESCAPE '\'`, with the term's own wildcards taken literally.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Bookable events (active, not started) narrowed by the caller's filter.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &EventFilter, now: DateTime<Utc>) {
    qb.push(" WHERE e.status = 'active' AND e.date_time > ");
    qb.push_bind(now);

    if let Some(category) = filter.category {
        qb.push(" AND e.category = ");
        qb.push_bind(category.as_str());
    }
    if let Some(venue) = &filter.venue {
        qb.push(" AND e.venue ILIKE ");
        qb.push_bind(contains_pattern(venue));
        qb.push(" ESCAPE '\\'");
    }
    if let Some(search) = &filter.search {
        let pattern = contains_pattern(search);
        qb.push(" AND (e.name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR e.description ILIKE ");
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\')");
    }
    if let Some(date) = filter.date {
        qb.push(" AND (e.date_time AT TIME ZONE 'UTC')::date = ");
        qb.push_bind(date);
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn create_event(&self, organizer_id: Uuid, draft: &NewEvent) -> LedgerResult<Event> {
        let row: EventRow = sqlx::query_as(&format!(
            "INSERT INTO events \
             (id, organizer_id, name, description, venue, date_time, category, capacity, ticket_price, image_url, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(organizer_id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.venue)
        .bind(draft.date_time)
        .bind(draft.category.as_str())
        .bind(draft.capacity)
        .bind(draft.ticket_price)
        .bind(&draft.image_url)
        .bind(EventStatus::Active.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        let event = Event::try_from(row)?;
        info!(event_id = %event.id, organizer_id = %organizer_id, "Event created");
        Ok(event)
    }

    async fn get_event(&self, id: Uuid) -> LedgerResult<Option<EventListing>> {
        let row: Option<ListingRow> = sqlx::query_as(&format!("{} WHERE e.id = $1", LISTING_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(EventListing::try_from).transpose()
    }

    async fn list_events(&self, filter: &EventFilter, now: DateTime<Utc>) -> LedgerResult<EventPage> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM events e");
        push_filters(&mut count, filter, now);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let mut select = QueryBuilder::new(LISTING_SELECT);
        push_filters(&mut select, filter, now);
        select.push(" ORDER BY e.date_time ASC");
        if let Some((page, limit)) = filter.pagination() {
            select.push(" LIMIT ");
            select.push_bind(i64::from(limit));
            select.push(" OFFSET ");
            select.push_bind(i64::from(page - 1) * i64::from(limit));
        }

        let rows: Vec<ListingRow> = select
            .build_query_as::<ListingRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(EventPage {
            events: rows::collect(rows)?,
            total,
        })
    }

    async fn events_by_organizer(&self, organizer_id: Uuid) -> LedgerResult<Vec<EventListing>> {
        let rows: Vec<ListingRow> = sqlx::query_as(&format!(
            "{} WHERE e.organizer_id = $1 ORDER BY e.date_time DESC",
            LISTING_SELECT
        ))
        .bind(organizer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows::collect(rows)
    }

    async fn update_event(&self, id: Uuid, patch: &EventPatch) -> LedgerResult<Event> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row: Option<EventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM events WHERE id = $1 FOR UPDATE",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;
        let mut event: Event = row.ok_or(LedgerError::NotFound("Event"))?.try_into()?;

        patch.apply(&mut event);

        let row: EventRow = sqlx::query_as(&format!(
            "UPDATE events SET name = $2, description = $3, venue = $4, date_time = $5, \
             category = $6, ticket_price = $7, image_url = $8 \
             WHERE id = $1 RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.venue)
        .bind(event.date_time)
        .bind(event.category.as_str())
        .bind(event.ticket_price)
        .bind(&event.image_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        info!(event_id = %id, "Event updated");
        row.try_into()
    }

    async fn cancel_event(&self, id: Uuid) -> LedgerResult<u64> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let updated = sqlx::query("UPDATE events SET status = 'cancelled' WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        if updated.rows_affected() == 0 {
            return Err(LedgerError::NotFound("Event"));
        }

        let cancelled = sqlx::query(
            "UPDATE bookings SET status = 'cancelled' WHERE event_id = $1 AND status = 'confirmed'",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?
        .rows_affected();

        tx.commit().await.map_err(db_error)?;

        info!(event_id = %id, bookings = cancelled, "Event cancelled");
        Ok(cancelled)
    }

    async fn organizer_stats(&self, organizer_id: Uuid, now: DateTime<Utc>) -> LedgerResult<OrganizerStats> {
        let row: StatsRow = sqlx::query_as(
            "SELECT \
                COUNT(DISTINCT e.id) AS total_events, \
                COUNT(DISTINCT e.id) FILTER (WHERE e.status = 'active' AND e.date_time > $2) AS active_events, \
                COALESCE(SUM(b.tickets_booked), 0)::BIGINT AS total_attendees, \
                COALESCE(SUM(b.total_price), 0) AS total_revenue, \
                COUNT(b.id) AS total_bookings \
             FROM events e \
             LEFT JOIN bookings b ON b.event_id = e.id AND b.status = 'confirmed' \
             WHERE e.organizer_id = $1",
        )
        .bind(organizer_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("jazz"), "%jazz%");
        assert_eq!(contains_pattern("50%"), r"%50\%%");
        assert_eq!(contains_pattern("a_b"), r"%a\_b%");
        assert_eq!(contains_pattern(r"c:\x"), r"%c:\\x%");
    }
}
