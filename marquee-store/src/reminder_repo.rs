use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_core::repository::ReminderTarget;
use marquee_core::{LedgerError, LedgerResult, ReminderRepository};
use sqlx::PgPool;
use uuid::Uuid;

use crate::rows::{db_error, ReminderRow};

pub struct PgReminderRepository {
    pool: PgPool,
}

impl PgReminderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderRepository for PgReminderRepository {
    async fn due_reminders(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> LedgerResult<Vec<ReminderTarget>> {
        let rows: Vec<ReminderRow> = sqlx::query_as(
            "SELECT b.id AS booking_id, u.name AS attendee_name, u.email AS attendee_email, \
                    e.name AS event_name, e.date_time AS event_date, e.venue, b.tickets_booked \
             FROM bookings b \
             JOIN events e ON e.id = b.event_id \
             JOIN users u ON u.id = b.attendee_id \
             WHERE b.status = 'confirmed' AND b.reminder_sent = FALSE \
               AND e.status = 'active' AND e.date_time >= $1 AND e.date_time < $2 \
             ORDER BY e.date_time",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(ReminderTarget::from).collect())
    }

    async fn mark_reminder_sent(&self, booking_id: Uuid) -> LedgerResult<()> {
        let result = sqlx::query("UPDATE bookings SET reminder_sent = TRUE WHERE id = $1")
            .bind(booking_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound("Booking"));
        }
        Ok(())
    }
}
