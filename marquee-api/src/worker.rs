use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use marquee_core::notify::EventReminder;
use marquee_core::{LedgerResult, Mailer, Notification, ReminderRepository};
use tracing::{error, info};

/// `[start of tomorrow, start of the day after)` in UTC.
pub fn tomorrow_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = (now.date_naive() + Duration::days(1))
        .and_time(NaiveTime::MIN)
        .and_utc();
    (start, start + Duration::days(1))
}

/// One sweep: remind every attendee of an event starting tomorrow.
/// Returns how many reminders went out.
pub async fn send_due_reminders(
    reminders: &dyn ReminderRepository,
    mailer: &dyn Mailer,
    now: DateTime<Utc>,
) -> LedgerResult<usize> {
    let (from, to) = tomorrow_window(now);
    let due = reminders.due_reminders(from, to).await?;

    let mut sent = 0;
    for target in due {
        let booking_id = target.booking_id;
        let notification = Notification::EventReminder(EventReminder {
            attendee_name: target.attendee_name,
            attendee_email: target.attendee_email,
            event_name: target.event_name,
            event_date: target.event_date,
            venue: target.venue,
            tickets_booked: target.tickets_booked,
        });

        if let Err(e) = mailer.send(&notification).await {
            error!(booking_id = %booking_id, "Failed to send reminder: {}", e);
            continue;
        }
        if let Err(e) = reminders.mark_reminder_sent(booking_id).await {
            error!(booking_id = %booking_id, "Failed to record reminder: {}", e);
            continue;
        }
        sent += 1;
    }

    Ok(sent)
}

pub async fn start_reminder_worker(
    reminders: Arc<dyn ReminderRepository>,
    mailer: Arc<dyn Mailer>,
    every: std::time::Duration,
) {
    info!("Reminder worker started, sweeping every {}s", every.as_secs());

    // The first tick completes immediately, so a sweep runs at startup.
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        match send_due_reminders(reminders.as_ref(), mailer.as_ref(), Utc::now()).await {
            Ok(0) => {}
            Ok(sent) => info!("Sent {} event reminders", sent),
            Err(e) => error!("Reminder sweep failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use marquee_core::repository::{NewEvent, ReserveRequest};
    use marquee_core::{BookingLedger, EventRepository, MailerError, UserRepository};
    use marquee_ledger::MemoryStore;
    use marquee_shared::{EventCategory, Role, User};
    use rust_decimal::Decimal;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, notification: &Notification) -> Result<(), MailerError> {
            if self.fail {
                return Err(MailerError::Transport("smtp down".to_string()));
            }
            self.sent.lock().await.push(notification.subject());
            Ok(())
        }
    }

    #[test]
    fn test_tomorrow_window_is_next_utc_day() {
        let now = Utc.with_ymd_and_hms(2030, 3, 10, 23, 59, 0).unwrap();
        let (from, to) = tomorrow_window(now);
        assert_eq!(from, Utc.with_ymd_and_hms(2030, 3, 11, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2030, 3, 12, 0, 0, 0).unwrap());
    }

    async fn booked_for_tomorrow(store: &MemoryStore, now: DateTime<Utc>) {
        let organizer = User::new(Uuid::new_v4(), "org@example.com", "Org", Role::Organizer);
        let attendee = User::new(Uuid::new_v4(), "fan@example.com", "Fan", Role::Attendee);
        store.ensure_user(&organizer).await.unwrap();
        store.ensure_user(&attendee).await.unwrap();

        let (from, _) = tomorrow_window(now);
        let event = store
            .create_event(
                organizer.id,
                &NewEvent {
                    name: "Morning Run".to_string(),
                    description: None,
                    venue: "Riverside".to_string(),
                    date_time: from + Duration::hours(12),
                    category: EventCategory::Sports,
                    capacity: 50,
                    ticket_price: Decimal::ZERO,
                    image_url: None,
                },
            )
            .await
            .unwrap();
        store
            .reserve(
                ReserveRequest {
                    event_id: event.id,
                    attendee_id: attendee.id,
                    tickets: 1,
                },
                now,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweep_sends_once() {
        let store = MemoryStore::new();
        let now = Utc::now();
        booked_for_tomorrow(&store, now).await;
        let mailer = RecordingMailer::default();

        assert_eq!(send_due_reminders(&store, &mailer, now).await.unwrap(), 1);
        assert_eq!(send_due_reminders(&store, &mailer, now).await.unwrap(), 0);
        assert_eq!(
            *mailer.sent.lock().await,
            vec!["Reminder: Morning Run is tomorrow".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_send_is_retried_next_sweep() {
        let store = MemoryStore::new();
        let now = Utc::now();
        booked_for_tomorrow(&store, now).await;

        let broken = RecordingMailer {
            fail: true,
            ..Default::default()
        };
        assert_eq!(send_due_reminders(&store, &broken, now).await.unwrap(), 0);

        let working = RecordingMailer::default();
        assert_eq!(send_due_reminders(&store, &working, now).await.unwrap(), 1);
    }
}
