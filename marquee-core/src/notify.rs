use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_shared::Masked;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmation {
    pub attendee_name: String,
    pub attendee_email: String,
    pub event_name: String,
    pub event_date: DateTime<Utc>,
    pub venue: String,
    pub tickets_booked: i32,
    pub total_price: Decimal,
    pub booking_id: Uuid,
    pub ticket_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationConfirmation {
    pub attendee_name: String,
    pub attendee_email: String,
    pub event_name: String,
    pub event_date: DateTime<Utc>,
    pub tickets_booked: i32,
    pub refund_amount: Decimal,
    pub booking_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventReminder {
    pub attendee_name: String,
    pub attendee_email: String,
    pub event_name: String,
    pub event_date: DateTime<Utc>,
    pub venue: String,
    pub tickets_booked: i32,
}

/// Outbound messages to attendees.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    BookingConfirmation(BookingConfirmation),
    CancellationConfirmation(CancellationConfirmation),
    EventReminder(EventReminder),
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::BookingConfirmation(m) => &m.attendee_email,
            Notification::CancellationConfirmation(m) => &m.attendee_email,
            Notification::EventReminder(m) => &m.attendee_email,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notification::BookingConfirmation(m) => format!("Booking Confirmed: {}", m.event_name),
            Notification::CancellationConfirmation(m) => format!("Booking Cancelled: {}", m.event_name),
            Notification::EventReminder(m) => format!("Reminder: {} is tomorrow", m.event_name),
        }
    }

    /// Plain-text body.
    pub fn body(&self) -> String {
        match self {
            Notification::BookingConfirmation(m) => format!(
                "Dear {},\n\nYour booking has been confirmed!\n\nEvent: {}\nDate: {} at {}\nVenue: {}\nTickets: {}\nTotal: ${}\nBooking ID: {}\nTicket code: {}\n",
                m.attendee_name,
                m.event_name,
                m.event_date.format("%A, %B %-d, %Y"),
                m.event_date.format("%H:%M UTC"),
                m.venue,
                m.tickets_booked,
                m.total_price,
                m.booking_id,
                m.ticket_code,
            ),
            Notification::CancellationConfirmation(m) => format!(
                "Dear {},\n\nYour booking {} for {} on {} has been cancelled.\n\nTickets: {}\nRefund amount: ${}\nReason: {}\n\nRefund will be processed within 5-7 business days.\n",
                m.attendee_name,
                m.booking_id,
                m.event_name,
                m.event_date.format("%A, %B %-d, %Y"),
                m.tickets_booked,
                m.refund_amount,
                m.reason,
            ),
            Notification::EventReminder(m) => format!(
                "Dear {},\n\nThis is a reminder that {} takes place tomorrow.\n\nDate: {} at {}\nVenue: {}\nTickets: {}\n",
                m.attendee_name,
                m.event_name,
                m.event_date.format("%A, %B %-d, %Y"),
                m.event_date.format("%H:%M UTC"),
                m.venue,
                m.tickets_booked,
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("Mail transport failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), MailerError>;
}

/// Mailer that writes messages to the log instead of delivering them.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from_address: String,
}

impl LogMailer {
    pub fn new(from_address: impl Into<String>) -> Self {
        Self {
            from_address: from_address.into(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, notification: &Notification) -> Result<(), MailerError> {
        info!(
            from = %self.from_address,
            to = %Masked(notification.recipient()),
            subject = %notification.subject(),
            "Email queued"
        );
        debug!(body = %notification.body(), "Email body");
        Ok(())
    }
}
