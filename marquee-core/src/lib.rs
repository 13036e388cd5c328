pub mod identity;
pub mod notify;
pub mod repository;

pub use identity::Actor;
pub use notify::{LogMailer, Mailer, MailerError, Notification};
pub use repository::{BookingLedger, EventRepository, ReminderRepository, UserRepository};

/// Every way a ledger, catalogue or profile operation can fail. Business-rule
/// variants are never retried; `Storage` wraps whatever the backing store raised.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Not enough tickets available: requested {requested}, available {available}")]
    CapacityExceeded { requested: i32, available: i64 },

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Booking is already cancelled")]
    AlreadyCancelled,

    #[error("Event has already started")]
    PastEvent,

    #[error("Cannot cancel booking less than 24 hours before the event")]
    TooCloseToEvent,

    #[error("Event is not available for booking")]
    EventNotActive,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    pub fn storage<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        LedgerError::Storage(err.into())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
