pub mod booking;
pub mod event;
pub mod user;

pub use booking::{Booking, BookingDetails, BookingStatus};
pub use event::{Event, EventCategory, EventListing, EventStatus};
pub use user::{Role, User};

/// Raised when a status/role column holds a value outside its enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}
