pub mod models;
pub mod pii;

pub use models::{
    Booking, BookingDetails, BookingStatus, Event, EventCategory, EventListing, EventStatus, ParseStatusError, Role,
    User,
};
pub use pii::Masked;
