use std::sync::Arc;

use marquee_core::{BookingLedger, EventRepository, Mailer, UserRepository};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn BookingLedger>,
    pub events: Arc<dyn EventRepository>,
    pub users: Arc<dyn UserRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub auth: AuthConfig,
}
