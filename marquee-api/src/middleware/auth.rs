use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use marquee_core::Actor;
use marquee_shared::{Role, User};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

/// Claims of a token issued by the identity provider. The subject is the
/// user id; name and email seed the local user record on first sight.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn new(user_id: Uuid, email: &str, name: &str, role: Role, ttl: Duration) -> Self {
        Self {
            sub: user_id,
            email: email.to_string(),
            name: name.to_string(),
            role,
            exp: (Utc::now() + ttl).timestamp() as usize,
        }
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.sub, self.role)
    }

    /// Organizers and admins may manage events.
    pub fn require_organizer(&self) -> Result<(), AppError> {
        match self.role {
            Role::Organizer | Role::Admin => Ok(()),
            Role::Attendee => Err(AppError::AuthorizationError(
                "Organizer role required".to_string(),
            )),
        }
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

// ============================================================================
// Authentication Middleware
// ============================================================================

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::AuthenticationError("Access token required".to_string()))?;

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected token: {}", e);
        AppError::AuthenticationError("Invalid or expired token".to_string())
    })?;

    let claims = token_data.claims;
    let user = User::new(claims.sub, claims.email.as_str(), claims.name.as_str(), claims.role);
    state.users.ensure_user(&user).await?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
