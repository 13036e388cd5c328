use axum::{
    extract::{Extension, Json, State},
    routing::get,
    Router,
};
use marquee_ledger::catalog;
use marquee_shared::User;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
struct ProfileUpdatedResponse {
    message: &'static str,
    user: User,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/users/profile", get(get_profile).put(update_profile))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, AppError> {
    state
        .users
        .find_user(claims.sub)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileUpdatedResponse>, AppError> {
    let name = req.name.trim();
    let email = req.email.trim().to_lowercase();
    catalog::validate_profile(name, &email)?;

    let user = state.users.update_profile(claims.sub, name, &email).await?;

    Ok(Json(ProfileUpdatedResponse {
        message: "Profile updated successfully",
        user,
    }))
}
