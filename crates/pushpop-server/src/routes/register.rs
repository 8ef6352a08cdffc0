use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use pushpop_core::user::{NewUser, RegisterRequest};

use crate::{
    auth::password::{hash_password, validate_password_strength},
    error::AppError,
    state::AppState,
};

/// `POST /api/register`: open sign-up. Does not log the user in.
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_user = NewUser::from_request(req)?;
    validate_password_strength(&new_user.password)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let hash = hash_password(&new_user.password, state.config.argon2_memory_kb)
        .map_err(AppError::Internal)?;
    let user = state
        .db
        .create_user(&new_user.name, &new_user.email, &hash)
        .await?
        .ok_or_else(|| AppError::Conflict("User already exists".to_string()))?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": user })),
    ))
}
