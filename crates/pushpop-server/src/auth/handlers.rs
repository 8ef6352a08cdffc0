use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use pushpop_core::lead::normalize_email;

use crate::{error::AppError, state::AppState};

use super::cookies::{clear_session_cookie, session_cookie};
use super::jwt::encode_session_jwt;
use super::password::verify_password;
use super::session::SessionUser;

// ---------------------------------------------------------------------------
// POST /api/auth/login
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// `POST /api/auth/login`: email/password login.
///
/// Unknown email and wrong password are both 401. A blocked account is 403.
#[tracing::instrument(skip(state, req))]
pub async fn auth_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(AppError::BadRequest(
            "Please provide email and password".to_string(),
        ));
    };
    let email = normalize_email(&email);

    let creds = state
        .db
        .find_user_credentials(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;
    if !verify_password(&password, &creds.password_hash) {
        return Err(AppError::Unauthorized);
    }
    if creds.user.is_blocked {
        tracing::info!(user_id = %creds.user.id, "Blocked user refused at login");
        return Err(AppError::Forbidden("Account is blocked".to_string()));
    }

    let token = encode_session_jwt(
        state.session_secret(),
        &creds.user.id,
        state.config.session_days,
    )?;
    let cookie = session_cookie(&token, state.config.https, state.config.session_days);
    tracing::info!(user_id = %creds.user.id, "User logged in");
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true, "data": creds.user })),
    ))
}

// ---------------------------------------------------------------------------
// POST /api/auth/logout
// ---------------------------------------------------------------------------

/// `POST /api/auth/logout`: Clear session cookie. Always 200.
pub async fn auth_logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cookie = clear_session_cookie(state.config.https);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true })),
    )
}

// ---------------------------------------------------------------------------
// GET /api/auth/session
// ---------------------------------------------------------------------------

/// `GET /api/auth/session`: the signed-in user, or 401.
pub async fn auth_session(user: SessionUser) -> impl IntoResponse {
    Json(json!({ "success": true, "data": user.0 }))
}
