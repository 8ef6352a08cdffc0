use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use subtle::ConstantTimeEq;

use pushpop_core::user::BlockAction;

use crate::{
    auth::{
        cookies::{clear_wizard_cookie, wizard_cookie},
        jwt::encode_wizard_jwt,
        session::WizardSession,
    },
    error::AppError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct WizardLoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub user_id: Option<String>,
    pub action: Option<String>,
}

/// Constant-time string comparison for the wizard password.
fn secret_eq(given: &str, expected: &str) -> bool {
    let given = given.as_bytes();
    let expected = expected.as_bytes();
    given.len() == expected.len() && given.ct_eq(expected).unwrap_u8() == 1
}

/// `POST /api/wizard/auth`: exchange the configured super-admin
/// credentials for a 24h `wizard_token` cookie.
#[tracing::instrument(skip(state, req))]
pub async fn wizard_auth(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WizardLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Some(creds) = state.config.wizard.as_ref() else {
        return Err(AppError::NotConfigured(
            "Wizard credentials not configured".to_string(),
        ));
    };
    let email_ok = req.email.as_deref() == Some(creds.email.as_str());
    let password_ok = req
        .password
        .as_deref()
        .is_some_and(|p| secret_eq(p, &creds.password));
    if !(email_ok && password_ok) {
        tracing::warn!("Rejected wizard login");
        return Err(AppError::Unauthorized);
    }

    let token = encode_wizard_jwt(state.session_secret(), &creds.email)?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, wizard_cookie(&token, state.config.https))],
        Json(json!({ "success": true })),
    ))
}

/// `POST /api/wizard/logout`: clear the wizard cookie. Always 200.
pub async fn wizard_logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_wizard_cookie(state.config.https))],
        Json(json!({ "success": true })),
    )
}

/// `GET /api/wizard/stats`: instance totals plus every account with its
/// site/popup/lead counts.
#[tracing::instrument(skip(state, _wizard))]
pub async fn wizard_stats(
    State(state): State<Arc<AppState>>,
    _wizard: WizardSession,
) -> Result<impl IntoResponse, AppError> {
    let global = state.db.global_totals().await?;
    let users = state.db.list_users_with_usage().await?;
    Ok(Json(json!({
        "success": true,
        "global": global,
        "users": users,
    })))
}

/// `PUT /api/wizard/users` `{userId, action: "block" | "unblock"}`.
///
/// Only flips `isBlocked`; the user's sites and popups keep serving.
#[tracing::instrument(skip(state, wizard, req))]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    wizard: WizardSession,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let action = req
        .action
        .as_deref()
        .and_then(|a| serde_json::from_value::<BlockAction>(json!(a)).ok());
    let (Some(user_id), Some(action)) = (req.user_id.filter(|s| !s.is_empty()), action) else {
        return Err(AppError::BadRequest("Invalid request".to_string()));
    };

    let user = state
        .db
        .set_user_blocked(&user_id, action.is_blocked())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    tracing::info!(
        user_id = %user.id,
        blocked = user.is_blocked,
        by = %wizard.email,
        "Wizard updated user"
    );
    Ok(Json(json!({ "success": true, "data": user })))
}
