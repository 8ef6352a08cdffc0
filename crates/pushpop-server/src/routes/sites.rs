use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use pushpop_core::site::{CreateSiteRequest, Site};
use pushpop_duckdb::sites::VerificationFlag;

use crate::{
    auth::session::SessionUser,
    error::AppError,
    state::AppState,
    verify::{self, VerifyOutcome},
};

fn site_not_found() -> AppError {
    AppError::NotFound("Site not found".to_string())
}

/// The `<script>` tag customers paste into their pages.
pub fn embed_snippet(public_url: &str, site_id: &str) -> String {
    format!(
        r#"<script src="{}/popup.js" data-site-id="{}"></script>"#,
        public_url.trim_end_matches('/'),
        site_id
    )
}

fn site_json(site: &Site, public_url: &str) -> Value {
    let mut value = json!(site);
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "embedSnippet".to_string(),
            Value::String(embed_snippet(public_url, &site.id)),
        );
    }
    value
}

/// `GET /api/sites`: the caller's sites, newest first.
#[tracing::instrument(skip(state, user))]
pub async fn list_sites(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
) -> Result<impl IntoResponse, AppError> {
    let sites = state.db.list_sites(user.id()).await?;
    let data: Vec<Value> = sites
        .iter()
        .map(|s| site_json(s, &state.config.public_url))
        .collect();
    Ok(Json(json!({ "success": true, "data": data })))
}

/// `POST /api/sites`: register a site and return its embed snippet.
#[tracing::instrument(skip(state, user, req))]
pub async fn create_site(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Json(req): Json<CreateSiteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (name, domain) = req.validate()?;
    let site = state.db.create_site(user.id(), &name, &domain).await?;
    tracing::info!(site_id = %site.id, domain = %site.domain, "Site created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": site_json(&site, &state.config.public_url),
        })),
    ))
}

/// `GET /api/sites/{id}`
#[tracing::instrument(skip(state, user))]
pub async fn get_site(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let site = state
        .db
        .get_site(user.id(), &site_id)
        .await?
        .ok_or_else(site_not_found)?;
    Ok(Json(json!({
        "success": true,
        "data": site_json(&site, &state.config.public_url),
    })))
}

/// `DELETE /api/sites/{id}`: removes the site with its popups, leads,
/// events, subscribers and campaigns.
#[tracing::instrument(skip(state, user))]
pub async fn delete_site(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_site(user.id(), &site_id).await? {
        return Err(site_not_found());
    }
    tracing::info!(site_id = %site_id, "Site deleted");
    Ok(Json(json!({ "success": true, "data": {} })))
}

async fn finish_verification(
    state: &AppState,
    user_id: &str,
    site_id: &str,
    flag: VerificationFlag,
    outcome: VerifyOutcome,
    message: &str,
) -> Result<Json<Value>, AppError> {
    match outcome {
        VerifyOutcome::Verified => {
            if !state.db.mark_site_verified(user_id, site_id, flag).await? {
                return Err(site_not_found());
            }
            tracing::info!(site_id, ?flag, "Site verified");
            Ok(Json(json!({ "success": true, "message": message })))
        }
        VerifyOutcome::Failed(error) => {
            tracing::info!(site_id, ?flag, error = %error, "Site verification failed");
            Ok(Json(json!({ "success": false, "error": error })))
        }
    }
}

/// `POST /api/sites/{id}/verify-popup`: look for the embed snippet on the
/// site's home page. A failed check is still a 200 with `success: false`.
#[tracing::instrument(skip(state, user))]
pub async fn verify_popup(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let site = state
        .db
        .get_site(user.id(), &site_id)
        .await?
        .ok_or_else(site_not_found)?;
    let outcome = verify::verify_popup_install(&state.http, &site.domain, &site.id).await;
    finish_verification(
        &state,
        user.id(),
        &site.id,
        VerificationFlag::Popup,
        outcome,
        "Popup setup verified successfully!",
    )
    .await
}

/// `POST /api/sites/{id}/verify-push`: look for the push service worker.
#[tracing::instrument(skip(state, user))]
pub async fn verify_push(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let site = state
        .db
        .get_site(user.id(), &site_id)
        .await?
        .ok_or_else(site_not_found)?;
    let outcome = verify::verify_push_install(&state.http, &site.domain).await;
    finish_verification(
        &state,
        user.id(),
        &site.id,
        VerificationFlag::Push,
        outcome,
        "Setup verified successfully!",
    )
    .await
}
