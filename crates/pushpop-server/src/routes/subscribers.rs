use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use pushpop_core::subscriber::SubscriberRequest;

use crate::{error::AppError, state::AppState};

fn required(req: SubscriberRequest) -> Result<(String, String), AppError> {
    match (
        req.site_id.filter(|s| !s.trim().is_empty()),
        req.token.filter(|t| !t.trim().is_empty()),
    ) {
        (Some(site_id), Some(token)) => Ok((site_id, token)),
        _ => Err(AppError::BadRequest(
            "Site ID and token are required".to_string(),
        )),
    }
}

/// `POST /api/subscribers`: called by a site's service worker once the
/// browser grants push permission. Re-registering a token is a no-op.
#[tracing::instrument(skip(state, req))]
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubscriberRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (site_id, token) = required(req)?;
    if !state.db.site_exists(&site_id).await? {
        return Err(AppError::NotFound("Site not found".to_string()));
    }
    let subscriber = state.db.add_subscriber(&site_id, &token).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": subscriber })),
    ))
}

/// `DELETE /api/subscribers`: drop a token after the browser revokes it.
#[tracing::instrument(skip(state, req))]
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubscriberRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (site_id, token) = required(req)?;
    let removed = state.db.remove_subscriber(&site_id, &token).await?;
    Ok(Json(json!({ "success": true, "data": { "removed": removed } })))
}
