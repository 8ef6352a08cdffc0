use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use pushpop_core::popup::{CreatePopupRequest, NewPopup, PopupStatsView, UpdatePopupRequest};

use crate::{auth::session::SessionUser, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteQuery {
    pub site_id: Option<String>,
}

fn popup_not_found() -> AppError {
    AppError::NotFound("Popup not found".to_string())
}

/// `GET /api/popups?siteId=`: every popup, optionally for one site.
///
/// Unauthenticated, as the embed builder preview reads it.
#[tracing::instrument(skip(state))]
pub async fn list_popups(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SiteQuery>,
) -> Result<impl IntoResponse, AppError> {
    let site_id = query.site_id.as_deref().filter(|s| !s.is_empty());
    let popups = state.db.list_popups(site_id).await?;
    Ok(Json(json!({ "success": true, "data": popups })))
}

/// `POST /api/popups`: create a popup on one of the caller's sites.
#[tracing::instrument(skip(state, user, req))]
pub async fn create_popup(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Json(req): Json<CreatePopupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_popup = NewPopup::from_request(req)?;
    if state.db.get_site(user.id(), &new_popup.site_id).await?.is_none() {
        return Err(AppError::NotFound("Site not found".to_string()));
    }

    let popup = state.db.create_popup(user.id(), new_popup).await?;
    tracing::info!(popup_id = %popup.id, site_id = %popup.site_id, "Popup created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": popup })),
    ))
}

/// `GET /api/popups/{id}`
#[tracing::instrument(skip(state, user))]
pub async fn get_popup(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(popup_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let popup = state
        .db
        .get_popup(user.id(), &popup_id)
        .await?
        .ok_or_else(popup_not_found)?;
    Ok(Json(json!({ "success": true, "data": popup })))
}

/// `PUT /api/popups/{id}`: partial update. Another user's popup is 404.
#[tracing::instrument(skip(state, user, req))]
pub async fn update_popup(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(popup_id): Path<String>,
    Json(req): Json<UpdatePopupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let req = req.validate()?;

    let popup = state
        .db
        .update_popup(user.id(), &popup_id, req)
        .await?
        .ok_or_else(popup_not_found)?;
    Ok(Json(json!({ "success": true, "data": popup })))
}

/// `DELETE /api/popups/{id}`: returns the deleted popup.
#[tracing::instrument(skip(state, user))]
pub async fn delete_popup(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(popup_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let popup = state
        .db
        .delete_popup(user.id(), &popup_id)
        .await?
        .ok_or_else(popup_not_found)?;
    tracing::info!(popup_id = %popup.id, "Popup deleted");
    Ok(Json(json!({ "success": true, "data": popup })))
}

/// `GET /api/popups/site/{siteId}`: the caller's popups on one site.
#[tracing::instrument(skip(state, user))]
pub async fn list_site_popups(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let popups = state.db.list_site_popups(user.id(), &site_id).await?;
    Ok(Json(json!({ "success": true, "data": popups })))
}

/// `GET /api/popups/stats?siteId=`: counters keyed by popup id.
#[tracing::instrument(skip(state, user))]
pub async fn popup_stats(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Query(query): Query<SiteQuery>,
) -> Result<impl IntoResponse, AppError> {
    let site_id = query
        .site_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("siteId is required".to_string()))?;

    let stats: BTreeMap<String, PopupStatsView> = state
        .db
        .popup_stats(user.id(), &site_id)
        .await?
        .into_iter()
        .map(|(id, s)| (id, PopupStatsView::from(s)))
        .collect();
    Ok(Json(json!({ "success": true, "data": stats })))
}
