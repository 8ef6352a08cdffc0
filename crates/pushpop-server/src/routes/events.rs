use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use pushpop_core::event::EventType;
use pushpop_duckdb::events::EventFilter;

use crate::{auth::session::SessionUser, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventRequest {
    pub site_id: Option<String>,
    pub popup_id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsQuery {
    pub site_id: Option<String>,
    pub popup_id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

/// `POST /api/events`: record a view/visit/conversion from the embed script.
///
/// The event row is the primary write. The matching stats counter is bumped
/// afterwards; a failed bump is logged and the request still succeeds.
#[tracing::instrument(skip(state, req))]
pub async fn track_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TrackEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(site_id), Some(popup_id), Some(raw_type)) = (
        req.site_id.filter(|s| !s.is_empty()),
        req.popup_id.filter(|s| !s.is_empty()),
        req.event_type.filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "Site ID, popup ID, and type are required".to_string(),
        ));
    };
    let event_type: EventType = raw_type.parse()?;

    let popup = state
        .db
        .find_popup(&popup_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Popup not found".to_string()))?;

    let event = state
        .db
        .insert_event(&site_id, &popup_id, Some(&popup.user_id), event_type)
        .await?;

    if let Some(counter) = event_type.stat_counter() {
        if let Err(e) = state.db.increment_popup_stat(&popup_id, counter).await {
            tracing::error!(popup_id = %popup_id, error = %e, "Failed to increment popup stats");
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": event })),
    ))
}

/// `GET /api/events?siteId&popupId&type`: the caller's events, newest first.
#[tracing::instrument(skip(state, user))]
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Query(query): Query<ListEventsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let event_type = match query.event_type.filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<EventType>()?),
        None => None,
    };
    let filter = EventFilter {
        site_id: query.site_id.filter(|s| !s.is_empty()),
        popup_id: query.popup_id.filter(|s| !s.is_empty()),
        event_type,
    };
    let events = state.db.list_events(user.id(), &filter).await?;
    Ok(Json(json!({ "success": true, "data": events })))
}
