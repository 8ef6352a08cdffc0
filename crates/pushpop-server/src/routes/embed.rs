use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use pushpop_core::{popup::EmbedConfig, rotation::select_variant};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedQuery {
    pub last_variant_id: Option<String>,
}

/// `GET /api/embed/{siteId}?lastVariantId=`: the popup the embed script
/// should show, with A/B rotation applied.
///
/// Public and CORS-open. Rotation is stateless: the script sends back the id
/// it was served last time.
#[tracing::instrument(skip(state))]
pub async fn embed_site(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    Query(query): Query<EmbedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let active = state.db.list_active_popups(&site_id).await?;
    let last = query.last_variant_id.as_deref().filter(|s| !s.is_empty());

    let selected = select_variant(&active, last)
        .ok_or_else(|| AppError::NotFound("No active popup found for this site".to_string()))?;

    if let Some(ref group) = selected.test_group_id {
        tracing::info!(
            site_id = %site_id,
            test_group_id = %group,
            last_variant_id = last.unwrap_or(""),
            served = %selected.id,
            variant_label = selected.variant_label.as_deref().unwrap_or(""),
            "A/B variant selected"
        );
    }

    Ok(Json(json!({
        "success": true,
        "data": EmbedConfig::for_rotation(selected),
    })))
}

/// `GET /api/embed/popup/{id}`: one popup's embed config, active or not.
#[tracing::instrument(skip(state))]
pub async fn embed_popup(
    State(state): State<Arc<AppState>>,
    Path(popup_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let popup = state
        .db
        .find_popup(&popup_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Popup not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "data": EmbedConfig::single(&popup),
    })))
}
