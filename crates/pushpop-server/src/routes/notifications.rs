use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use pushpop_core::campaign::{CampaignStatus, CreateCampaignRequest, NewCampaign};

use crate::{
    auth::session::SessionUser, error::AppError, push::MulticastMessage,
    routes::popups::SiteQuery, state::AppState,
};

fn campaign_not_found() -> AppError {
    AppError::NotFound("Campaign not found".to_string())
}

fn send_in_progress() -> AppError {
    AppError::BadRequest("Campaign is already being sent".to_string())
}

/// `GET /api/notifications?siteId=`: the caller's campaigns, newest first.
#[tracing::instrument(skip(state, user))]
pub async fn list_campaigns(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Query(query): Query<SiteQuery>,
) -> Result<impl IntoResponse, AppError> {
    let site_id = query.site_id.as_deref().filter(|s| !s.is_empty());
    let campaigns = state.db.list_campaigns(user.id(), site_id).await?;
    Ok(Json(json!({ "success": true, "data": campaigns })))
}

/// `POST /api/notifications`: create a draft (or scheduled) campaign.
#[tracing::instrument(skip(state, user, req))]
pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = NewCampaign::from_request(req)?;
    if state.db.get_site(user.id(), &campaign.site_id).await?.is_none() {
        return Err(AppError::NotFound("Site not found".to_string()));
    }
    let created = state.db.create_campaign(user.id(), &campaign).await?;
    tracing::info!(campaign_id = %created.id, status = %created.status, "Campaign created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": created })),
    ))
}

/// `GET /api/notifications/{id}`
#[tracing::instrument(skip(state, user))]
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(campaign_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = state
        .db
        .get_campaign(user.id(), &campaign_id)
        .await?
        .ok_or_else(campaign_not_found)?;
    Ok(Json(json!({ "success": true, "data": campaign })))
}

/// `DELETE /api/notifications/{id}`
#[tracing::instrument(skip(state, user))]
pub async fn delete_campaign(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(campaign_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_campaign(user.id(), &campaign_id).await? {
        return Err(campaign_not_found());
    }
    Ok(Json(json!({ "success": true, "data": {} })))
}

/// `POST /api/notifications/{id}/send`: push the campaign to every token
/// registered for its site.
///
/// The campaign is claimed (`sending`) before the provider is called, so a
/// concurrent send of the same campaign is refused instead of dispatching
/// twice. A reachable provider always ends in `sent`, whatever the per-token
/// outcome. A provider error marks the campaign `failed` so it can be retried.
#[tracing::instrument(skip(state, user))]
pub async fn send_campaign(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Path(campaign_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = state
        .db
        .get_campaign(user.id(), &campaign_id)
        .await?
        .ok_or_else(campaign_not_found)?;
    match campaign.status {
        CampaignStatus::Sent => {
            return Err(AppError::BadRequest("Campaign already sent".to_string()))
        }
        CampaignStatus::Sending => return Err(send_in_progress()),
        _ => {}
    }

    let tokens = state.db.subscriber_tokens(&campaign.site_id).await?;
    if tokens.is_empty() {
        return Err(AppError::BadRequest(
            "No subscribers found for this site.".to_string(),
        ));
    }

    let sender = state.push_sender().await?;
    if !state
        .db
        .claim_campaign_for_send(user.id(), &campaign.id)
        .await?
    {
        return Err(send_in_progress());
    }
    let message = MulticastMessage::new(&campaign.push_content(), tokens);

    match sender.send_multicast(&message).await {
        Ok(batch) => {
            tracing::info!(
                campaign_id = %campaign.id,
                success = batch.success_count,
                failure = batch.failure_count,
                "Campaign sent"
            );
            let updated = state
                .db
                .record_campaign_result(
                    user.id(),
                    &campaign.id,
                    CampaignStatus::Sent,
                    batch.success_count as i64,
                    batch.failure_count as i64,
                )
                .await?
                .ok_or_else(campaign_not_found)?;
            Ok(Json(json!({ "success": true, "data": updated })))
        }
        Err(e) => {
            if let Err(record_err) = state
                .db
                .record_campaign_result(user.id(), &campaign.id, CampaignStatus::Failed, 0, 0)
                .await
            {
                tracing::error!(
                    campaign_id = %campaign.id,
                    error = %record_err,
                    "Failed to mark campaign as failed"
                );
            }
            Err(AppError::Internal(e.context("push dispatch failed")))
        }
    }
}
