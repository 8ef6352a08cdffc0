use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use pushpop_core::{
    event::{EventType, StatCounter},
    lead::{Lead, LeadSubmission, SubmitLeadRequest},
};
use pushpop_duckdb::leads::{LeadFilter, LeadInsert, LeadKey, LeadMerge, NewLead};

use crate::{auth::session::SessionUser, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLeadsQuery {
    pub site_id: Option<String>,
    pub popup_id: Option<String>,
}

impl ListLeadsQuery {
    fn into_filter(self) -> LeadFilter {
        LeadFilter {
            site_id: self.site_id.filter(|s| !s.is_empty()),
            popup_id: self.popup_id.filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteLeadsRequest {
    #[serde(default)]
    pub ids: Vec<String>,
}

fn duplicate_email() -> AppError {
    AppError::Conflict("Email already submitted for this popup".to_string())
}

/// `POST /api/leads`: form submission from the embed script.
///
/// Without `leadId` a new lead is created for the popup's owner, then a
/// conversion event is recorded and `stats.submissions` bumped; those two
/// follow-ups are independent and only logged on failure. With `leadId` the
/// submission is merged into that lead, which must belong to the named site
/// and popup, and nothing else is written.
#[tracing::instrument(skip(state, req))]
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitLeadRequest>,
) -> Result<Response, AppError> {
    match LeadSubmission::from_request(req)? {
        LeadSubmission::Merge {
            lead_id,
            site_id,
            popup_id,
            email,
            data,
        } => {
            let key = LeadKey {
                id: &lead_id,
                site_id: &site_id,
                popup_id: &popup_id,
            };
            let merged = state
                .db
                .merge_lead(key, email.as_deref(), data)
                .await?
                .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))?;
            match merged {
                LeadMerge::Merged(lead) => {
                    Ok(Json(json!({ "success": true, "data": lead })).into_response())
                }
                LeadMerge::Duplicate => Err(duplicate_email()),
            }
        }
        LeadSubmission::Create {
            site_id,
            popup_id,
            email,
            data,
        } => {
            let popup = state
                .db
                .find_popup(&popup_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Popup not found".to_string()))?;

            let inserted = state
                .db
                .create_lead(NewLead {
                    site_id: &site_id,
                    popup_id: &popup_id,
                    user_id: Some(&popup.user_id),
                    email: email.as_deref(),
                    data: &data,
                })
                .await?;
            let lead = match inserted {
                LeadInsert::Created(lead) => lead,
                LeadInsert::Duplicate => return Err(duplicate_email()),
            };

            if let Err(e) = state
                .db
                .insert_event(&site_id, &popup_id, Some(&popup.user_id), EventType::Conversion)
                .await
            {
                tracing::error!(popup_id = %popup_id, error = %e, "Failed to record conversion event");
            }
            if let Err(e) = state
                .db
                .increment_popup_stat(&popup_id, StatCounter::Submissions)
                .await
            {
                tracing::error!(popup_id = %popup_id, error = %e, "Failed to increment submissions");
            }

            Ok((
                StatusCode::CREATED,
                Json(json!({ "success": true, "data": lead })),
            )
                .into_response())
        }
    }
}

/// `GET /api/leads?siteId&popupId`: the caller's leads, newest first.
#[tracing::instrument(skip(state, user))]
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Query(query): Query<ListLeadsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let leads = state.db.list_leads(user.id(), &query.into_filter()).await?;
    Ok(Json(json!({ "success": true, "data": leads })))
}

/// `DELETE /api/leads` `{ids}`: bulk delete among the caller's leads.
#[tracing::instrument(skip(state, user, req))]
pub async fn delete_leads(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Json(req): Json<DeleteLeadsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.ids.is_empty() {
        return Err(AppError::BadRequest("ids are required".to_string()));
    }
    let deleted = state.db.delete_leads(user.id(), &req.ids).await?;
    tracing::info!(user_id = %user.id(), deleted, "Leads deleted");
    Ok(Json(json!({ "success": true, "data": { "deleted": deleted } })))
}

/// `GET /api/leads/export?siteId&popupId`: the caller's leads as CSV.
#[tracing::instrument(skip(state, user))]
pub async fn export_leads(
    State(state): State<Arc<AppState>>,
    user: SessionUser,
    Query(query): Query<ListLeadsQuery>,
) -> Result<Response, AppError> {
    let leads = state.db.list_leads(user.id(), &query.into_filter()).await?;
    let csv_bytes = build_csv(&leads)?;
    build_csv_response("leads.csv", csv_bytes)
}

/// Sanitize a CSV field value against formula injection.
///
/// Spreadsheet apps interpret values that begin with `=`, `+`, `-`, `@`,
/// TAB, or CR as formulas. A leading `'` makes them literal.
fn sanitize_csv_field(val: &str) -> std::borrow::Cow<'_, str> {
    if val.starts_with(['=', '+', '-', '@', '\t', '\r']) {
        std::borrow::Cow::Owned(format!("'{val}"))
    } else {
        std::borrow::Cow::Borrowed(val)
    }
}

fn build_csv(leads: &[Lead]) -> anyhow::Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::with_capacity(leads.len().saturating_mul(128)));

    wtr.write_record(["id", "siteId", "popupId", "email", "data", "createdAt"])
        .map_err(|e| anyhow::anyhow!("csv write_record failed: {e}"))?;

    for lead in leads {
        let data = serde_json::to_string(&lead.data)?;
        let id = sanitize_csv_field(&lead.id);
        let site_id = sanitize_csv_field(&lead.site_id);
        let popup_id = sanitize_csv_field(&lead.popup_id);
        let email = sanitize_csv_field(lead.email.as_deref().unwrap_or(""));
        let data = sanitize_csv_field(&data);
        let created_at = sanitize_csv_field(&lead.created_at);

        wtr.write_record([
            id.as_ref(),
            site_id.as_ref(),
            popup_id.as_ref(),
            email.as_ref(),
            data.as_ref(),
            created_at.as_ref(),
        ])
        .map_err(|e| anyhow::anyhow!("csv write_record failed: {e}"))?;
    }

    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("csv flush failed: {e}"))
}

fn build_csv_response(filename: &str, csv_bytes: Vec<u8>) -> Result<Response, AppError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(axum::body::Body::from(csv_bytes))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("response build failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_prefixes_are_neutralized() {
        assert_eq!(sanitize_csv_field("=SUM(A1)"), "'=SUM(A1)");
        assert_eq!(sanitize_csv_field("@cmd"), "'@cmd");
        assert_eq!(sanitize_csv_field("ada@example.com"), "ada@example.com");
    }

    #[test]
    fn csv_has_header_and_rows() {
        let lead = Lead {
            id: "l1".to_string(),
            site_id: "site_a".to_string(),
            popup_id: "p1".to_string(),
            user_id: Some("u1".to_string()),
            email: Some("+1@example.com".to_string()),
            data: serde_json::Map::new(),
            created_at: "2026-01-01 00:00:00".to_string(),
            updated_at: "2026-01-01 00:00:00".to_string(),
        };
        let bytes = build_csv(&[lead]).expect("csv");
        let text = String::from_utf8(bytes).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id,siteId,popupId,email,data,createdAt"));
        let row = lines.next().expect("row");
        assert!(row.starts_with("l1,site_a,p1,'+1@example.com,{}"));
    }
}
