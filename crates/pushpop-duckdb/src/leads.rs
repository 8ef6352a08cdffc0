use anyhow::Result;
use duckdb::types::ToSql;
use serde_json::{Map, Value};

use pushpop_core::lead::{merge_data, Lead};

use crate::backend::new_id;
use crate::DuckDbBackend;

const LEAD_COLUMNS: &str = "id, site_id, popup_id, user_id, email, data, \
     CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

/// Outcome of a first-time submission.
#[derive(Debug)]
pub enum LeadInsert {
    Created(Lead),
    /// `(site_id, popup_id, email)` already has a lead.
    Duplicate,
}

/// Outcome of merging into an existing lead.
#[derive(Debug)]
pub enum LeadMerge {
    Merged(Lead),
    /// The new email already belongs to another lead of the same popup.
    Duplicate,
}

/// The lead a merge targets. All three must match.
pub struct LeadKey<'a> {
    pub id: &'a str,
    pub site_id: &'a str,
    pub popup_id: &'a str,
}

/// Owner-scoped lead filter. `None` fields match everything.
#[derive(Debug, Default, Clone)]
pub struct LeadFilter {
    pub site_id: Option<String>,
    pub popup_id: Option<String>,
}

pub struct NewLead<'a> {
    pub site_id: &'a str,
    pub popup_id: &'a str,
    pub user_id: Option<&'a str>,
    pub email: Option<&'a str>,
    pub data: &'a Map<String, Value>,
}

fn map_lead(row: &duckdb::Row<'_>) -> duckdb::Result<Lead> {
    let data = match crate::popups::json_col(row, 5)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Ok(Lead {
        id: row.get(0)?,
        site_id: row.get(1)?,
        popup_id: row.get(2)?,
        user_id: row.get(3)?,
        email: row.get(4)?,
        data,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn select_lead(conn: &duckdb::Connection, id: &str) -> Result<Option<Lead>> {
    let result = conn
        .prepare(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"))?
        .query_row(duckdb::params![id], map_lead);
    optional(result)
}

fn select_scoped_lead(conn: &duckdb::Connection, key: &LeadKey<'_>) -> Result<Option<Lead>> {
    let result = conn
        .prepare(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1 AND site_id = ?2 AND popup_id = ?3"
        ))?
        .query_row(duckdb::params![key.id, key.site_id, key.popup_id], map_lead);
    optional(result)
}

fn optional(result: duckdb::Result<Lead>) -> Result<Option<Lead>> {
    match result {
        Ok(lead) => Ok(Some(lead)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Number of leads of the popup holding `email`, other than `except_id`.
fn email_taken(
    conn: &duckdb::Connection,
    site_id: &str,
    popup_id: &str,
    email: &str,
    except_id: Option<&str>,
) -> Result<bool> {
    let count: i64 = conn
        .prepare(
            "SELECT COUNT(*) FROM leads \
             WHERE site_id = ?1 AND popup_id = ?2 AND email = ?3 AND id <> ?4",
        )?
        .query_row(
            duckdb::params![site_id, popup_id, email, except_id.unwrap_or("")],
            |row| row.get(0),
        )?;
    Ok(count > 0)
}

impl DuckDbBackend {
    /// Insert a lead unless one with the same email already exists for the
    /// popup. The check and the insert run under one connection lock.
    pub async fn create_lead(&self, lead: NewLead<'_>) -> Result<LeadInsert> {
        let conn = self.conn.lock().await;

        if let Some(email) = lead.email {
            if email_taken(&conn, lead.site_id, lead.popup_id, email, None)? {
                return Ok(LeadInsert::Duplicate);
            }
        }

        let id = new_id();
        conn.execute(
            "INSERT INTO leads (id, site_id, popup_id, user_id, email, data, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
            duckdb::params![
                id,
                lead.site_id,
                lead.popup_id,
                lead.user_id,
                lead.email,
                serde_json::to_string(lead.data)?,
            ],
        )?;

        match select_lead(&conn, &id)? {
            Some(created) => Ok(LeadInsert::Created(created)),
            None => Err(anyhow::anyhow!("lead {id} missing after insert")),
        }
    }

    /// Shallow-merge `data` into an existing lead and replace its email when
    /// one is given. Returns `None` if no lead matches `key`. The email
    /// uniqueness check and the update run under one connection lock.
    pub async fn merge_lead(
        &self,
        key: LeadKey<'_>,
        email: Option<&str>,
        data: Map<String, Value>,
    ) -> Result<Option<LeadMerge>> {
        let conn = self.conn.lock().await;
        let Some(mut lead) = select_scoped_lead(&conn, &key)? else {
            return Ok(None);
        };

        if let Some(email) = email {
            if email_taken(&conn, key.site_id, key.popup_id, email, Some(key.id))? {
                return Ok(Some(LeadMerge::Duplicate));
            }
            lead.email = Some(email.to_string());
        }
        merge_data(&mut lead.data, data);

        conn.execute(
            "UPDATE leads SET data = ?1, email = ?2, updated_at = CURRENT_TIMESTAMP WHERE id = ?3",
            duckdb::params![serde_json::to_string(&lead.data)?, lead.email, key.id],
        )?;
        Ok(select_lead(&conn, key.id)?.map(LeadMerge::Merged))
    }

    /// The caller's leads, newest first.
    pub async fn list_leads(&self, user_id: &str, filter: &LeadFilter) -> Result<Vec<Lead>> {
        let conn = self.conn.lock().await;

        let mut sql = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE user_id = ?1");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];
        if let Some(ref site_id) = filter.site_id {
            params.push(Box::new(site_id.clone()));
            sql.push_str(&format!(" AND site_id = ?{}", params.len()));
        }
        if let Some(ref popup_id) = filter.popup_id {
            params.push(Box::new(popup_id.clone()));
            sql.push_str(&format!(" AND popup_id = ?{}", params.len()));
        }
        sql.push_str(" ORDER BY created_at DESC, seq DESC");

        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), map_lead)?;
        let mut leads = Vec::new();
        for row in rows {
            leads.push(row?);
        }
        Ok(leads)
    }

    /// Delete the caller's leads among `ids`. Ids owned by others are skipped.
    pub async fn delete_leads(&self, user_id: &str, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let mut deleted = 0;
        for id in ids {
            deleted += tx.execute(
                "DELETE FROM leads WHERE id = ?1 AND user_id = ?2",
                duckdb::params![id, user_id],
            )?;
        }
        tx.commit()?;
        Ok(deleted)
    }
}
