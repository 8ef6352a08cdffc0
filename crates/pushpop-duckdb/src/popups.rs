use anyhow::Result;
use duckdb::types::ToSql;
use serde_json::Value;

use pushpop_core::event::StatCounter;
use pushpop_core::popup::{NewPopup, Popup, PopupStats, UpdatePopupRequest};

use crate::backend::new_id;
use crate::DuckDbBackend;

const POPUP_COLUMNS: &str = "id, site_id, user_id, title, description, cta_text, \
     styles, components, settings, triggers, is_active, test_group_id, variant_label, \
     stats_visitors, stats_views, stats_submissions, \
     CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

const NEWEST_FIRST: &str = "ORDER BY created_at DESC, seq DESC";

/// Read a VARCHAR column holding a JSON document.
pub(crate) fn json_col(row: &duckdb::Row<'_>, idx: usize) -> duckdb::Result<Value> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        duckdb::Error::FromSqlConversionFailure(idx, duckdb::types::Type::Text, Box::new(e))
    })
}

fn map_popup(row: &duckdb::Row<'_>) -> duckdb::Result<Popup> {
    Ok(Popup {
        id: row.get(0)?,
        site_id: row.get(1)?,
        user_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        cta_text: row.get(5)?,
        styles: json_col(row, 6)?,
        components: json_col(row, 7)?,
        settings: json_col(row, 8)?,
        triggers: json_col(row, 9)?,
        is_active: row.get(10)?,
        test_group_id: row.get(11)?,
        variant_label: row.get(12)?,
        stats: PopupStats {
            visitors: row.get(13)?,
            views: row.get(14)?,
            submissions: row.get(15)?,
        },
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

fn collect_popups(stmt: &mut duckdb::Statement<'_>, params: &[&dyn ToSql]) -> Result<Vec<Popup>> {
    let rows = stmt.query_map(params, map_popup)?;
    let mut popups = Vec::new();
    for row in rows {
        popups.push(row?);
    }
    Ok(popups)
}

fn optional(result: duckdb::Result<Popup>) -> Result<Option<Popup>> {
    match result {
        Ok(p) => Ok(Some(p)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl DuckDbBackend {
    /// Insert a popup for `user_id`. Site ownership is the caller's check.
    pub async fn create_popup(&self, user_id: &str, popup: NewPopup) -> Result<Popup> {
        let conn = self.conn.lock().await;
        let id = new_id();

        conn.execute(
            r#"INSERT INTO popups (
                id, site_id, user_id, title, description, cta_text,
                styles, components, settings, triggers,
                is_active, test_group_id, variant_label,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13,
                CURRENT_TIMESTAMP, CURRENT_TIMESTAMP
            )"#,
            duckdb::params![
                id,
                popup.site_id,
                user_id,
                popup.title,
                popup.description,
                popup.cta_text,
                serde_json::to_string(&popup.styles)?,
                serde_json::to_string(&popup.components)?,
                serde_json::to_string(&popup.settings)?,
                serde_json::to_string(&popup.triggers)?,
                popup.is_active,
                popup.test_group_id,
                popup.variant_label,
            ],
        )?;

        let created = conn
            .prepare(&format!("SELECT {POPUP_COLUMNS} FROM popups WHERE id = ?1"))?
            .query_row(duckdb::params![id], map_popup)?;
        Ok(created)
    }

    /// Unscoped listing, optionally narrowed to one site. Newest first.
    pub async fn list_popups(&self, site_id: Option<&str>) -> Result<Vec<Popup>> {
        let conn = self.conn.lock().await;
        match site_id {
            Some(site_id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {POPUP_COLUMNS} FROM popups WHERE site_id = ?1 {NEWEST_FIRST}"
                ))?;
                collect_popups(&mut stmt, &[&site_id])
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("SELECT {POPUP_COLUMNS} FROM popups {NEWEST_FIRST}"))?;
                collect_popups(&mut stmt, &[])
            }
        }
    }

    /// The caller's popups on one site, newest first.
    pub async fn list_site_popups(&self, user_id: &str, site_id: &str) -> Result<Vec<Popup>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {POPUP_COLUMNS} FROM popups WHERE site_id = ?1 AND user_id = ?2 {NEWEST_FIRST}"
        ))?;
        collect_popups(&mut stmt, &[&site_id, &user_id])
    }

    /// Active popups of a site, newest first. Input to variant selection.
    pub async fn list_active_popups(&self, site_id: &str) -> Result<Vec<Popup>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {POPUP_COLUMNS} FROM popups WHERE site_id = ?1 AND is_active = true {NEWEST_FIRST}"
        ))?;
        collect_popups(&mut stmt, &[&site_id])
    }

    /// Unscoped lookup for the public embed/event/lead paths.
    pub async fn find_popup(&self, id: &str) -> Result<Option<Popup>> {
        let conn = self.conn.lock().await;
        let result = conn
            .prepare(&format!("SELECT {POPUP_COLUMNS} FROM popups WHERE id = ?1"))?
            .query_row(duckdb::params![id], map_popup);
        optional(result)
    }

    pub async fn get_popup(&self, user_id: &str, id: &str) -> Result<Option<Popup>> {
        let conn = self.conn.lock().await;
        let result = conn
            .prepare(&format!(
                "SELECT {POPUP_COLUMNS} FROM popups WHERE id = ?1 AND user_id = ?2"
            ))?
            .query_row(duckdb::params![id, user_id], map_popup);
        optional(result)
    }

    /// Apply a partial update to an owned popup in one statement.
    ///
    /// Returns `None` when the popup does not exist or belongs to someone
    /// else. `site_id`, `user_id` and the stats columns are never touched.
    pub async fn update_popup(
        &self,
        user_id: &str,
        id: &str,
        req: UpdatePopupRequest,
    ) -> Result<Option<Popup>> {
        let conn = self.conn.lock().await;

        let mut sets: Vec<&'static str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(title) = req.title {
            sets.push("title");
            params.push(Box::new(title));
        }
        if let Some(description) = req.description {
            sets.push("description");
            params.push(Box::new(description));
        }
        if let Some(cta_text) = req.cta_text {
            sets.push("cta_text");
            params.push(Box::new(cta_text));
        }
        for (column, value) in [
            ("styles", req.styles),
            ("components", req.components),
            ("settings", req.settings),
            ("triggers", req.triggers),
        ] {
            if let Some(value) = value {
                sets.push(column);
                params.push(Box::new(serde_json::to_string(&value)?));
            }
        }
        if let Some(is_active) = req.is_active {
            sets.push("is_active");
            params.push(Box::new(is_active));
        }
        if let Some(test_group_id) = req.test_group_id {
            sets.push("test_group_id");
            params.push(Box::new(test_group_id));
        }
        if let Some(variant_label) = req.variant_label {
            sets.push("variant_label");
            params.push(Box::new(variant_label));
        }

        let assignments: Vec<String> = sets
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{column} = ?{}", i + 1))
            .chain(std::iter::once("updated_at = CURRENT_TIMESTAMP".to_string()))
            .collect();
        let n = params.len();
        let sql = format!(
            "UPDATE popups SET {} WHERE id = ?{} AND user_id = ?{}",
            assignments.join(", "),
            n + 1,
            n + 2
        );
        params.push(Box::new(id.to_string()));
        params.push(Box::new(user_id.to_string()));

        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let changed = conn.execute(&sql, param_refs.as_slice())?;
        if changed == 0 {
            return Ok(None);
        }

        let updated = conn
            .prepare(&format!("SELECT {POPUP_COLUMNS} FROM popups WHERE id = ?1"))?
            .query_row(duckdb::params![id], map_popup)?;
        Ok(Some(updated))
    }

    /// Delete an owned popup and return it. Leads and events keep their rows.
    pub async fn delete_popup(&self, user_id: &str, id: &str) -> Result<Option<Popup>> {
        let conn = self.conn.lock().await;
        let existing = optional(
            conn.prepare(&format!(
                "SELECT {POPUP_COLUMNS} FROM popups WHERE id = ?1 AND user_id = ?2"
            ))?
            .query_row(duckdb::params![id, user_id], map_popup),
        )?;
        if existing.is_some() {
            conn.execute("DELETE FROM popups WHERE id = ?1", duckdb::params![id])?;
        }
        Ok(existing)
    }

    /// Bump one denormalized counter. Not tied to the event/lead write.
    pub async fn increment_popup_stat(&self, popup_id: &str, counter: StatCounter) -> Result<()> {
        let conn = self.conn.lock().await;
        let column = counter.column();
        conn.execute(
            &format!("UPDATE popups SET {column} = {column} + 1 WHERE id = ?1"),
            duckdb::params![popup_id],
        )?;
        Ok(())
    }

    /// Counters of every popup the caller owns on one site.
    pub async fn popup_stats(&self, user_id: &str, site_id: &str) -> Result<Vec<(String, PopupStats)>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, stats_visitors, stats_views, stats_submissions FROM popups \
             WHERE site_id = ?1 AND user_id = ?2",
        )?;
        let rows = stmt.query_map(duckdb::params![site_id, user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                PopupStats {
                    visitors: row.get(1)?,
                    views: row.get(2)?,
                    submissions: row.get(3)?,
                },
            ))
        })?;
        let mut stats = Vec::new();
        for row in rows {
            stats.push(row?);
        }
        Ok(stats)
    }
}
