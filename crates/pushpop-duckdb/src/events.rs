use anyhow::Result;
use duckdb::types::ToSql;

use pushpop_core::event::{Event, EventType};

use crate::backend::new_id;
use crate::DuckDbBackend;

const EVENT_COLUMNS: &str =
    "id, site_id, popup_id, user_id, event_type, CAST(created_at AS VARCHAR)";

/// Owner-scoped event filter. `None` fields match everything.
#[derive(Debug, Default, Clone)]
pub struct EventFilter {
    pub site_id: Option<String>,
    pub popup_id: Option<String>,
    pub event_type: Option<EventType>,
}

fn map_event(row: &duckdb::Row<'_>) -> duckdb::Result<Event> {
    let raw_type: String = row.get(4)?;
    let event_type = raw_type.parse::<EventType>().map_err(|e| {
        duckdb::Error::FromSqlConversionFailure(4, duckdb::types::Type::Text, Box::new(e))
    })?;
    Ok(Event {
        id: row.get(0)?,
        site_id: row.get(1)?,
        popup_id: row.get(2)?,
        user_id: row.get(3)?,
        event_type,
        created_at: row.get(5)?,
    })
}

impl DuckDbBackend {
    /// Append one event and return the stored row.
    pub async fn insert_event(
        &self,
        site_id: &str,
        popup_id: &str,
        user_id: Option<&str>,
        event_type: EventType,
    ) -> Result<Event> {
        let conn = self.conn.lock().await;
        let id = new_id();
        conn.execute(
            "INSERT INTO events (id, site_id, popup_id, user_id, event_type, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, CURRENT_TIMESTAMP)",
            duckdb::params![id, site_id, popup_id, user_id, event_type.as_str()],
        )?;
        let event = conn
            .prepare(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"))?
            .query_row(duckdb::params![id], map_event)?;
        Ok(event)
    }

    /// The caller's events, newest first.
    pub async fn list_events(&self, user_id: &str, filter: &EventFilter) -> Result<Vec<Event>> {
        let conn = self.conn.lock().await;

        let mut sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE user_id = ?1");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];
        if let Some(ref site_id) = filter.site_id {
            params.push(Box::new(site_id.clone()));
            sql.push_str(&format!(" AND site_id = ?{}", params.len()));
        }
        if let Some(ref popup_id) = filter.popup_id {
            params.push(Box::new(popup_id.clone()));
            sql.push_str(&format!(" AND popup_id = ?{}", params.len()));
        }
        if let Some(event_type) = filter.event_type {
            params.push(Box::new(event_type.as_str()));
            sql.push_str(&format!(" AND event_type = ?{}", params.len()));
        }
        sql.push_str(" ORDER BY created_at DESC, seq DESC");

        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), map_event)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }
}
