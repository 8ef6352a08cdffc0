use anyhow::Result;

use pushpop_core::subscriber::Subscriber;

use crate::backend::new_id;
use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Register a push token for a site. Re-registering the same token is a
    /// no-op that returns the existing row.
    pub async fn add_subscriber(&self, site_id: &str, token: &str) -> Result<Subscriber> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO subscribers (id, site_id, token, created_at) \
             VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)",
            duckdb::params![new_id(), site_id, token],
        )?;
        let subscriber = conn
            .prepare(
                "SELECT id, site_id, token, CAST(created_at AS VARCHAR) FROM subscribers \
                 WHERE site_id = ?1 AND token = ?2",
            )?
            .query_row(duckdb::params![site_id, token], |row| {
                Ok(Subscriber {
                    id: row.get(0)?,
                    site_id: row.get(1)?,
                    token: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?;
        Ok(subscriber)
    }

    pub async fn remove_subscriber(&self, site_id: &str, token: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let removed = conn.execute(
            "DELETE FROM subscribers WHERE site_id = ?1 AND token = ?2",
            duckdb::params![site_id, token],
        )?;
        Ok(removed > 0)
    }

    /// Every push token registered for a site.
    pub async fn subscriber_tokens(&self, site_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT token FROM subscribers WHERE site_id = ?1 ORDER BY created_at")?;
        let rows = stmt.query_map(duckdb::params![site_id], |row| row.get::<_, String>(0))?;
        let mut tokens = Vec::new();
        for row in rows {
            tokens.push(row?);
        }
        Ok(tokens)
    }
}
