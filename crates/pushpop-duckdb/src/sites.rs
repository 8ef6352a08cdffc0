use anyhow::Result;

use pushpop_core::site::Site;

use crate::DuckDbBackend;

const SITE_COLUMNS: &str = "id, user_id, name, domain, is_popup_verified, is_push_verified, \
     CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

/// Which verification flag a successful check sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationFlag {
    Popup,
    Push,
}

impl VerificationFlag {
    fn column(&self) -> &'static str {
        match self {
            VerificationFlag::Popup => "is_popup_verified",
            VerificationFlag::Push => "is_push_verified",
        }
    }
}

/// Generate a site ID: "site_" + 10 random `[0-9a-z]` chars.
pub fn generate_site_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let chars: String = (0..10)
        .map(|_| {
            let idx = rng.gen_range(0..36);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect();
    format!("site_{}", chars)
}

fn map_site(row: &duckdb::Row<'_>) -> duckdb::Result<Site> {
    Ok(Site {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        domain: row.get(3)?,
        is_popup_verified: row.get(4)?,
        is_push_verified: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl DuckDbBackend {
    pub async fn create_site(&self, user_id: &str, name: &str, domain: &str) -> Result<Site> {
        let conn = self.conn.lock().await;
        let id = generate_site_id();

        conn.execute(
            "INSERT INTO sites (id, user_id, name, domain, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
            duckdb::params![id, user_id, name, domain],
        )?;

        let site = conn
            .prepare(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE id = ?1"))?
            .query_row(duckdb::params![id], map_site)?;
        Ok(site)
    }

    /// The caller's sites, newest first.
    pub async fn list_sites(&self, user_id: &str) -> Result<Vec<Site>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SITE_COLUMNS} FROM sites WHERE user_id = ?1 \
             ORDER BY created_at DESC, seq DESC"
        ))?;
        let rows = stmt.query_map(duckdb::params![user_id], map_site)?;
        let mut sites = Vec::new();
        for row in rows {
            sites.push(row?);
        }
        Ok(sites)
    }

    /// Unscoped existence check for the public subscriber endpoint.
    pub async fn site_exists(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .prepare("SELECT COUNT(*) FROM sites WHERE id = ?1")?
            .query_row(duckdb::params![id], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Owner-scoped lookup; another user's site reads as `None`.
    pub async fn get_site(&self, user_id: &str, id: &str) -> Result<Option<Site>> {
        let conn = self.conn.lock().await;
        let result = conn
            .prepare(&format!(
                "SELECT {SITE_COLUMNS} FROM sites WHERE id = ?1 AND user_id = ?2"
            ))?
            .query_row(duckdb::params![id, user_id], map_site);
        match result {
            Ok(site) => Ok(Some(site)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set one verification flag on an owned site. Returns `false` if the
    /// site is not the caller's.
    pub async fn mark_site_verified(
        &self,
        user_id: &str,
        id: &str,
        flag: VerificationFlag,
    ) -> Result<bool> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "UPDATE sites SET {} = true, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?1 AND user_id = ?2",
            flag.column()
        );
        let changed = conn.execute(&sql, duckdb::params![id, user_id])?;
        Ok(changed > 0)
    }

    /// Delete a site and everything hanging off it.
    ///
    /// No foreign keys, so children go first: campaigns, subscribers,
    /// events, leads, popups, then the site. One transaction.
    pub async fn delete_site(&self, user_id: &str, id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().await;

        let exists: i64 = conn
            .prepare("SELECT COUNT(*) FROM sites WHERE id = ?1 AND user_id = ?2")?
            .query_row(duckdb::params![id, user_id], |row| row.get(0))?;
        if exists == 0 {
            return Ok(false);
        }

        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM notification_campaigns WHERE site_id = ?1",
            duckdb::params![id],
        )?;
        tx.execute("DELETE FROM subscribers WHERE site_id = ?1", duckdb::params![id])?;
        tx.execute("DELETE FROM events WHERE site_id = ?1", duckdb::params![id])?;
        tx.execute("DELETE FROM leads WHERE site_id = ?1", duckdb::params![id])?;
        tx.execute("DELETE FROM popups WHERE site_id = ?1", duckdb::params![id])?;
        tx.execute("DELETE FROM sites WHERE id = ?1", duckdb::params![id])?;
        tx.commit()?;

        tracing::info!(site_id = %id, "Site deleted with dependent rows");
        Ok(true)
    }
}
