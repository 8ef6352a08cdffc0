use anyhow::Result;

use pushpop_core::user::{GlobalTotals, UserUsage, UserWithUsage};

use crate::users::map_user;
use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Instance-wide row counts for the wizard console.
    pub async fn global_totals(&self) -> Result<GlobalTotals> {
        let conn = self.conn.lock().await;
        let totals = conn
            .prepare(
                "SELECT \
                    (SELECT COUNT(*) FROM users), \
                    (SELECT COUNT(*) FROM sites), \
                    (SELECT COUNT(*) FROM popups), \
                    (SELECT COUNT(*) FROM leads), \
                    (SELECT COUNT(*) FROM events)",
            )?
            .query_row([], |row| {
                Ok(GlobalTotals {
                    total_users: row.get(0)?,
                    total_sites: row.get(1)?,
                    total_popups: row.get(2)?,
                    total_leads: row.get(3)?,
                    total_events: row.get(4)?,
                })
            })?;
        Ok(totals)
    }

    /// Every account, newest first, with its site/popup/lead counts.
    pub async fn list_users_with_usage(&self) -> Result<Vec<UserWithUsage>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            r#"SELECT
                u.id, u.name, u.email, u.is_blocked,
                CAST(u.created_at AS VARCHAR), CAST(u.updated_at AS VARCHAR),
                (SELECT COUNT(*) FROM sites s WHERE s.user_id = u.id),
                (SELECT COUNT(*) FROM popups p WHERE p.user_id = u.id),
                (SELECT COUNT(*) FROM leads l WHERE l.user_id = u.id)
            FROM users u
            ORDER BY u.created_at DESC, u.id"#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(UserWithUsage {
                user: map_user(row)?,
                stats: UserUsage {
                    sites: row.get(6)?,
                    popups: row.get(7)?,
                    leads: row.get(8)?,
                },
            })
        })?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}
