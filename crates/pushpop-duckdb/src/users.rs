use anyhow::Result;

use pushpop_core::user::{User, UserCredentials};

use crate::backend::new_id;
use crate::DuckDbBackend;

const USER_COLUMNS: &str =
    "id, name, email, is_blocked, CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

pub(crate) fn map_user(row: &duckdb::Row<'_>) -> duckdb::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        is_blocked: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn select_user(conn: &duckdb::Connection, id: &str) -> Result<Option<User>> {
    let result = conn
        .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?
        .query_row(duckdb::params![id], map_user);
    match result {
        Ok(u) => Ok(Some(u)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl DuckDbBackend {
    /// Create an account. Returns `None` when the email is already taken.
    ///
    /// `email` must already be normalized and `password_hash` already an
    /// argon2 PHC string.
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<User>> {
        let conn = self.conn.lock().await;
        let taken: i64 = conn
            .prepare("SELECT COUNT(*) FROM users WHERE email = ?1")?
            .query_row(duckdb::params![email], |row| row.get(0))?;
        if taken > 0 {
            return Ok(None);
        }

        let id = new_id();
        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, is_blocked, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, false, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
            duckdb::params![id, name, email, password_hash],
        )?;
        select_user(&conn, &id)
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().await;
        select_user(&conn, id)
    }

    /// Login lookup. The only read that returns the password hash.
    pub async fn find_user_credentials(&self, email: &str) -> Result<Option<UserCredentials>> {
        let conn = self.conn.lock().await;
        let result = conn
            .prepare(&format!(
                "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"
            ))?
            .query_row(duckdb::params![email], |row| {
                Ok(UserCredentials {
                    user: map_user(row)?,
                    password_hash: row.get(6)?,
                })
            });
        match result {
            Ok(c) => Ok(Some(c)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set or clear the block flag. Sites and popups are left alone.
    pub async fn set_user_blocked(&self, id: &str, blocked: bool) -> Result<Option<User>> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE users SET is_blocked = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            duckdb::params![blocked, id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        select_user(&conn, id)
    }
}
