use anyhow::Result;

use crate::backend::rand_hex;
use crate::DuckDbBackend;

const JWT_SECRET_KEY: &str = "jwt_secret";

impl DuckDbBackend {
    /// Return the persisted signing secret, generating one on first use.
    ///
    /// Used when `PUSHPOP_SESSION_SECRET` is unset so that sessions survive
    /// restarts of a self-hosted instance.
    pub async fn ensure_jwt_secret(&self) -> Result<String> {
        let conn = self.conn.lock().await;
        let candidate = rand_hex(32);
        // First writer wins; later callers read the stored value back.
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
            duckdb::params![JWT_SECRET_KEY, candidate],
        )?;
        let secret: String = conn
            .prepare("SELECT value FROM settings WHERE key = ?1")?
            .query_row(duckdb::params![JWT_SECRET_KEY], |row| row.get(0))?;
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn jwt_secret_is_stable() {
        let db = DuckDbBackend::open_in_memory().expect("db");
        let first = db.ensure_jwt_secret().await.expect("secret");
        let second = db.ensure_jwt_secret().await.expect("secret");
        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
    }
}
