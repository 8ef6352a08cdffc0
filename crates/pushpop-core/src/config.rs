use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub duckdb_memory_limit: String,
    /// Adds `Secure` to the session and wizard cookies.
    pub https: bool,
    pub session_days: u32,
    /// HS256 secret for session and wizard tokens. When `None` a random
    /// secret is generated once and persisted in the `settings` table.
    pub session_secret: Option<String>,
    pub argon2_memory_kb: u32,
    pub public_url: String,
    pub wizard: Option<WizardCredentials>,
    /// Raw service-account JSON for the push provider.
    pub fcm_service_account: Option<String>,
    pub verify_timeout_secs: u64,
}

/// Super-admin login, read from `PUSHPOP_WIZARD_EMAIL` / `PUSHPOP_WIZARD_PASSWORD`.
#[derive(Clone, PartialEq)]
pub struct WizardCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for WizardCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("PUSHPOP_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("PUSHPOP_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            duckdb_memory_limit: std::env::var("PUSHPOP_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
            https: std::env::var("PUSHPOP_HTTPS")
                .map(|v| v == "true")
                .unwrap_or(true),
            session_days: std::env::var("PUSHPOP_SESSION_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .unwrap_or(7),
            session_secret: std::env::var("PUSHPOP_SESSION_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            argon2_memory_kb: std::env::var("PUSHPOP_ARGON2_MEMORY_KB")
                .unwrap_or_else(|_| "65536".to_string())
                .parse()
                .unwrap_or(65536),
            public_url: std::env::var("PUSHPOP_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            wizard: match (
                std::env::var("PUSHPOP_WIZARD_EMAIL"),
                std::env::var("PUSHPOP_WIZARD_PASSWORD"),
            ) {
                (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                    Some(WizardCredentials { email, password })
                }
                _ => None,
            },
            fcm_service_account: std::env::var("PUSHPOP_FCM_SERVICE_ACCOUNT")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            verify_timeout_secs: std::env::var("PUSHPOP_VERIFY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
        })
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_secs)
    }
}
