use std::sync::Arc;

use anyhow::Result;
use tokio::sync::OnceCell;
use tracing::info;

use pushpop_core::config::Config;
use pushpop_duckdb::DuckDbBackend;

use crate::error::AppError;
use crate::push::{
    fcm::{FcmSender, ServiceAccount},
    PushSender,
};

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// The DuckDB backend. Internally uses `Arc<tokio::sync::Mutex<Connection>>`.
    pub db: Arc<DuckDbBackend>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// Outbound HTTP for site verification and the push provider. Carries
    /// the verification timeout.
    pub http: reqwest::Client,

    /// HS256 secret for session and wizard cookies.
    session_secret: String,

    /// Process-wide push client, built on first dispatch and reused.
    push: OnceCell<Arc<dyn PushSender>>,
}

impl AppState {
    /// Build the state, resolving the signing secret from config or the
    /// `settings` table.
    pub async fn new(db: DuckDbBackend, config: Config) -> Result<Self> {
        let session_secret = match config.session_secret.clone() {
            Some(secret) => secret,
            None => db.ensure_jwt_secret().await?,
        };
        let http = reqwest::Client::builder()
            .timeout(config.verify_timeout())
            .user_agent(concat!("pushpop/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            db: Arc::new(db),
            config: Arc::new(config),
            http,
            session_secret,
            push: OnceCell::new(),
        })
    }

    /// Replace the push client. Used by tests to capture dispatches.
    pub fn with_push_sender(mut self, sender: Arc<dyn PushSender>) -> Self {
        self.push = OnceCell::new_with(Some(sender));
        self
    }

    pub fn session_secret(&self) -> &str {
        &self.session_secret
    }

    /// The push client, initialised from `PUSHPOP_FCM_SERVICE_ACCOUNT` on
    /// first use. Missing or malformed config is reported as
    /// [`AppError::NotConfigured`] and retried on the next call.
    pub async fn push_sender(&self) -> Result<Arc<dyn PushSender>, AppError> {
        let sender = self
            .push
            .get_or_try_init(|| async {
                let raw = self.config.fcm_service_account.as_deref().ok_or_else(|| {
                    AppError::NotConfigured("Push provider is not configured".to_string())
                })?;
                let account = ServiceAccount::from_json(raw)
                    .map_err(|e| AppError::NotConfigured(format!("{e:#}")))?;
                let project_id = account.project_id.clone();
                let sender = FcmSender::new(account, self.http.clone())
                    .map_err(|e| AppError::NotConfigured(format!("{e:#}")))?;
                info!(project_id, "Push client initialized");
                Ok::<Arc<dyn PushSender>, AppError>(Arc::new(sender))
            })
            .await?;
        Ok(sender.clone())
    }
}
