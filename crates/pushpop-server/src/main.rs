use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use pushpop_core::config::Config;
use pushpop_duckdb::DuckDbBackend;
use pushpop_server::state::AppState;

/// `pushpop health`: liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$PUSHPOP_PORT/health` and exits 0 on HTTP 200,
/// 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("PUSHPOP_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Structured JSON logs; RUST_LOG overrides the default level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pushpop=info".parse()?)
                .add_directive("pushpop_server=info".parse()?)
                .add_directive("pushpop_duckdb=info".parse()?),
        )
        .json()
        .init();

    let cfg = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/pushpop.db", cfg.data_dir);
    let db = DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;

    if cfg.wizard.is_none() {
        info!("Wizard console disabled (PUSHPOP_WIZARD_EMAIL / PUSHPOP_WIZARD_PASSWORD unset)");
    }
    if cfg.fcm_service_account.is_none() {
        tracing::warn!(
            "PUSHPOP_FCM_SERVICE_ACCOUNT is not set. Campaign sends will fail until it is configured."
        );
    }
    if !cfg.https {
        tracing::warn!("PUSHPOP_HTTPS=false: session cookies are sent without the Secure flag");
    }

    let state = Arc::new(AppState::new(db, cfg.clone()).await?);

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = pushpop_server::app::build_app(Arc::clone(&state));

    info!(
        port = cfg.port,
        public_url = %cfg.public_url,
        "PushPop listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    info!("Shut down cleanly");
    Ok(())
}
