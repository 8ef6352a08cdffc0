use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth, routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Everything except `/health` lives under `/api`. Dashboard handlers take a
/// [`SessionUser`](crate::auth::session::SessionUser) and wizard handlers a
/// [`WizardSession`](crate::auth::session::WizardSession); the public
/// endpoints (embed, events, leads and subscriber POSTs, register, logins)
/// take neither.
///
/// Middleware, outermost first:
///
/// 1. `TraceLayer`: request/response logging via `tracing`.
/// 2. `CorsLayer`: fully open, since the embed script and service worker
///    call in from customer origins.
pub fn build_app(state: Arc<AppState>) -> Router {
    let api = Router::new()
        // Sessions
        .route("/auth/login", post(auth::handlers::auth_login))
        .route("/auth/logout", post(auth::handlers::auth_logout))
        .route("/auth/session", get(auth::handlers::auth_session))
        .route("/register", post(routes::register::register))
        // Embed script
        .route("/embed/{site_id}", get(routes::embed::embed_site))
        .route("/embed/popup/{id}", get(routes::embed::embed_popup))
        .route(
            "/events",
            get(routes::events::list_events).post(routes::events::track_event),
        )
        .route(
            "/leads",
            get(routes::leads::list_leads)
                .post(routes::leads::submit_lead)
                .delete(routes::leads::delete_leads),
        )
        .route("/leads/export", get(routes::leads::export_leads))
        .route(
            "/subscribers",
            post(routes::subscribers::subscribe).delete(routes::subscribers::unsubscribe),
        )
        // Dashboard
        .route(
            "/sites",
            get(routes::sites::list_sites).post(routes::sites::create_site),
        )
        .route(
            "/sites/{id}",
            get(routes::sites::get_site).delete(routes::sites::delete_site),
        )
        .route("/sites/{id}/verify-popup", post(routes::sites::verify_popup))
        .route("/sites/{id}/verify-push", post(routes::sites::verify_push))
        .route(
            "/popups",
            get(routes::popups::list_popups).post(routes::popups::create_popup),
        )
        .route("/popups/stats", get(routes::popups::popup_stats))
        .route(
            "/popups/site/{site_id}",
            get(routes::popups::list_site_popups),
        )
        .route(
            "/popups/{id}",
            get(routes::popups::get_popup)
                .put(routes::popups::update_popup)
                .delete(routes::popups::delete_popup),
        )
        .route(
            "/notifications",
            get(routes::notifications::list_campaigns)
                .post(routes::notifications::create_campaign),
        )
        .route(
            "/notifications/{id}",
            get(routes::notifications::get_campaign)
                .delete(routes::notifications::delete_campaign),
        )
        .route(
            "/notifications/{id}/send",
            post(routes::notifications::send_campaign),
        )
        // Wizard console
        .route("/wizard/auth", post(routes::wizard::wizard_auth))
        .route("/wizard/logout", post(routes::wizard::wizard_logout))
        .route("/wizard/stats", get(routes::wizard::wizard_stats))
        .route("/wizard/users", put(routes::wizard::update_user));

    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
