mod common;

use axum::{http::StatusCode, routing::get, Router};
use serde_json::{json, Value};

use common::{create_site, get_request, json_body, json_request, register_and_login, send, setup};
use pushpop_server::verify::MAX_FETCH_BYTES;

/// Serve a fake customer site on an ephemeral port and return its base URL.
async fn spawn_customer_site(home: &'static str, worker: Option<&'static str>) -> String {
    let mut router = Router::new().route("/", get(move || async move { home }));
    if let Some(worker) = worker {
        router = router.route(
            "/firebase-messaging-sw.js",
            get(move || async move { worker }),
        );
    }
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{addr}")
}

async fn verify(app: &axum::Router, cookie: &str, site_id: &str, kind: &str) -> (StatusCode, Value) {
    let response = send(
        app,
        json_request(
            "POST",
            &format!("/api/sites/{site_id}/verify-{kind}"),
            json!({}),
            Some(cookie),
        ),
    )
    .await;
    let status = response.status();
    (status, json_body(response).await)
}

async fn site_flags(app: &axum::Router, cookie: &str, site_id: &str) -> (Value, Value) {
    let response = send(app, get_request(&format!("/api/sites/{site_id}"), Some(cookie))).await;
    let body = json_body(response).await;
    (
        body["data"]["isPopupVerified"].clone(),
        body["data"]["isPushVerified"].clone(),
    )
}

#[tokio::test]
async fn test_popup_verification_requires_matching_snippet() {
    let (_state, app) = setup().await;
    let cookie = register_and_login(&app, "owner@example.com").await;

    let base = spawn_customer_site(
        r#"<html><script src="/popup.js" data-site-id="site_other"></script></html>"#,
        None,
    )
    .await;
    let site_id = create_site(&app, &cookie, &base).await;

    let (status, body) = verify(&app, &cookie, &site_id, "popup").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "Embed script not found on the page. Please check the installation."
    );
    assert_eq!(site_flags(&app, &cookie, &site_id).await.0, false);
}

#[tokio::test]
async fn test_push_verification_sets_flag() {
    let (_state, app) = setup().await;
    let cookie = register_and_login(&app, "owner@example.com").await;

    let base = spawn_customer_site(
        "<html></html>",
        Some("importScripts('firebase.js'); firebase.initializeApp({ projectId: 'x' });"),
    )
    .await;
    let site_id = create_site(&app, &cookie, &base).await;

    let (status, body) = verify(&app, &cookie, &site_id, "push").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Setup verified successfully!");

    let (popup, push) = site_flags(&app, &cookie, &site_id).await;
    assert_eq!(popup, false);
    assert_eq!(push, true);
}

#[tokio::test]
async fn test_missing_worker_reports_status() {
    let (_state, app) = setup().await;
    let cookie = register_and_login(&app, "owner@example.com").await;

    let base = spawn_customer_site("<html></html>", None).await;
    let site_id = create_site(&app, &cookie, &base).await;

    let (status, body) = verify(&app, &cookie, &site_id, "push").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        format!("Could not reach {base}/firebase-messaging-sw.js. Status: 404")
    );
}

#[tokio::test]
async fn test_verification_of_foreign_site_is_not_found() {
    let (_state, app) = setup().await;
    let owner = register_and_login(&app, "owner@example.com").await;
    let stranger = register_and_login(&app, "stranger@example.com").await;
    let site_id = create_site(&app, &owner, "shop.example.com").await;

    let (status, _) = verify(&app, &stranger, &site_id, "popup").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_popup_verification_sets_flag() {
    let (_state, app) = setup().await;
    let cookie = register_and_login(&app, "owner@example.com").await;

    // The page must carry the site id, which only exists once the site does.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    let site_id = create_site(&app, &cookie, &base).await;
    let page = format!(
        r#"<html><body><script src="https://cdn.example/popup.js" data-site-id="{site_id}"></script></body></html>"#
    );
    let router = Router::new().route("/", get(move || async move { page }));
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    let (status, body) = verify(&app, &cookie, &site_id, "popup").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Popup setup verified successfully!");
    assert_eq!(site_flags(&app, &cookie, &site_id).await.0, true);
}

#[tokio::test]
async fn test_popup_verification_reads_only_the_page_head() {
    let (_state, app) = setup().await;
    let cookie = register_and_login(&app, "owner@example.com").await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    let site_id = create_site(&app, &cookie, &base).await;
    // Snippet placed after more than the readable prefix of the page.
    let page = format!(
        r#"<html><body>{}<script src="/popup.js" data-site-id="{site_id}"></script></body></html>"#,
        "x".repeat(MAX_FETCH_BYTES + 1024)
    );
    let router = Router::new().route("/", get(move || async move { page }));
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    let (status, body) = verify(&app, &cookie, &site_id, "popup").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "Embed script not found on the page. Please check the installation."
    );
}
