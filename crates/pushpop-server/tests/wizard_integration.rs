mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{
    cookie_from, create_popup, create_site, get_request, json_body, json_request, register,
    register_and_login, send, setup, setup_with, test_config, WIZARD_EMAIL, WIZARD_PASSWORD,
};

async fn wizard_login(app: &axum::Router) -> String {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/wizard/auth",
            json!({ "email": WIZARD_EMAIL, "password": WIZARD_PASSWORD }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("cookie")
        .to_string();
    assert!(set_cookie.contains("Max-Age=86400"));
    cookie_from(&response)
}

#[tokio::test]
async fn test_wizard_auth_rejects_wrong_credentials() {
    let (_state, app) = setup().await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/wizard/auth",
            json!({ "email": WIZARD_EMAIL, "password": "guess" }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wizard_auth_unconfigured_is_server_error() {
    let mut config = test_config();
    config.wizard = None;
    let (_state, app) = setup_with(config, None).await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/wizard/auth",
            json!({ "email": WIZARD_EMAIL, "password": WIZARD_PASSWORD }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await["error"],
        "Wizard credentials not configured"
    );
}

#[tokio::test]
async fn test_wizard_stats_counts_everything() {
    let (_state, app) = setup().await;
    let cookie = register_and_login(&app, "owner@example.com").await;
    register(&app, "idle@example.com").await;
    let site_id = create_site(&app, &cookie, "shop.example.com").await;
    let popup = create_popup(&app, &cookie, &site_id, json!({})).await;
    send(
        &app,
        json_request(
            "POST",
            "/api/leads",
            json!({ "siteId": site_id, "popupId": popup["id"], "email": "jane@example.com" }),
            None,
        ),
    )
    .await;

    let wizard = wizard_login(&app).await;
    let response = send(&app, get_request("/api/wizard/stats", Some(&wizard))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["global"]["totalUsers"], 2);
    assert_eq!(body["global"]["totalSites"], 1);
    assert_eq!(body["global"]["totalPopups"], 1);
    assert_eq!(body["global"]["totalLeads"], 1);
    // The lead's conversion event.
    assert_eq!(body["global"]["totalEvents"], 1);

    let users = body["users"].as_array().expect("array");
    let owner = users
        .iter()
        .find(|u| u["email"] == "owner@example.com")
        .expect("owner listed");
    assert_eq!(owner["stats"], json!({ "sites": 1, "popups": 1, "leads": 1 }));
    assert!(owner.get("passwordHash").is_none());

    let response = send(&app, get_request("/api/wizard/stats", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_block_and_unblock_user() {
    let (_state, app) = setup().await;
    let user = register(&app, "owner@example.com").await;
    let user_id = user["id"].as_str().expect("id");
    let wizard = wizard_login(&app).await;

    let response = send(
        &app,
        json_request(
            "PUT",
            "/api/wizard/users",
            json!({ "userId": user_id, "action": "block" }),
            Some(&wizard),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["isBlocked"], true);

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "owner@example.com", "password": common::TEST_PASSWORD }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        json_request(
            "PUT",
            "/api/wizard/users",
            json!({ "userId": user_id, "action": "unblock" }),
            Some(&wizard),
        ),
    )
    .await;
    assert_eq!(json_body(response).await["data"]["isBlocked"], false);
}

#[tokio::test]
async fn test_update_user_validates_input() {
    let (_state, app) = setup().await;
    let wizard = wizard_login(&app).await;

    let response = send(
        &app,
        json_request(
            "PUT",
            "/api/wizard/users",
            json!({ "userId": "someone", "action": "delete" }),
            Some(&wizard),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        json_request(
            "PUT",
            "/api/wizard/users",
            json!({ "userId": "missing", "action": "block" }),
            Some(&wizard),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wizard_logout_clears_cookie() {
    let (_state, app) = setup().await;
    let wizard = wizard_login(&app).await;

    let response = send(
        &app,
        json_request("POST", "/api/wizard/logout", json!({}), Some(&wizard)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("cookie")
        .to_string();
    assert!(set_cookie.starts_with("wizard_token=;"));
}
