mod common;

use serde_json::json;
use smartlink::domain::entities::Link;

async fn server_with_link() -> (common::TestContext, axum_test::TestServer) {
    let ctx = common::create_test_context();
    ctx.store
        .insert_link(Link::new(1, "promo", "https://example.com"))
        .await;
    common::issue_api_token(&ctx.store).await;
    let server = common::test_server(ctx.state.clone());
    (ctx, server)
}

#[tokio::test]
async fn test_targets_require_token() {
    let (_ctx, server) = server_with_link().await;

    let response = server.get("/api/links/promo/targets").await;

    assert_eq!(response.status_code(), 401);
    assert_eq!(response.header("www-authenticate"), "Bearer");

    let response = server
        .get("/api/links/promo/targets")
        .authorization_bearer("wrong-token")
        .await;

    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_create_list_delete_target() {
    let (_ctx, server) = server_with_link().await;

    let response = server
        .post("/api/links/promo/targets")
        .authorization_bearer(common::API_TOKEN)
        .json(&json!({
            "type": "COUNTRY",
            "value": " DE ",
            "target_url": "https://example.de",
            "priority": 5,
        }))
        .await;

    assert_eq!(response.status_code(), 201);
    let created = response.json::<serde_json::Value>();
    assert_eq!(created["value"], "de");
    assert_eq!(created["target_type"], "COUNTRY");
    let id = created["id"].as_i64().unwrap();

    server
        .post("/api/links/promo/targets")
        .authorization_bearer(common::API_TOKEN)
        .json(&json!({
            "type": "DEVICE",
            "value": "mobile",
            "target_url": "https://m.example.com",
            "priority": 10,
        }))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = server
        .get("/api/links/promo/targets")
        .authorization_bearer(common::API_TOKEN)
        .await;
    response.assert_status_ok();
    let listed = response.json::<Vec<serde_json::Value>>();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["value"], "mobile");

    let response = server
        .delete(&format!("/api/targets/{id}"))
        .authorization_bearer(common::API_TOKEN)
        .await;
    assert_eq!(response.status_code(), 204);

    let response = server
        .delete(&format!("/api/targets/{id}"))
        .authorization_bearer(common::API_TOKEN)
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_duplicate_target_conflicts() {
    let (_ctx, server) = server_with_link().await;
    let body = json!({
        "type": "OS",
        "value": "ios",
        "target_url": "https://apps.apple.com/app",
    });

    server
        .post("/api/links/promo/targets")
        .authorization_bearer(common::API_TOKEN)
        .json(&body)
        .await;
    let response = server
        .post("/api/links/promo/targets")
        .authorization_bearer(common::API_TOKEN)
        .json(&body)
        .await;

    assert_eq!(response.status_code(), 409);
}

#[tokio::test]
async fn test_invalid_target_rejected() {
    let (_ctx, server) = server_with_link().await;

    let response = server
        .post("/api/links/promo/targets")
        .authorization_bearer(common::API_TOKEN)
        .json(&json!({
            "type": "OS",
            "value": "ios",
            "target_url": "not-a-url",
        }))
        .await;

    assert_eq!(response.status_code(), 400);
    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_targets_for_unknown_link() {
    let (_ctx, server) = server_with_link().await;

    let response = server
        .get("/api/links/missing/targets")
        .authorization_bearer(common::API_TOKEN)
        .await;

    assert_eq!(response.status_code(), 404);
}
