mod common;

use chrono::{Duration, Utc};
use serde_json::{Value, json};
use smartlink::domain::entities::Link;
use smartlink::domain::repositories::ExperimentRepository;

async fn server_with_link() -> (common::TestContext, axum_test::TestServer) {
    let ctx = common::create_test_context();
    ctx.store
        .insert_link(Link::new(1, "launch", "https://example.com"))
        .await;
    common::issue_api_token(&ctx.store).await;
    let server = common::test_server(ctx.state.clone());
    (ctx, server)
}

fn two_variants() -> Value {
    json!({
        "name": "hero-copy",
        "variants": [
            { "name": "control", "url": "https://example.com/a", "weight": 50 },
            { "name": "bold", "url": "https://example.com/b", "weight": 50 },
        ],
    })
}

async fn start_test(server: &axum_test::TestServer) -> Value {
    let response = server
        .post("/api/links/launch/experiment")
        .authorization_bearer(common::API_TOKEN)
        .json(&two_variants())
        .await;
    assert_eq!(response.status_code(), 201);
    response.json::<Value>()
}

async fn days_running(server: &axum_test::TestServer) -> f64 {
    let response = server
        .get("/api/links/launch/experiment/stats")
        .authorization_bearer(common::API_TOKEN)
        .await;
    response.assert_status_ok();
    response.json::<Value>()["plan"]["days_running"]
        .as_f64()
        .unwrap()
}

#[tokio::test]
async fn test_create_experiment() {
    let (_ctx, server) = server_with_link().await;

    let test = start_test(&server).await;

    assert_eq!(test["name"], "hero-copy");
    assert_eq!(test["is_active"], true);
    assert_eq!(test["variants"].as_array().unwrap().len(), 2);
    assert_eq!(test["variants"][0]["clicks"], 0);
}

#[tokio::test]
async fn test_second_active_experiment_conflicts() {
    let (_ctx, server) = server_with_link().await;
    start_test(&server).await;

    let response = server
        .post("/api/links/launch/experiment")
        .authorization_bearer(common::API_TOKEN)
        .json(&two_variants())
        .await;

    assert_eq!(response.status_code(), 409);
}

#[tokio::test]
async fn test_single_variant_rejected() {
    let (_ctx, server) = server_with_link().await;

    let response = server
        .post("/api/links/launch/experiment")
        .authorization_bearer(common::API_TOKEN)
        .json(&json!({
            "name": "solo",
            "variants": [{ "name": "only", "url": "https://example.com/a", "weight": 100 }],
        }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_experiment_stats_report() {
    let (ctx, server) = server_with_link().await;
    let test = start_test(&server).await;
    let control = test["variants"][0]["id"].as_i64().unwrap();
    let bold = test["variants"][1]["id"].as_i64().unwrap();

    for _ in 0..100 {
        ctx.store.increment_clicks(control).await.unwrap();
        ctx.store.increment_clicks(bold).await.unwrap();
    }
    for _ in 0..5 {
        ctx.store.increment_conversions(control).await.unwrap();
    }
    for _ in 0..10 {
        ctx.store.increment_conversions(bold).await.unwrap();
    }

    let response = server
        .get("/api/links/launch/experiment/stats")
        .authorization_bearer(common::API_TOKEN)
        .await;

    response.assert_status_ok();
    let report = response.json::<Value>();
    assert_eq!(report["summary"]["total_clicks"], 200);
    assert_eq!(report["summary"]["total_conversions"], 15);
    let rate = |i: usize| report["summary"]["variants"][i]["conversion_rate"].as_f64().unwrap();
    assert!((rate(0) - 5.0).abs() < 1e-9);
    assert!((rate(1) - 10.0).abs() < 1e-9);
    assert!(report["summary"]["variants"][0].get("improvement").is_none());
    assert!(report["plan"]["required_clicks_per_variant"].is_u64());
}

#[tokio::test]
async fn test_stats_without_experiment() {
    let (_ctx, server) = server_with_link().await;

    let response = server
        .get("/api/links/launch/experiment/stats")
        .authorization_bearer(common::API_TOKEN)
        .await;

    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_variant_lifecycle() {
    let (_ctx, server) = server_with_link().await;
    let test = start_test(&server).await;
    let test_id = test["id"].as_i64().unwrap();
    let control = test["variants"][0]["id"].as_i64().unwrap();
    let bold = test["variants"][1]["id"].as_i64().unwrap();

    let response = server
        .post(&format!("/api/experiments/{test_id}/variants"))
        .authorization_bearer(common::API_TOKEN)
        .json(&json!({ "name": "minimal", "url": "https://example.com/c", "weight": 20 }))
        .await;
    assert_eq!(response.status_code(), 201);
    let added = response.json::<Value>()["id"].as_i64().unwrap();

    let response = server
        .patch(&format!("/api/variants/{bold}"))
        .authorization_bearer(common::API_TOKEN)
        .json(&json!({ "weight": 30 }))
        .await;
    response.assert_status_ok();
    let patched = response.json::<Value>();
    assert_eq!(patched["weight"], 30);
    assert_eq!(patched["name"], "bold");

    let response = server
        .delete(&format!("/api/variants/{added}"))
        .authorization_bearer(common::API_TOKEN)
        .await;
    assert_eq!(response.status_code(), 204);

    let response = server
        .delete(&format!("/api/variants/{control}"))
        .authorization_bearer(common::API_TOKEN)
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_reset_and_stop() {
    let (ctx, server) = server_with_link().await;
    let test = start_test(&server).await;
    let test_id = test["id"].as_i64().unwrap();
    let control = test["variants"][0]["id"].as_i64().unwrap();
    ctx.store.increment_clicks(control).await.unwrap();
    ctx.store.increment_conversions(control).await.unwrap();

    let response = server
        .post(&format!("/api/experiments/{test_id}/reset"))
        .authorization_bearer(common::API_TOKEN)
        .await;
    assert_eq!(response.status_code(), 204);

    let variant = ctx.store.find_variant(control).await.unwrap().unwrap();
    assert_eq!(variant.clicks, 0);
    assert_eq!(variant.conversions, 0);

    let response = server
        .post(&format!("/api/experiments/{test_id}/stop"))
        .authorization_bearer(common::API_TOKEN)
        .await;
    assert_eq!(response.status_code(), 204);

    let response = server
        .get("/api/links/launch/experiment/stats")
        .authorization_bearer(common::API_TOKEN)
        .await;
    assert_eq!(response.status_code(), 404);

    let response = server.get("/launch").await;
    assert_eq!(response.header("location"), "https://example.com");
}

#[tokio::test]
async fn test_reset_restarts_running_time() {
    let (ctx, server) = server_with_link().await;
    let test = start_test(&server).await;
    let test_id = test["id"].as_i64().unwrap();
    ctx.clock.set(Utc::now() + Duration::days(5));

    assert!(days_running(&server).await > 4.9);

    let response = server
        .post(&format!("/api/experiments/{test_id}/reset"))
        .authorization_bearer(common::API_TOKEN)
        .await;
    assert_eq!(response.status_code(), 204);

    assert_eq!(days_running(&server).await, 0.0);
}

#[tokio::test]
async fn test_unknown_experiment_actions() {
    let (_ctx, server) = server_with_link().await;

    let response = server
        .post("/api/experiments/404/reset")
        .authorization_bearer(common::API_TOKEN)
        .await;
    assert_eq!(response.status_code(), 404);

    let response = server
        .patch("/api/variants/404")
        .authorization_bearer(common::API_TOKEN)
        .json(&json!({ "weight": 10 }))
        .await;
    assert_eq!(response.status_code(), 404);
}
