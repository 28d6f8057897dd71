#![allow(dead_code)]

use axum::extract::ConnectInfo;
use axum::routing::{get, post};
use axum::{Router, middleware};
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::Layer;

use smartlink::api;
use smartlink::api::handlers::{
    convert_handler, health_handler, password_submit_handler, redirect_handler,
};
use smartlink::api::middleware::auth;
use smartlink::application::services::{SeededRandom, StatsSettings, hash_token};
use smartlink::domain::click_event::ClickEvent;
use smartlink::domain::repositories::TokenRepository;
use smartlink::infrastructure::cache::NullCache;
use smartlink::infrastructure::persistence::MemoryStore;
use smartlink::state::{AppState, Repositories, StateOptions};
use smartlink::utils::clock::ManualClock;

pub const SIGNING_SECRET: &str = "test-signing-secret";
pub const API_TOKEN: &str = "integration-test-token";

#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}

/// Application state over an in-memory store, plus handles to inspect it.
pub struct TestContext {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub clicks: mpsc::Receiver<ClickEvent>,
}

pub fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub fn create_test_context() -> TestContext {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(fixed_now()));
    let (tx, rx) = mpsc::channel(100);

    let repos = Repositories {
        links: store.clone(),
        targets: store.clone(),
        experiments: store.clone(),
        tokens: store.clone(),
    };

    let state = AppState::new(
        repos,
        Arc::new(NullCache),
        tx,
        None,
        StateOptions {
            token_signing_secret: SIGNING_SECRET.to_string(),
            stats: StatsSettings::default(),
            clock: clock.clone(),
            random: Arc::new(SeededRandom::new(42)),
        },
    );

    TestContext {
        state,
        store,
        clock,
        clicks: rx,
    }
}

/// Stores a valid token for [`API_TOKEN`].
pub async fn issue_api_token(store: &MemoryStore) {
    store
        .create_token("integration", &hash_token(SIGNING_SECRET, API_TOKEN))
        .await
        .unwrap();
}

/// Every route of the service, without rate limiting.
pub fn test_router(state: AppState) -> Router {
    let api_router = api::routes::protected_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer));

    Router::new()
        .route("/{code}", get(redirect_handler).post(password_submit_handler))
        .route("/convert/{variant_id}", post(convert_handler))
        .route("/health", get(health_handler))
        .nest("/api", api_router)
        .layer(MockConnectInfoLayer)
        .with_state(state)
}

pub fn test_server(state: AppState) -> TestServer {
    TestServer::new(test_router(state)).unwrap()
}

/// Inserts a link row directly and returns its id.
pub async fn insert_pg_link(pool: &sqlx::PgPool, short_code: &str, alias: Option<&str>) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO links (short_code, custom_alias, original_url) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(short_code)
    .bind(alias)
    .bind(format!("https://example.com/{short_code}"))
    .fetch_one(pool)
    .await
    .unwrap()
}
