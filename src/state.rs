//! Shared application state injected into every handler.

use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::services::{
    AuthService, ExperimentService, RandomSource, RedirectResolver, StatsSettings, TargetMatcher,
    TargetService, VariantSelector,
};
use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::{
    ExperimentRepository, LinkRepository, TargetRepository, TokenRepository,
};
use crate::infrastructure::cache::CacheService;
use crate::utils::clock::Clock;

/// Repositories the services are built from.
#[derive(Clone)]
pub struct Repositories {
    pub links: Arc<dyn LinkRepository>,
    pub targets: Arc<dyn TargetRepository>,
    pub experiments: Arc<dyn ExperimentRepository>,
    pub tokens: Arc<dyn TokenRepository>,
}

/// Cloned into every request; all fields are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<RedirectResolver>,
    pub target_service: Arc<TargetService>,
    pub experiment_service: Arc<ExperimentService>,
    pub auth_service: Arc<AuthService>,
    pub cache: Arc<dyn CacheService>,
    pub click_sender: mpsc::Sender<ClickEvent>,
    /// `None` when running on the in-memory store.
    pub database: Option<Arc<PgPool>>,
}

/// Wiring options that differ between production and tests.
pub struct StateOptions {
    pub token_signing_secret: String,
    pub stats: StatsSettings,
    pub clock: Arc<dyn Clock>,
    pub random: Arc<dyn RandomSource>,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        cache: Arc<dyn CacheService>,
        click_sender: mpsc::Sender<ClickEvent>,
        database: Option<Arc<PgPool>>,
        options: StateOptions,
    ) -> Self {
        let resolver = RedirectResolver::new(
            repos.links.clone(),
            cache.clone(),
            TargetMatcher::new(repos.targets.clone()),
            VariantSelector::new(repos.experiments.clone(), options.random),
            options.clock.clone(),
            click_sender.clone(),
        );

        let target_service = TargetService::new(repos.links.clone(), repos.targets);
        let experiment_service = ExperimentService::new(
            repos.links,
            repos.experiments,
            options.clock,
            options.stats,
        );
        let auth_service = AuthService::new(repos.tokens, options.token_signing_secret);

        Self {
            resolver: Arc::new(resolver),
            target_service: Arc::new(target_service),
            experiment_service: Arc::new(experiment_service),
            auth_service: Arc::new(auth_service),
            cache,
            click_sender,
            database,
        }
    }
}
