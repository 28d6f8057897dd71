//! The redirect decision pipeline.
//!
//! For one visit the resolver walks these steps in order and stops at the first
//! terminal outcome:
//!
//! 1. Load the link by short code or alias (cache first, then storage)
//! 2. Lifecycle: inactive or expired links end in `Expired`
//! 3. Password gate
//! 4. Destination: targeting rule, else A/B variant, else the original URL
//! 5. Cloaking page if configured
//! 6. Click tracking (queued, never blocks the decision)
//!
//! Only a storage failure while loading the link produces an `Internal` error;
//! failures in later steps fall back to the next source of destination.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

use crate::application::services::cloaking::{CLOAKED_CONTENT_TYPE, render_cloaked};
use crate::application::services::{TargetMatcher, VariantSelector};
use crate::domain::attributes::{RequestHeaders, detect};
use crate::domain::click_event::ClickEvent;
use crate::domain::decision::{Decision, ResolveErrorKind};
use crate::domain::entities::Link;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::utils::clock::Clock;
use crate::utils::password::verify_password;

/// Everything the resolver needs to know about one visit.
#[derive(Debug, Clone, Default)]
pub struct Visit {
    pub code: String,
    pub user_agent: Option<String>,
    pub headers: RequestHeaders,
    pub password: Option<String>,
    pub ip: Option<String>,
    pub referrer: Option<String>,
}

impl Visit {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }
}

pub struct RedirectResolver {
    links: Arc<dyn LinkRepository>,
    cache: Arc<dyn CacheService>,
    targets: TargetMatcher,
    variants: VariantSelector,
    clock: Arc<dyn Clock>,
    click_tx: mpsc::Sender<ClickEvent>,
}

impl RedirectResolver {
    pub fn new(
        links: Arc<dyn LinkRepository>,
        cache: Arc<dyn CacheService>,
        targets: TargetMatcher,
        variants: VariantSelector,
        clock: Arc<dyn Clock>,
        click_tx: mpsc::Sender<ClickEvent>,
    ) -> Self {
        Self {
            links,
            cache,
            targets,
            variants,
            clock,
            click_tx,
        }
    }

    /// Resolves a visit to exactly one [`Decision`].
    pub async fn resolve(&self, visit: &Visit) -> Decision {
        let decision = self.decide(visit).await;
        metrics::counter!("redirect_decisions_total", "decision" => decision.label()).increment(1);
        decision
    }

    async fn decide(&self, visit: &Visit) -> Decision {
        let link = match self.load(&visit.code).await {
            Ok(Some(link)) => link,
            Ok(None) => return Decision::error(ResolveErrorKind::NotFound),
            Err(e) => {
                error!(code = %visit.code, step = "load", error = %e, "Failed to load link");
                return Decision::error(ResolveErrorKind::Internal);
            }
        };

        if !link.is_resolvable_at(self.clock.now()) {
            debug!(link_id = link.id, "Link is inactive or expired");
            return Decision::error(ResolveErrorKind::Expired);
        }

        if link.is_password_protected() && !self.password_accepted(&link, visit).await {
            return Decision::PasswordRequired;
        }

        let (destination, variant_id) = self.destination(&link, visit).await;

        let decision = match &link.cloaking {
            Some(config) => match render_cloaked(config, &destination) {
                Ok(html) => Decision::Cloaked {
                    html,
                    content_type: CLOAKED_CONTENT_TYPE.to_string(),
                },
                Err(e) => {
                    warn!(link_id = link.id, step = "cloaking", error = %e, "Falling back to plain redirect");
                    Decision::Redirect { url: destination }
                }
            },
            None => Decision::Redirect { url: destination },
        };

        self.track(&link, variant_id, visit);

        decision
    }

    /// Cache, then storage. Cache failures count as a miss; only storage errors
    /// are returned.
    async fn load(&self, code: &str) -> Result<Option<Link>, AppError> {
        match self.cache.get_link(code).await {
            Ok(Some(link)) => return Ok(Some(link)),
            Ok(None) => {}
            Err(e) => warn!(code, error = %e, "Cache lookup failed"),
        }

        let link = self.links.find_by_code_or_alias(code).await?;

        // Cached entries carry no password hash, so a protected link must
        // always come from storage.
        if let Some(link) = link.as_ref().filter(|l| !l.is_password_protected()) {
            let cache = self.cache.clone();
            let code = code.to_string();
            let link = link.clone();
            tokio::spawn(async move {
                if let Err(e) = cache.set_link(&code, &link, None).await {
                    warn!(code, error = %e, "Failed to cache link");
                }
            });
        }

        Ok(link)
    }

    async fn password_accepted(&self, link: &Link, visit: &Visit) -> bool {
        let (Some(supplied), Some(stored)) = (visit.password.clone(), link.password_hash.clone())
        else {
            return false;
        };

        // Argon2 verification is CPU bound.
        match tokio::task::spawn_blocking(move || verify_password(&supplied, &stored)).await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(link_id = link.id, step = "password", error = %e, "Password check aborted");
                false
            }
        }
    }

    /// Targeting wins over experiments; a variant is only drawn (and counted)
    /// when no rule matched.
    async fn destination(&self, link: &Link, visit: &Visit) -> (String, Option<i64>) {
        let attributes = detect(visit.user_agent.as_deref(), &visit.headers);

        if let Some(url) = self.targets.match_target(link.id, &attributes).await {
            debug!(link_id = link.id, "Targeting rule matched");
            return (url, None);
        }

        if let Some(variant) = self.variants.select_and_track(link.id).await {
            debug!(link_id = link.id, variant_id = variant.id, "A/B variant selected");
            return (variant.url, Some(variant.id));
        }

        (link.original_url.clone(), None)
    }

    fn track(&self, link: &Link, variant_id: Option<i64>, visit: &Visit) {
        let event = ClickEvent::new(link.id, self.clock.now())
            .with_variant(variant_id)
            .with_client(
                visit.ip.clone(),
                visit.user_agent.as_deref(),
                visit.referrer.as_deref(),
            );

        match self.click_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                metrics::counter!("click_events_dropped_total").increment(1);
                debug!(link_id = link.id, "Click queue full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(link_id = link.id, "Click queue closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::variant_selector::RandomSource;
    use crate::domain::entities::{AbTest, AbVariant, CloakType, CloakingConfig, LinkTarget, TargetType};
    use crate::domain::repositories::{
        MockExperimentRepository, MockLinkRepository, MockTargetRepository,
    };
    use crate::error::AppError;
    use crate::infrastructure::cache::{CacheResult, NullCache};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use crate::utils::clock::ManualClock;
    use crate::utils::password::hash_password;
    use chrono::{Duration, Utc};
    use serde_json::json;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

    struct FirstVariant;

    impl RandomSource for FirstVariant {
        fn next_below(&self, _upper: u64) -> u64 {
            0
        }
    }

    /// Remembers which codes were written.
    #[derive(Default)]
    struct RecordingCache {
        written: Mutex<Vec<String>>,
    }

    impl RecordingCache {
        fn written(&self) -> Vec<String> {
            self.written.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CacheService for RecordingCache {
        async fn get_link(&self, _code: &str) -> CacheResult<Option<Link>> {
            Ok(None)
        }

        async fn set_link(&self, code: &str, _link: &Link, _ttl: Option<u64>) -> CacheResult<()> {
            self.written.lock().unwrap().push(code.to_string());
            Ok(())
        }

        async fn invalidate(&self, _code: &str) -> CacheResult<()> {
            Ok(())
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    struct Harness {
        links: MockLinkRepository,
        targets: MockTargetRepository,
        experiments: MockExperimentRepository,
        cache: Arc<dyn CacheService>,
        clock: Arc<ManualClock>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                links: MockLinkRepository::new(),
                targets: MockTargetRepository::new(),
                experiments: MockExperimentRepository::new(),
                cache: Arc::new(NullCache::new()),
                clock: Arc::new(ManualClock::new(Utc::now())),
            }
        }

        fn with_cache(mut self, cache: Arc<dyn CacheService>) -> Self {
            self.cache = cache;
            self
        }

        fn with_link(mut self, link: Link) -> Self {
            self.links
                .expect_find_by_code_or_alias()
                .returning(move |_| Ok(Some(link.clone())));
            self
        }

        fn without_overrides(mut self) -> Self {
            self.targets.expect_list_active().returning(|_| Ok(vec![]));
            self.experiments
                .expect_find_active_for_link()
                .returning(|_| Ok(None));
            self
        }

        fn build(self) -> (RedirectResolver, mpsc::Receiver<ClickEvent>) {
            let (tx, rx) = mpsc::channel(16);
            (self.build_with_queue(tx), rx)
        }

        fn build_with_queue(self, tx: mpsc::Sender<ClickEvent>) -> RedirectResolver {
            RedirectResolver::new(
                Arc::new(self.links),
                self.cache,
                TargetMatcher::new(Arc::new(self.targets)),
                VariantSelector::new(Arc::new(self.experiments), Arc::new(FirstVariant)),
                self.clock,
                tx,
            )
        }
    }

    fn link() -> Link {
        Link::new(1, "promo", "https://example.com/original")
    }

    fn ab_test() -> AbTest {
        let variant = |id: i64| AbVariant {
            id,
            test_id: 1,
            name: format!("v{id}"),
            url: format!("https://example.com/v{id}"),
            weight: 50,
            clicks: 0,
            conversions: 0,
            created_at: Utc::now(),
        };
        AbTest {
            id: 1,
            link_id: 1,
            name: "hero".to_string(),
            is_active: true,
            created_at: Utc::now(),
            started_at: Utc::now(),
            variants: vec![variant(11), variant(12)],
        }
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let mut harness = Harness::new();
        harness
            .links
            .expect_find_by_code_or_alias()
            .returning(|_| Ok(None));
        let (resolver, mut rx) = harness.build();

        let decision = resolver.resolve(&Visit::new("nope")).await;

        assert_eq!(decision, Decision::error(ResolveErrorKind::NotFound));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_storage_failure_is_internal() {
        let mut harness = Harness::new();
        harness
            .links
            .expect_find_by_code_or_alias()
            .returning(|_| Err(AppError::internal("Database error", json!({}))));
        let (resolver, _rx) = harness.build();

        let decision = resolver.resolve(&Visit::new("promo")).await;

        assert_eq!(decision, Decision::error(ResolveErrorKind::Internal));
    }

    #[tokio::test]
    async fn test_only_unprotected_links_are_cached() {
        let cache = Arc::new(RecordingCache::default());
        let hash = hash_password("s3cret").unwrap();
        let mut harness = Harness::new().with_cache(cache.clone());
        harness
            .links
            .expect_find_by_code_or_alias()
            .returning(move |code| {
                let link = Link::new(1, code, "https://example.com/original");
                Ok(Some(if code == "locked" {
                    link.with_password_hash(hash.clone())
                } else {
                    link
                }))
            });
        let (resolver, _rx) = harness.without_overrides().build();

        assert_eq!(
            resolver.resolve(&Visit::new("locked")).await,
            Decision::PasswordRequired
        );
        resolver.resolve(&Visit::new("promo")).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        assert_eq!(cache.written(), vec!["promo".to_string()]);
    }

    #[tokio::test]
    async fn test_plain_redirect_tracks_click() {
        let (resolver, mut rx) = Harness::new().with_link(link()).without_overrides().build();

        let mut visit = Visit::new("promo");
        visit.ip = Some("203.0.113.9".to_string());
        visit.referrer = Some("https://news.example".to_string());
        let decision = resolver.resolve(&visit).await;

        assert_eq!(
            decision,
            Decision::Redirect {
                url: "https://example.com/original".to_string()
            }
        );
        let event = rx.try_recv().unwrap();
        assert_eq!(event.link_id, 1);
        assert_eq!(event.variant_id, None);
        assert_eq!(event.ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(event.referrer.as_deref(), Some("https://news.example"));
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let harness = Harness::new();
        let now = harness.clock.now();
        let clock = harness.clock.clone();
        let expiring = link().with_expiry(now + Duration::seconds(10));
        let (resolver, _rx) = harness.with_link(expiring).without_overrides().build();

        clock.set(now + Duration::seconds(9));
        assert!(matches!(
            resolver.resolve(&Visit::new("promo")).await,
            Decision::Redirect { .. }
        ));

        clock.set(now + Duration::seconds(10));
        assert_eq!(
            resolver.resolve(&Visit::new("promo")).await,
            Decision::error(ResolveErrorKind::Expired)
        );
    }

    #[tokio::test]
    async fn test_inactive_link_is_expired() {
        let (resolver, mut rx) = Harness::new()
            .with_link(link().deactivated())
            .build();

        assert_eq!(
            resolver.resolve(&Visit::new("promo")).await,
            Decision::error(ResolveErrorKind::Expired)
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_password_gate() {
        let hash = hash_password("s3cret").unwrap();
        let (resolver, mut rx) = Harness::new()
            .with_link(link().with_password_hash(hash))
            .without_overrides()
            .build();

        let mut visit = Visit::new("promo");
        assert_eq!(resolver.resolve(&visit).await, Decision::PasswordRequired);

        visit.password = Some("wrong".to_string());
        assert_eq!(resolver.resolve(&visit).await, Decision::PasswordRequired);
        assert!(rx.try_recv().is_err());

        visit.password = Some("s3cret".to_string());
        assert!(matches!(
            resolver.resolve(&visit).await,
            Decision::Redirect { .. }
        ));
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_targeting_takes_precedence_over_experiment() {
        let mut harness = Harness::new().with_link(link());
        harness.targets.expect_list_active().returning(|_| {
            Ok(vec![LinkTarget {
                id: 1,
                link_id: 1,
                target_type: TargetType::Device,
                value: "mobile".to_string(),
                target_url: "https://m.example.com".to_string(),
                priority: 10,
                is_active: true,
                created_at: Utc::now(),
            }])
        });
        harness.experiments.expect_find_active_for_link().never();
        harness.experiments.expect_increment_clicks().never();
        let (resolver, _rx) = harness.build();

        let mut visit = Visit::new("promo");
        visit.user_agent = Some(IPHONE.to_string());

        assert_eq!(
            resolver.resolve(&visit).await,
            Decision::Redirect {
                url: "https://m.example.com".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_experiment_used_when_no_target_matches() {
        let mut harness = Harness::new().with_link(link());
        harness.targets.expect_list_active().returning(|_| Ok(vec![]));
        harness
            .experiments
            .expect_find_active_for_link()
            .returning(|_| Ok(Some(ab_test())));
        harness
            .experiments
            .expect_increment_clicks()
            .withf(|id| *id == 11)
            .times(1)
            .returning(|_| Ok(true));
        let (resolver, mut rx) = harness.build();

        let decision = resolver.resolve(&Visit::new("promo")).await;

        assert_eq!(
            decision,
            Decision::Redirect {
                url: "https://example.com/v11".to_string()
            }
        );
        assert_eq!(rx.try_recv().unwrap().variant_id, Some(11));
    }

    #[tokio::test]
    async fn test_override_failures_fall_back_to_original() {
        let mut harness = Harness::new().with_link(link());
        harness
            .targets
            .expect_list_active()
            .returning(|_| Err(AppError::internal("Database error", json!({}))));
        harness
            .experiments
            .expect_find_active_for_link()
            .returning(|_| Err(AppError::internal("Database error", json!({}))));
        let (resolver, _rx) = harness.build();

        assert_eq!(
            resolver.resolve(&Visit::new("promo")).await,
            Decision::Redirect {
                url: "https://example.com/original".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_cloaked_link_renders_page() {
        let cloaked = link().with_cloaking(CloakingConfig::new(CloakType::Iframe).with_title("Deals"));
        let (resolver, mut rx) = Harness::new().with_link(cloaked).without_overrides().build();

        let Decision::Cloaked { html, content_type } = resolver.resolve(&Visit::new("promo")).await
        else {
            panic!("expected a cloaked page");
        };

        assert_eq!(content_type, CLOAKED_CONTENT_TYPE);
        assert!(html.contains("<iframe"));
        assert!(html.contains("<title>Deals</title>"));
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_full_queue_never_blocks() {
        let (tx, _rx) = mpsc::channel(1);
        tx.try_send(ClickEvent::new(0, Utc::now())).unwrap();
        let resolver = Harness::new()
            .with_link(link())
            .without_overrides()
            .build_with_queue(tx);

        assert!(matches!(
            resolver.resolve(&Visit::new("promo")).await,
            Decision::Redirect { .. }
        ));
    }
}
