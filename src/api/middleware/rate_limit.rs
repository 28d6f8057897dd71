//! Per-client rate limiting using the token bucket algorithm.

use axum::Router;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{KeyExtractor, PeerIpKeyExtractor, SmartIpKeyExtractor},
};

/// Rate limit tier applied to a group of routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Visitor-facing routes: 50 requests per second, burst 200.
    Public,
    /// Owner API: 2 requests per second, burst 20.
    Strict,
}

impl Policy {
    fn quota(self) -> (u64, u32) {
        match self {
            Policy::Public => (50, 200),
            Policy::Strict => (2, 20),
        }
    }
}

/// Wraps `router` with a rate limiter for `policy`.
///
/// Clients are keyed by socket peer address. With `behind_proxy` the key comes
/// from `X-Forwarded-For` / `X-Real-IP` / `Forwarded` first; enable it only
/// behind a trusted reverse proxy, since those headers are client-controlled.
///
/// Requests exceeding the limit receive `429 Too Many Requests`.
pub fn apply<S>(router: Router<S>, policy: Policy, behind_proxy: bool) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let (per_second, burst) = policy.quota();

    if behind_proxy {
        router.layer(limiter(SmartIpKeyExtractor, per_second, burst))
    } else {
        router.layer(limiter(PeerIpKeyExtractor, per_second, burst))
    }
}

fn limiter<K>(
    key_extractor: K,
    per_second: u64,
    burst: u32,
) -> GovernorLayer<K, NoOpMiddleware<QuantaInstant>, axum::body::Body>
where
    K: KeyExtractor,
{
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(per_second)
            .burst_size(burst)
            .key_extractor(key_extractor)
            .finish()
            .expect("rate limit quota is non-zero"),
    );

    GovernorLayer::new(governor_conf)
}
