//! Weighted A/B variant assignment.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::domain::entities::{AbVariant, SelectedVariant};
use crate::domain::repositories::ExperimentRepository;

/// Source of uniform draws for variant assignment.
pub trait RandomSource: Send + Sync {
    /// Returns a uniformly distributed value in `0..upper`. `upper` is never zero.
    fn next_below(&self, upper: u64) -> u64;
}

/// Thread-local OS-seeded generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_below(&self, upper: u64) -> u64 {
        rand::rng().random_range(0..upper)
    }
}

/// Deterministic generator for reproducible assignments.
#[derive(Debug)]
pub struct SeededRandom(Mutex<StdRng>);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(Mutex::new(StdRng::seed_from_u64(seed)))
    }
}

impl RandomSource for SeededRandom {
    fn next_below(&self, upper: u64) -> u64 {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .random_range(0..upper)
    }
}

/// Sum of the positive weights.
pub fn total_weight(variants: &[AbVariant]) -> u64 {
    variants
        .iter()
        .map(|v| u64::try_from(v.weight).unwrap_or(0))
        .sum()
}

/// Maps a draw in `0..total_weight(variants)` onto a variant.
///
/// Each variant owns a slice of the range as wide as its weight, in list order.
/// Variants with a weight of zero or less own nothing and are never returned.
pub fn pick_weighted(variants: &[AbVariant], draw: u64) -> Option<&AbVariant> {
    let mut cumulative = 0u64;
    for variant in variants {
        let weight = u64::try_from(variant.weight).unwrap_or(0);
        if weight == 0 {
            continue;
        }
        cumulative += weight;
        if draw < cumulative {
            return Some(variant);
        }
    }
    None
}

/// Assigns visitors to variants of the link's live test and counts the click.
///
/// Each click is an independent draw; returning visitors are not pinned to the
/// variant they saw before.
pub struct VariantSelector {
    repository: Arc<dyn ExperimentRepository>,
    random: Arc<dyn RandomSource>,
}

impl VariantSelector {
    pub fn new(repository: Arc<dyn ExperimentRepository>, random: Arc<dyn RandomSource>) -> Self {
        Self { repository, random }
    }

    /// Draws a variant and increments its click counter.
    ///
    /// Returns `None` with no side effects when the link has no live test or
    /// no variant carries a positive weight. Storage failures while loading are
    /// logged and treated as "no test"; a failed increment is logged but the
    /// assignment still stands.
    pub async fn select_and_track(&self, link_id: i64) -> Option<SelectedVariant> {
        let test = match self.repository.find_active_for_link(link_id).await {
            Ok(Some(test)) => test,
            Ok(None) => return None,
            Err(e) => {
                warn!(link_id, step = "experiment", error = %e, "Failed to load A/B test");
                return None;
            }
        };

        let total = total_weight(&test.variants);
        if total == 0 {
            return None;
        }

        let draw = self.random.next_below(total);
        let selected = SelectedVariant::from(pick_weighted(&test.variants, draw)?);

        match self.repository.increment_clicks(selected.id).await {
            Ok(true) => {}
            Ok(false) => debug!(variant_id = selected.id, "Variant vanished before click was counted"),
            Err(e) => warn!(
                link_id,
                variant_id = selected.id,
                step = "experiment",
                error = %e,
                "Failed to count variant click"
            ),
        }

        Some(selected)
    }
}
