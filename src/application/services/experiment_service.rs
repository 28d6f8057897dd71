//! A/B test management and reporting.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::domain::entities::{
    AbTest, AbVariant, ConversionOutcome, Link, MAX_WEIGHT, MIN_VARIANTS, MIN_WEIGHT, NewAbTest,
    NewAbVariant, VariantDeletion, VariantPatch,
};
use crate::domain::repositories::{ExperimentRepository, LinkRepository};
use crate::domain::stats::{
    TestStatsSummary, VariantCounts, conversion_rate, estimate_time_to_significance,
    min_sample_size, test_stats_with_threshold,
};
use crate::error::AppError;
use crate::utils::clock::Clock;
use crate::utils::url_normalizer::normalize_url;

/// Thresholds used when judging tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSettings {
    /// Confidence in percent required to call a winner.
    pub significance_threshold: f64,
    /// Relative lift in percent the sample-size plan is sized for.
    pub min_detectable_effect: f64,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            significance_threshold: 95.0,
            min_detectable_effect: 20.0,
        }
    }
}

/// How much traffic the test needs and how long that will take.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplePlan {
    /// Conversion rate of the control, in percent.
    pub baseline_conversion_rate: f64,
    pub min_detectable_effect: f64,
    /// `None` while the baseline is zero and no finite size exists.
    pub required_clicks_per_variant: Option<u64>,
    pub required_total_clicks: Option<u64>,
    pub days_running: f64,
    pub estimated_days_remaining: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentReport {
    pub test: AbTest,
    pub summary: TestStatsSummary,
    pub plan: SamplePlan,
}

pub struct ExperimentService {
    links: Arc<dyn LinkRepository>,
    experiments: Arc<dyn ExperimentRepository>,
    clock: Arc<dyn Clock>,
    settings: StatsSettings,
}

impl ExperimentService {
    pub fn new(
        links: Arc<dyn LinkRepository>,
        experiments: Arc<dyn ExperimentRepository>,
        clock: Arc<dyn Clock>,
        settings: StatsSettings,
    ) -> Self {
        Self {
            links,
            experiments,
            clock,
            settings,
        }
    }

    /// Starts a test on the link identified by `code`.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the link does not exist
    /// - [`AppError::Validation`] for fewer than two variants, out-of-range weights
    ///   or invalid URLs
    /// - [`AppError::Conflict`] if the link already has a live test
    pub async fn create_test(
        &self,
        code: &str,
        name: &str,
        variants: Vec<NewAbVariant>,
    ) -> Result<AbTest, AppError> {
        let link = self.link(code).await?;

        if variants.len() < MIN_VARIANTS {
            return Err(AppError::bad_request(
                "An A/B test needs at least two variants",
                json!({ "min_variants": MIN_VARIANTS, "given": variants.len() }),
            ));
        }
        let variants = variants
            .into_iter()
            .map(validate_variant)
            .collect::<Result<Vec<_>, _>>()?;

        if self.experiments.find_active_for_link(link.id).await?.is_some() {
            return Err(AppError::conflict(
                "Link already has an active A/B test",
                json!({ "code": code }),
            ));
        }

        let test = self
            .experiments
            .create(NewAbTest {
                link_id: link.id,
                name: name.trim().to_string(),
                variants,
            })
            .await?;

        info!(link_id = link.id, test_id = test.id, "A/B test started");
        Ok(test)
    }

    /// Returns the live test of a link.
    pub async fn active_test(&self, code: &str) -> Result<AbTest, AppError> {
        let link = self.link(code).await?;
        self.experiments
            .find_active_for_link(link.id)
            .await?
            .ok_or_else(|| AppError::not_found("No active A/B test", json!({ "code": code })))
    }

    pub async fn add_variant(
        &self,
        test_id: i64,
        variant: NewAbVariant,
    ) -> Result<AbVariant, AppError> {
        let variant = validate_variant(variant)?;
        self.test(test_id).await?;
        self.experiments.add_variant(test_id, variant).await
    }

    pub async fn update_variant(
        &self,
        variant_id: i64,
        patch: VariantPatch,
    ) -> Result<AbVariant, AppError> {
        let patch = validate_patch(patch)?;
        self.experiments
            .update_variant(variant_id, patch)
            .await?
            .ok_or_else(|| variant_not_found(variant_id))
    }

    /// Deletes a variant unless its test would be left with fewer than two.
    pub async fn delete_variant(&self, variant_id: i64) -> Result<(), AppError> {
        match self
            .experiments
            .delete_variant(variant_id, MIN_VARIANTS as i64)
            .await?
        {
            VariantDeletion::Deleted => Ok(()),
            VariantDeletion::NotFound => Err(variant_not_found(variant_id)),
            VariantDeletion::BelowMinimum => Err(AppError::bad_request(
                "An A/B test needs at least two variants",
                json!({ "variant_id": variant_id, "min_variants": MIN_VARIANTS }),
            )),
        }
    }

    /// Zeroes the counters of a test and restarts its running time.
    pub async fn reset(&self, test_id: i64) -> Result<(), AppError> {
        let now = self.clock.now();
        if !self.experiments.reset_counters(test_id, now).await? {
            return Err(test_not_found(test_id));
        }
        info!(test_id, "A/B test counters reset");
        Ok(())
    }

    pub async fn stop(&self, test_id: i64) -> Result<(), AppError> {
        if !self.experiments.deactivate(test_id).await? {
            return Err(test_not_found(test_id));
        }
        info!(test_id, "A/B test stopped");
        Ok(())
    }

    /// Counts one conversion for a variant.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the variant does not exist
    /// - [`AppError::Conflict`] if the test is stopped or every click of the
    ///   variant has already converted
    pub async fn record_conversion(&self, variant_id: i64) -> Result<(), AppError> {
        match self.experiments.increment_conversions(variant_id).await? {
            ConversionOutcome::Counted => {
                metrics::counter!("ab_conversions_total").increment(1);
                Ok(())
            }
            ConversionOutcome::UnknownVariant => Err(variant_not_found(variant_id)),
            ConversionOutcome::NotEligible => {
                metrics::counter!("ab_conversions_rejected_total").increment(1);
                Err(AppError::conflict(
                    "Conversion not accepted",
                    json!({
                        "variant_id": variant_id,
                        "reason": "test stopped or no unconverted click",
                    }),
                ))
            }
        }
    }

    /// Statistics and traffic plan for the live test of a link.
    pub async fn report(&self, code: &str) -> Result<ExperimentReport, AppError> {
        let test = self.active_test(code).await?;
        Ok(self.report_for(test))
    }

    pub fn report_for(&self, test: AbTest) -> ExperimentReport {
        let counts: Vec<VariantCounts> = test
            .variants
            .iter()
            .map(|v| VariantCounts {
                id: v.id,
                clicks: v.clicks,
                conversions: v.conversions,
            })
            .collect();

        let summary = test_stats_with_threshold(&counts, self.settings.significance_threshold);

        let baseline = counts
            .first()
            .map(|c| conversion_rate(c.conversions, c.clicks))
            .unwrap_or(0.0);
        let per_variant = min_sample_size(baseline, self.settings.min_detectable_effect);
        let total_required = per_variant * counts.len() as f64;

        let elapsed = self.clock.now() - test.started_at;
        let days_running = (elapsed.num_seconds().max(0) as f64) / 86_400.0;

        let plan = SamplePlan {
            baseline_conversion_rate: baseline,
            min_detectable_effect: self.settings.min_detectable_effect,
            required_clicks_per_variant: finite_count(per_variant),
            required_total_clicks: finite_count(total_required),
            days_running,
            estimated_days_remaining: estimate_time_to_significance(
                summary.total_clicks,
                days_running,
                total_required,
            ),
        };

        ExperimentReport {
            test,
            summary,
            plan,
        }
    }

    async fn link(&self, code: &str) -> Result<Link, AppError> {
        self.links
            .find_by_code_or_alias(code)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "code": code })))
    }

    async fn test(&self, test_id: i64) -> Result<AbTest, AppError> {
        self.experiments
            .find_by_id(test_id)
            .await?
            .ok_or_else(|| test_not_found(test_id))
    }
}

fn finite_count(value: f64) -> Option<u64> {
    value.is_finite().then(|| value.max(0.0) as u64)
}

fn test_not_found(test_id: i64) -> AppError {
    AppError::not_found("A/B test not found", json!({ "test_id": test_id }))
}

fn variant_not_found(variant_id: i64) -> AppError {
    AppError::not_found("Variant not found", json!({ "variant_id": variant_id }))
}

fn validate_weight(weight: i32) -> Result<i32, AppError> {
    if (MIN_WEIGHT..=MAX_WEIGHT).contains(&weight) {
        Ok(weight)
    } else {
        Err(AppError::bad_request(
            "Variant weight out of range",
            json!({ "weight": weight, "min": MIN_WEIGHT, "max": MAX_WEIGHT }),
        ))
    }
}

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request(
            "Variant name must not be empty",
            json!({}),
        ));
    }
    Ok(name.to_string())
}

fn validate_variant(variant: NewAbVariant) -> Result<NewAbVariant, AppError> {
    Ok(NewAbVariant {
        name: validate_name(&variant.name)?,
        url: normalize_url(&variant.url)?,
        weight: validate_weight(variant.weight)?,
    })
}

fn validate_patch(patch: VariantPatch) -> Result<VariantPatch, AppError> {
    Ok(VariantPatch {
        name: patch.name.as_deref().map(validate_name).transpose()?,
        url: patch.url.as_deref().map(normalize_url).transpose()?,
        weight: patch.weight.map(validate_weight).transpose()?,
    })
}
