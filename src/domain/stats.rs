//! A/B test statistics.
//!
//! Pure functions over click/conversion counts: rates, a pooled two-proportion
//! z-test, sample-size planning and a winner recommendation. None of them panic;
//! degenerate inputs map to documented sentinel values (`0`, `f64::INFINITY` or
//! `None`).

use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;

/// Confidence (in percent) required to call a winner.
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 95.0;

/// z for a two-sided test at α = 0.05.
const Z_ALPHA: f64 = 1.96;
/// z for 80% power.
const Z_BETA: f64 = 0.84;

// Abramowitz & Stegun 7.1.26
const ERF_P: f64 = 0.327_591_1;
const ERF_A1: f64 = 0.254_829_592;
const ERF_A2: f64 = -0.284_496_736;
const ERF_A3: f64 = 1.421_413_741;
const ERF_A4: f64 = -1.453_152_027;
const ERF_A5: f64 = 1.061_405_429;

/// Raw counters of one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantCounts {
    pub id: i64,
    pub clicks: i64,
    pub conversions: i64,
}

/// Derived figures for one variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantStats {
    pub id: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub click_through_rate: f64,
    pub conversion_rate: f64,
    /// Relative lift over the control in percent. Absent for the control itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improvement: Option<f64>,
}

/// Summary of a whole test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestStatsSummary {
    pub total_clicks: i64,
    pub total_conversions: i64,
    pub variants: Vec<VariantStats>,
    pub winner: Option<i64>,
    pub is_significant: bool,
    /// Confidence of the decisive comparison, in percent.
    pub confidence: f64,
    pub recommendation: String,
}

impl TestStatsSummary {
    fn empty() -> Self {
        Self {
            total_clicks: 0,
            total_conversions: 0,
            variants: Vec::new(),
            winner: None,
            is_significant: false,
            confidence: 0.0,
            recommendation: "No variants to analyze.".to_string(),
        }
    }
}

/// Share of all clicks that went to this variant, in percent.
pub fn click_through_rate(clicks: i64, total_clicks: i64) -> f64 {
    if total_clicks > 0 {
        clicks as f64 / total_clicks as f64 * 100.0
    } else {
        0.0
    }
}

/// Conversions per click, in percent.
pub fn conversion_rate(conversions: i64, clicks: i64) -> f64 {
    if clicks > 0 {
        conversions as f64 / clicks as f64 * 100.0
    } else {
        0.0
    }
}

/// Relative change of `variant_rate` over `control_rate`, in percent.
///
/// With a zero control rate the lift is undefined; it is reported as `0` when the
/// variant is also at zero and `100` otherwise.
pub fn improvement(variant_rate: f64, control_rate: f64) -> f64 {
    if control_rate == 0.0 {
        if variant_rate == 0.0 { 0.0 } else { 100.0 }
    } else {
        (variant_rate - control_rate) / control_rate * 100.0
    }
}

fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + ERF_P * x);
    let poly = ((((ERF_A5 * t + ERF_A4) * t + ERF_A3) * t + ERF_A2) * t + ERF_A1) * t;

    sign * (1.0 - poly * (-x * x).exp())
}

/// Standard normal cumulative distribution function, clamped to `[0, 1]`.
pub fn normal_cdf(z: f64) -> f64 {
    if z.is_nan() {
        return 0.5;
    }
    (0.5 * (1.0 + erf(z / SQRT_2))).clamp(0.0, 1.0)
}

/// Two-proportion z statistic of A against B using the pooled proportion.
///
/// Returns `0` when either sample has no clicks or the pooled variance is zero.
pub fn z_score(conversions_a: i64, clicks_a: i64, conversions_b: i64, clicks_b: i64) -> f64 {
    if clicks_a <= 0 || clicks_b <= 0 {
        return 0.0;
    }

    let (na, nb) = (clicks_a as f64, clicks_b as f64);
    let (ca, cb) = (conversions_a as f64, conversions_b as f64);

    let pa = ca / na;
    let pb = cb / nb;
    let pooled = (ca + cb) / (na + nb);

    let se = (pooled * (1.0 - pooled) * (1.0 / na + 1.0 / nb)).sqrt();
    if se == 0.0 || !se.is_finite() {
        return 0.0;
    }

    (pa - pb) / se
}

/// Confidence, in percent, that the two conversion rates differ.
pub fn significance(conversions_a: i64, clicks_a: i64, conversions_b: i64, clicks_b: i64) -> f64 {
    let z = z_score(conversions_a, clicks_a, conversions_b, clicks_b);
    ((2.0 * normal_cdf(z.abs()) - 1.0) * 100.0).clamp(0.0, 100.0)
}

pub fn is_significant(
    conversions_a: i64,
    clicks_a: i64,
    conversions_b: i64,
    clicks_b: i64,
    threshold: f64,
) -> bool {
    significance(conversions_a, clicks_a, conversions_b, clicks_b) >= threshold
}

/// Clicks needed per variant to detect a relative lift of
/// `minimum_detectable_effect_percent` over `baseline_rate_percent`
/// (two-sided α = 0.05, power 0.80).
///
/// Returns `f64::INFINITY` when the effect is zero or negative, or when the
/// baseline is outside `(0, 100)`. Target rates at or above 100% are evaluated
/// at 100%.
pub fn min_sample_size(baseline_rate_percent: f64, minimum_detectable_effect_percent: f64) -> f64 {
    if !(minimum_detectable_effect_percent > 0.0) {
        return f64::INFINITY;
    }

    let p1 = baseline_rate_percent / 100.0;
    if !(p1 > 0.0 && p1 < 1.0) {
        return f64::INFINITY;
    }

    let p2 = (p1 * (1.0 + minimum_detectable_effect_percent / 100.0)).min(1.0);
    let delta = p2 - p1;
    if delta <= 0.0 || !delta.is_finite() {
        return f64::INFINITY;
    }

    let p_bar = (p1 + p2) / 2.0;
    let numerator = Z_ALPHA * (2.0 * p_bar * (1.0 - p_bar)).sqrt()
        + Z_BETA * (p1 * (1.0 - p1) + p2 * (1.0 - p2)).sqrt();

    (numerator * numerator / (delta * delta)).ceil()
}

/// Summarizes a test using [`DEFAULT_SIGNIFICANCE_THRESHOLD`].
pub fn test_stats(variants: &[VariantCounts]) -> TestStatsSummary {
    test_stats_with_threshold(variants, DEFAULT_SIGNIFICANCE_THRESHOLD)
}

/// Summarizes a test. The first variant is the control.
///
/// The best performer is the variant with the highest conversion rate (the
/// earliest one on ties). It is compared against the control, or, when the
/// control itself leads, against the strongest challenger. A winner is named only
/// when that comparison reaches `threshold`.
pub fn test_stats_with_threshold(variants: &[VariantCounts], threshold: f64) -> TestStatsSummary {
    let Some(control) = variants.first() else {
        return TestStatsSummary::empty();
    };

    let total_clicks: i64 = variants.iter().map(|v| v.clicks).sum();
    let total_conversions: i64 = variants.iter().map(|v| v.conversions).sum();
    let control_rate = conversion_rate(control.conversions, control.clicks);

    let stats: Vec<VariantStats> = variants
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let rate = conversion_rate(v.conversions, v.clicks);
            VariantStats {
                id: v.id,
                clicks: v.clicks,
                conversions: v.conversions,
                click_through_rate: click_through_rate(v.clicks, total_clicks),
                conversion_rate: rate,
                improvement: (i > 0).then(|| improvement(rate, control_rate)),
            }
        })
        .collect();

    let mut summary = TestStatsSummary {
        total_clicks,
        total_conversions,
        variants: stats,
        winner: None,
        is_significant: false,
        confidence: 0.0,
        recommendation: String::new(),
    };

    if variants.len() < 2 {
        summary.recommendation = "Add at least one more variant to compare results.".to_string();
        return summary;
    }
    if total_clicks == 0 {
        summary.recommendation = "More data needed: no clicks recorded yet.".to_string();
        return summary;
    }

    let best = best_index(&summary.variants, 0..variants.len());
    let opponent = if best == 0 {
        best_index(&summary.variants, 1..variants.len())
    } else {
        0
    };

    let (a, b) = (&variants[best], &variants[opponent]);
    let confidence = significance(a.conversions, a.clicks, b.conversions, b.clicks);

    summary.confidence = confidence;
    summary.is_significant = confidence >= threshold;

    if summary.is_significant {
        summary.winner = Some(a.id);
        summary.recommendation = format!(
            "Variant {} is the winner with {:.1}% confidence. Consider sending all traffic to it.",
            a.id, confidence
        );
    } else {
        summary.recommendation = format!(
            "More data needed: confidence is {:.1}%, below the {:.0}% threshold. Keep the test running.",
            confidence, threshold
        );
    }

    summary
}

fn best_index(stats: &[VariantStats], range: std::ops::Range<usize>) -> usize {
    let start = range.start;
    range.fold(start, |best, i| {
        if stats[i].conversion_rate > stats[best].conversion_rate {
            i
        } else {
            best
        }
    })
}

/// Days until `required_clicks` is reached at the current daily click rate,
/// rounded up.
///
/// Returns `None` when no rate can be derived (non-positive days or clicks) or
/// the requirement is not finite, and `Some(0)` once the requirement is met.
pub fn estimate_time_to_significance(
    current_clicks: i64,
    days_elapsed: f64,
    required_clicks: f64,
) -> Option<u64> {
    if !(days_elapsed > 0.0) || current_clicks <= 0 {
        return None;
    }

    let current = current_clicks as f64;
    if current >= required_clicks {
        return Some(0);
    }
    if !required_clicks.is_finite() {
        return None;
    }

    let clicks_per_day = current / days_elapsed;
    Some(((required_clicks - current) / clicks_per_day).ceil() as u64)
}
