//! A/B test entities.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Minimum number of variants a test must keep.
pub const MIN_VARIANTS: usize = 2;

/// Allowed range for a variant's relative weight.
pub const MIN_WEIGHT: i32 = 1;
pub const MAX_WEIGHT: i32 = 100;

/// An A/B test attached to a link, with its variants in creation order.
///
/// The first variant is the control for statistical comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbTest {
    pub id: i64,
    pub link_id: i64,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Start of the current counting window: creation, or the last counter reset.
    pub started_at: DateTime<Utc>,
    pub variants: Vec<AbVariant>,
}

/// One destination of an A/B test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbVariant {
    pub id: i64,
    pub test_id: i64,
    pub name: String,
    pub url: String,
    pub weight: i32,
    pub clicks: i64,
    pub conversions: i64,
    pub created_at: DateTime<Utc>,
}

/// Input data for creating a test together with its initial variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAbTest {
    pub link_id: i64,
    pub name: String,
    pub variants: Vec<NewAbVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAbVariant {
    pub name: String,
    pub url: String,
    pub weight: i32,
}

/// Partial update for a variant. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub weight: Option<i32>,
}

/// Outcome of a guarded variant deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantDeletion {
    Deleted,
    NotFound,
    /// Deleting would leave the test with fewer than [`MIN_VARIANTS`].
    BelowMinimum,
}

/// Outcome of a guarded conversion increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOutcome {
    Counted,
    UnknownVariant,
    /// The test is stopped, or the variant has no unconverted click left.
    NotEligible,
}

/// The variant chosen for a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedVariant {
    pub id: i64,
    pub url: String,
}

impl From<&AbVariant> for SelectedVariant {
    fn from(variant: &AbVariant) -> Self {
        Self {
            id: variant.id,
            url: variant.url.clone(),
        }
    }
}
