//! Repository trait for A/B tests and their counters.

use crate::domain::entities::{
    AbTest, AbVariant, ConversionOutcome, NewAbTest, NewAbVariant, VariantDeletion, VariantPatch,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage for A/B tests and variants.
///
/// Counter updates (`increment_*`) must be atomic at the storage layer so that
/// concurrent clicks never lose updates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExperimentRepository: Send + Sync {
    /// Returns the live test of a link with its variants in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_active_for_link(&self, link_id: i64) -> Result<Option<AbTest>, AppError>;

    /// Returns a test (active or not) with its variants.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_id(&self, test_id: i64) -> Result<Option<AbTest>, AppError>;

    /// Creates a test together with its initial variants.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the link already has a live test.
    /// Returns [`AppError::Internal`] on database errors.
    async fn create(&self, new_test: NewAbTest) -> Result<AbTest, AppError>;

    /// Marks a test as no longer live. Returns `Ok(false)` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn deactivate(&self, test_id: i64) -> Result<bool, AppError>;

    /// Appends a variant to a test.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn add_variant(
        &self,
        test_id: i64,
        variant: NewAbVariant,
    ) -> Result<AbVariant, AppError>;

    /// Finds a single variant.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_variant(&self, variant_id: i64) -> Result<Option<AbVariant>, AppError>;

    /// Applies a partial update. Returns `Ok(None)` if the variant does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn update_variant(
        &self,
        variant_id: i64,
        patch: VariantPatch,
    ) -> Result<Option<AbVariant>, AppError>;

    /// Deletes a variant unless that would leave its test with fewer than
    /// `min_remaining` variants. The check and the delete happen atomically.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn delete_variant(
        &self,
        variant_id: i64,
        min_remaining: i64,
    ) -> Result<VariantDeletion, AppError>;

    /// Atomically adds one click. Returns `Ok(false)` if the variant does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn increment_clicks(&self, variant_id: i64) -> Result<bool, AppError>;

    /// Atomically adds one conversion, but only while the test is live and the
    /// variant has more clicks than conversions.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn increment_conversions(
        &self,
        variant_id: i64,
    ) -> Result<ConversionOutcome, AppError>;

    /// Zeroes the counters of every variant of a test and moves its `started_at`
    /// to `started_at`, in one atomic step. Returns `Ok(false)` if the test does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn reset_counters(
        &self,
        test_id: i64,
        started_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;
}
