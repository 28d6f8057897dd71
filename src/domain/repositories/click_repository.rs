//! Analytics sink for resolved visits.

use crate::domain::click_event::ClickEvent;
use crate::error::AppError;
use async_trait::async_trait;

/// Receives click events drained from the tracking queue.
///
/// Aggregation and reporting over these rows are owned by the analytics
/// subsystem; the redirect pipeline only appends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickRepository: Send + Sync {
    /// Persists one click.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the referenced link no longer exists.
    /// Returns [`AppError::Internal`] on database errors.
    async fn record_click(&self, event: ClickEvent) -> Result<(), AppError>;
}
