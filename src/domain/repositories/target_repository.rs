//! Repository trait for targeting rules.

use crate::domain::entities::{LinkTarget, NewLinkTarget};
use crate::error::AppError;
use async_trait::async_trait;

/// Storage for per-link targeting rules.
///
/// Rules are returned ordered by `priority` descending, then creation time and id
/// ascending. Rows whose stored type cannot be parsed are skipped.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TargetRepository: Send + Sync {
    /// Lists the active rules of a link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn list_active(&self, link_id: i64) -> Result<Vec<LinkTarget>, AppError>;

    /// Lists all rules of a link, active or not.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn list(&self, link_id: i64) -> Result<Vec<LinkTarget>, AppError>;

    /// Stores a new rule.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the link already has a rule for the same
    /// type and value.
    /// Returns [`AppError::Internal`] on database errors.
    async fn create(&self, new_target: NewLinkTarget) -> Result<LinkTarget, AppError>;

    /// Deletes a rule. Returns `Ok(false)` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;
}
