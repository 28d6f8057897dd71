//! Repository trait for short link lookups.

use crate::domain::entities::Link;
use crate::error::AppError;
use async_trait::async_trait;

/// Read access to links.
///
/// Link creation and editing belong to the management API of the wider platform;
/// the redirect pipeline only ever reads.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryStore`] - in-process store
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Finds a link whose short code or custom alias equals `code`.
    ///
    /// A short code match takes precedence over an alias match.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_code_or_alias(&self, code: &str) -> Result<Option<Link>, AppError>;
}
