//! Repository trait definitions for the domain layer.
//!
//! Traits define the contract for data access; implementations live in
//! `crate::infrastructure::persistence`. Mock implementations are generated via
//! `mockall` for unit tests.
//!
//! # Available Repositories
//!
//! - [`LinkRepository`] - Short link lookups
//! - [`TargetRepository`] - Targeting rules
//! - [`ExperimentRepository`] - A/B tests, variants and their counters
//! - [`ClickRepository`] - Click analytics sink
//! - [`TokenRepository`] - API token authentication

pub mod click_repository;
pub mod experiment_repository;
pub mod link_repository;
pub mod target_repository;
pub mod token_repository;

pub use click_repository::ClickRepository;
pub use experiment_repository::ExperimentRepository;
pub use link_repository::LinkRepository;
pub use target_repository::TargetRepository;
pub use token_repository::{ApiToken, TokenRepository};

#[cfg(test)]
pub use click_repository::MockClickRepository;
#[cfg(test)]
pub use experiment_repository::MockExperimentRepository;
#[cfg(test)]
pub use link_repository::MockLinkRepository;
#[cfg(test)]
pub use target_repository::MockTargetRepository;
#[cfg(test)]
pub use token_repository::MockTokenRepository;
