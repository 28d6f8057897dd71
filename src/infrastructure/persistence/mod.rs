//! Repository implementations.
//!
//! PostgreSQL implementations of the domain repository traits using SQLx, plus
//! an in-process [`MemoryStore`] for tests and database-less runs.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Link lookup by short code or alias
//! - [`PgTargetRepository`] - Targeting rules
//! - [`PgExperimentRepository`] - A/B tests, variants and their counters
//! - [`PgClickRepository`] - Click event sink
//! - [`PgTokenRepository`] - API token storage and validation

pub mod memory;
pub mod pg_click_repository;
pub mod pg_experiment_repository;
pub mod pg_link_repository;
pub mod pg_target_repository;
pub mod pg_token_repository;

pub use memory::MemoryStore;
pub use pg_click_repository::PgClickRepository;
pub use pg_experiment_repository::PgExperimentRepository;
pub use pg_link_repository::PgLinkRepository;
pub use pg_target_repository::PgTargetRepository;
pub use pg_token_repository::PgTokenRepository;
