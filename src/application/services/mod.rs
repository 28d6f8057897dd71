//! Business logic services for the application layer.

pub mod auth_service;
pub mod cloaking;
pub mod experiment_service;
pub mod redirect_resolver;
pub mod target_matcher;
pub mod target_service;
pub mod variant_selector;

pub use auth_service::{AuthService, hash_token};
pub use experiment_service::{ExperimentReport, ExperimentService, SamplePlan, StatsSettings};
pub use redirect_resolver::{RedirectResolver, Visit};
pub use target_matcher::TargetMatcher;
pub use target_service::TargetService;
pub use variant_selector::{RandomSource, SeededRandom, ThreadRandom, VariantSelector};
