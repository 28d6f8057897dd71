//! Application layer: services that orchestrate domain logic over repositories.
//!
//! # Available Services
//!
//! - [`services::RedirectResolver`] - Turns one visit into one decision
//! - [`services::TargetMatcher`] - Targeting rule selection
//! - [`services::VariantSelector`] - Weighted A/B assignment and click counting
//! - [`services::TargetService`] - Targeting rule management
//! - [`services::ExperimentService`] - A/B test management, conversions and reports
//! - [`services::AuthService`] - API token authentication

pub mod services;
