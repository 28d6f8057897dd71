//! Core domain entities.
//!
//! - [`Link`] - A short link with its optional expiry, password and cloaking
//! - [`LinkTarget`] - A targeting rule routing matching visitors to another URL
//! - [`AbTest`] / [`AbVariant`] - A/B tests with weighted variants and counters
//!
//! Creation goes through separate `New*` structs; partial updates use
//! [`VariantPatch`].

pub mod experiment;
pub mod link;
pub mod target;

pub use experiment::{
    AbTest, AbVariant, ConversionOutcome, MAX_WEIGHT, MIN_VARIANTS, MIN_WEIGHT, NewAbTest,
    NewAbVariant, SelectedVariant, VariantDeletion, VariantPatch,
};
pub use link::{CloakType, CloakingConfig, Link};
pub use target::{LinkTarget, NewLinkTarget, TargetType, normalize_target_value};
