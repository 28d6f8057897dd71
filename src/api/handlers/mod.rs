//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod convert;
pub mod experiments;
pub mod health;
pub mod redirect;
pub mod targets;

pub use convert::convert_handler;
pub use experiments::{
    add_variant_handler, create_experiment_handler, delete_variant_handler,
    experiment_stats_handler, reset_experiment_handler, stop_experiment_handler,
    update_variant_handler,
};
pub use health::health_handler;
pub use redirect::{password_submit_handler, redirect_handler};
pub use targets::{create_target_handler, delete_target_handler, list_targets_handler};
