//! Domain layer: entities, pure decision logic and repository contracts.
//!
//! Nothing in this module touches the network or the database directly.
//!
//! - [`entities`] - Links, targeting rules, A/B tests
//! - [`attributes`] - Visitor attribute detection from request headers
//! - [`decision`] - The outcome of resolving a short code
//! - [`stats`] - Rates, significance and sample size math
//! - [`repositories`] - Data access trait definitions
//! - [`click_event`] / [`click_worker`] - Asynchronous click tracking
//!
//! # Click Processing Flow
//!
//! 1. The resolver produces a redirect or cloaked decision
//! 2. A [`click_event::ClickEvent`] is pushed onto a bounded channel
//! 3. [`click_worker::run_click_worker`] persists it with retry
//! 4. Rows land in `link_clicks` via [`repositories::ClickRepository`]

pub mod attributes;
pub mod click_event;
pub mod click_worker;
pub mod decision;
pub mod entities;
pub mod repositories;
pub mod stats;
