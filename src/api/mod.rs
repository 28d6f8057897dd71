//! HTTP surface of the service.
//!
//! Public redirect and conversion endpoints live next to the owner API under
//! `/api`, which manages targeting rules and A/B tests.
//!
//! - [`dto`] - Request bodies and health payloads
//! - [`handlers`] - Axum handlers
//! - [`middleware`] - Bearer auth, rate limiting and request tracing
//! - [`routes`] - Owner API router

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
