//! Request middleware: owner API authentication, per-IP rate limits and tracing.

pub mod auth;
pub mod rate_limit;
pub mod tracing;
