//! Adapters behind the domain traits.
//!
//! - [`cache`] - Link lookup cache (Redis or disabled)
//! - [`persistence`] - PostgreSQL repositories and the in-memory store

pub mod cache;
pub mod persistence;
