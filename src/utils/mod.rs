//! Helpers shared across layers.
//!
//! - [`clock`] - Injectable time source
//! - [`db_error`] - PostgreSQL error classification
//! - [`password`] - Argon2id hashing for link passwords
//! - [`request`] - Header and client IP extraction
//! - [`url_normalizer`] - Destination URL validation

pub mod clock;
pub mod db_error;
pub mod password;
pub mod request;
pub mod url_normalizer;
