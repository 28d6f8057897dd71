//! Bearer token authentication for the owner API.

use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use tracing::warn;

use crate::domain::repositories::TokenRepository;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Keyed hash of a raw token, as stored in `api_tokens.token_hash`.
///
/// Returns 64 lowercase hex characters. The admin CLI uses the same function
/// when issuing tokens, so both sides must run with the same `secret`.
pub fn hash_token(secret: &str, token: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(token.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Authenticates raw tokens against stored HMAC-SHA256 hashes.
///
/// Without the server-side signing secret, read access to the token table is
/// not enough to verify or forge a token.
pub struct AuthService {
    repository: Arc<dyn TokenRepository>,
    signing_secret: String,
}

impl AuthService {
    pub fn new(repository: Arc<dyn TokenRepository>, signing_secret: String) -> Self {
        Self {
            repository,
            signing_secret,
        }
    }

    /// Checks a raw token and records its use.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the token is unknown or revoked.
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn authenticate(&self, token: &str) -> Result<(), AppError> {
        let token_hash = hash_token(&self.signing_secret, token);

        if !self.repository.validate_token(&token_hash).await? {
            return Err(AppError::unauthorized(
                "Unauthorized",
                json!({"reason": "Invalid or revoked token"}),
            ));
        }

        if let Err(e) = self.repository.update_last_used(&token_hash).await {
            warn!(error = %e, "Failed to update token last_used_at");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockTokenRepository;

    const SECRET: &str = "test-signing-secret";

    #[tokio::test]
    async fn test_authenticate_success() {
        let mut mock_repo = MockTokenRepository::new();
        let expected_hash = hash_token(SECRET, "valid-token");
        let touched_hash = expected_hash.clone();

        mock_repo
            .expect_validate_token()
            .withf(move |hash| hash == &expected_hash)
            .times(1)
            .returning(|_| Ok(true));
        mock_repo
            .expect_update_last_used()
            .withf(move |hash| hash == &touched_hash)
            .times(1)
            .returning(|_| Ok(()));

        let service = AuthService::new(Arc::new(mock_repo), SECRET.to_string());

        assert!(service.authenticate("valid-token").await.is_ok());
    }

    #[tokio::test]
    async fn test_authenticate_invalid_token() {
        let mut mock_repo = MockTokenRepository::new();
        mock_repo
            .expect_validate_token()
            .times(1)
            .returning(|_| Ok(false));
        mock_repo.expect_update_last_used().never();

        let service = AuthService::new(Arc::new(mock_repo), SECRET.to_string());

        let result = service.authenticate("invalid-token").await;

        assert!(matches!(result, Err(AppError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_last_used_failure_does_not_reject() {
        let mut mock_repo = MockTokenRepository::new();
        mock_repo.expect_validate_token().returning(|_| Ok(true));
        mock_repo
            .expect_update_last_used()
            .returning(|_| Err(AppError::internal("Database error", json!({}))));

        let service = AuthService::new(Arc::new(mock_repo), SECRET.to_string());

        assert!(service.authenticate("token").await.is_ok());
    }

    #[test]
    fn test_hash_token_properties() {
        let hash = hash_token(SECRET, "test-token");

        assert_eq!(hash, hash_token(SECRET, "test-token"));
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, hash_token(SECRET, "other-token"));
        assert_ne!(hash, hash_token("another-secret", "test-token"));
    }
}
