//! Principal extraction from bearer tokens.
//!
//! Every `/api/v1` request must carry `Authorization: Bearer <jwt>`. The
//! token is an HS256 JWT whose `iss` claim names the calling principal.
//! Requests without a valid token are rejected with 401 before any store is
//! consulted.

use std::fmt;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::domain::OwnerId;
use crate::error::GatewayError;

/// Claims read from the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Principal identifier.
    pub iss: String,
    /// Expiry as seconds since the Unix epoch.
    pub exp: u64,
}

/// Validates bearer tokens against a shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Creates a verifier for HS256 tokens signed with `secret`.
    #[must_use]
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "iss"]);
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Decodes `token` and returns the principal it names.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthenticated`] if the signature, expiry
    /// or issuer is invalid.
    pub fn verify(&self, token: &str) -> Result<OwnerId, GatewayError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "token expired",
                ErrorKind::InvalidSignature => "bad token signature",
                _ => "malformed token",
            };
            tracing::debug!(error = %e, reason, "token rejected");
            GatewayError::Unauthenticated(reason.to_string())
        })?;
        OwnerId::parse(data.claims.iss)
    }
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub OwnerId);

impl FromRequestParts<AppState> for Principal {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| GatewayError::Unauthenticated("missing bearer token".to_string()))?;

        state.verifier.verify(token).map(Principal)
    }
}
