//! # Token Gate
//!
//! Verifies a presented access token before any membership query (or other
//! identity-bound work) is allowed to proceed. The gate runs before every
//! cache read and directory call tied to the requester's own identity: an
//! unauthenticated caller must not be able to probe cache state or generate
//! directory load.
//!
//! Token issuance lives elsewhere; this module only needs the pass/fail
//! verification call and, for requests that passed, the identity claims the
//! issuer embedded in the token.

use crate::core::config::TokenConfig;
use crate::core::error::{IdentityError, IdentityResult};
use crate::core::types::UserClaims;
use async_trait::async_trait;
use axum::http::HeaderMap;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tracing::{debug, warn};

/// Access-token verification collaborator.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Pass/fail verification of an access token.
    async fn verify_access_token(&self, token: &str) -> IdentityResult<bool>;

    /// Read the identity claims of a token. Only called on tokens that
    /// already passed `verify_access_token`.
    async fn claims(&self, token: &str) -> IdentityResult<UserClaims>;
}

/// HS256 JWT implementation of [`TokenVerifier`].
pub struct JwtTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    fn decode(&self, token: &str) -> Result<UserClaims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<UserClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
    }
}

#[async_trait]
impl TokenVerifier for JwtTokenVerifier {
    async fn verify_access_token(&self, token: &str) -> IdentityResult<bool> {
        match self.decode(token) {
            Ok(_) => Ok(true),
            Err(err) => {
                debug!(error = %err, "access token failed verification");
                Ok(false)
            }
        }
    }

    async fn claims(&self, token: &str) -> IdentityResult<UserClaims> {
        self.decode(token)
            .map_err(|err| IdentityError::invalid_token(err.to_string()))
    }
}

/// Gate that extracts and verifies the bearer token of a request.
pub struct TokenGate {
    verifier: Arc<dyn TokenVerifier>,

    /// Header carrying the token.
    header: String,

    /// Scheme prefix to strip, e.g. `"Bearer "`.
    prefix: String,
}

impl TokenGate {
    pub fn new(verifier: Arc<dyn TokenVerifier>, config: &TokenConfig) -> Self {
        Self {
            verifier,
            header: config.header.clone(),
            prefix: config.prefix.clone(),
        }
    }

    /// Extract the raw token from request headers, stripping the scheme
    /// prefix.
    pub fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        let header_value = headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())?;

        header_value
            .strip_prefix(&self.prefix)
            .map(|token| token.to_string())
    }

    /// Verify a presented token, failing with an invalid-token outcome when
    /// verification does not pass.
    pub async fn verify(&self, token: &str) -> IdentityResult<()> {
        if self.verifier.verify_access_token(token).await? {
            Ok(())
        } else {
            warn!("rejected invalid access token");
            Err(IdentityError::invalid_token("verification failed"))
        }
    }

    /// Extract and verify the token of a request, returning it on success.
    pub async fn verify_headers(&self, headers: &HeaderMap) -> IdentityResult<String> {
        let token = self
            .extract_token(headers)
            .ok_or_else(|| IdentityError::invalid_token("missing bearer token"))?;
        self.verify(&token).await?;
        Ok(token)
    }

    /// Extract, verify, and read the identity claims of a request's token.
    pub async fn claims_from_headers(&self, headers: &HeaderMap) -> IdentityResult<UserClaims> {
        let token = self.verify_headers(headers).await?;
        self.verifier.claims(&token).await
    }
}
