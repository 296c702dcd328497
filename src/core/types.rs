//! # Core Types Module
//!
//! Foundational data structures shared across the gateway: the resolved
//! directory principal, the claims read from a verified access token, and
//! the request/response bodies of the HTTP boundary.

use serde::{Deserialize, Serialize};

/// A principal resolved from the directory service.
///
/// Created by the directory authenticator on a successful lookup and treated
/// as immutable afterwards; the only mutation is the distinguished-name
/// backfill performed before the record leaves the authenticator. Cached
/// copies are always replaced whole, never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdapUser {
    /// Stable distinguished name, e.g. `CN=Alice,OU=Staff,DC=example,DC=com`.
    pub distinguished_name: String,

    /// User principal name used for the credential bind, e.g.
    /// `alice@example.com`.
    pub user_principal_name: String,

    /// Short account name (sAMAccountName); used as the cache tag.
    pub sam_account_name: String,

    /// Display name as stored in the directory.
    #[serde(default)]
    pub display_name: String,

    /// Primary e-mail address, when the directory provides one.
    #[serde(default)]
    pub email: Option<String>,
}

impl LdapUser {
    pub fn new(
        distinguished_name: impl Into<String>,
        user_principal_name: impl Into<String>,
        sam_account_name: impl Into<String>,
    ) -> Self {
        Self {
            distinguished_name: distinguished_name.into(),
            user_principal_name: user_principal_name.into(),
            sam_account_name: sam_account_name.into(),
            display_name: String::new(),
            email: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Identity claims carried by a verified access token.
///
/// Claims are only ever read *after* the token gate accepted the token, so a
/// blank field here means the issuer omitted it, not that verification was
/// skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserClaims {
    /// Short account name claim.
    #[serde(default)]
    pub sam_account_name: String,

    /// User principal name claim.
    #[serde(default)]
    pub user_principal_name: String,

    /// Distinguished name claim; required for group resolution.
    #[serde(default)]
    pub distinguished_name: String,
}

/// Body of `POST /api/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful response of `POST /api/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: LdapUser,
}
