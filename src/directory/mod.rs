//! # Directory Collaborators
//!
//! Narrow interfaces over the external directory service. The gateway never
//! speaks the directory wire protocol itself; an implementation of these
//! traits (LDAP, a test double, a remote proxy) is injected at startup.

pub mod authenticator;
pub mod fixture;

pub use authenticator::DirectoryAuthenticator;
pub use fixture::{FixtureDirectory, FixtureUser};

use crate::core::error::IdentityResult;
use crate::core::types::LdapUser;
use async_trait::async_trait;

/// Connection parameters for the directory service.
///
/// All three name fields are mandatory; the authenticator refuses to attempt
/// a bind when any of them is blank.
#[derive(Debug, Clone, Default)]
pub struct LdapConnectionInfo {
    pub host: String,
    pub domain: String,
    pub domain_fullname: String,
}

impl LdapConnectionInfo {
    /// Whether every required parameter is present.
    pub fn is_complete(&self) -> bool {
        !self.host.trim().is_empty()
            && !self.domain.trim().is_empty()
            && !self.domain_fullname.trim().is_empty()
    }
}

/// The directory connection: exposes its parameters and the credential-bind
/// primitive.
///
/// `bind` must fail with [`crate::IdentityError::InvalidCredentials`] when
/// the directory rejects the secret for an existing principal, and with
/// [`crate::IdentityError::DirectoryConnection`] for every other failure, so
/// the authenticator can classify outcomes.
#[async_trait]
pub trait DirectoryConnection: Send + Sync {
    fn connection_info(&self) -> &LdapConnectionInfo;

    async fn bind(&self, principal_name: &str, secret: &str) -> IdentityResult<()>;
}

/// Resolves a login name to a directory principal.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    /// Look up a principal by its principal name. `Ok(None)` means the
    /// directory has no such principal; errors mean the lookup itself
    /// failed.
    async fn resolve_by_principal_name(&self, name: &str) -> IdentityResult<Option<LdapUser>>;
}

/// Resolves the group memberships of a principal.
#[async_trait]
pub trait GroupResolver: Send + Sync {
    /// Return the names of every group the principal with the given
    /// distinguished name belongs to. An empty list is a valid result.
    async fn resolve_group_names_by_dn(&self, dn: &str) -> IdentityResult<Vec<String>>;
}
