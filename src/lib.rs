//! # Identity Gateway Library
//!
//! An LDAP-backed identity gateway: it authenticates end users against a
//! directory service, verifies bearer tokens for subsequent requests, and
//! serves group memberships, while shielding the directory from redundant
//! load through layered in-memory caching.
//!
//! ## Architecture
//!
//! - `core`: error taxonomy, configuration, and shared data structures
//! - `caching`: the TTL + tag-indexed store, cache-key derivation, and the
//!   single-flight computation map
//! - `directory`: the collaborator traits over the external directory and
//!   the authenticator that drives lookup + bind through them
//! - `auth`: the cached authentication service, the group-membership
//!   service, and the token gate
//! - `gateway`: the HTTP boundary (axum router and server)
//!
//! All cache state is in-memory and TTL-bounded; it can be lost and rebuilt
//! transparently from the directory service.

pub mod auth;
pub mod caching;
pub mod core;
pub mod directory;
pub mod gateway;

pub use crate::core::config::GatewayConfig;
pub use crate::core::error::{IdentityError, IdentityResult};
pub use crate::core::types::{LdapUser, UserClaims};

pub use crate::auth::{AuthService, GroupService, JwtTokenVerifier, TokenGate, TokenVerifier};
pub use crate::directory::{
    DirectoryAuthenticator, DirectoryConnection, GroupResolver, PrincipalResolver,
};
pub use crate::gateway::{AppState, GatewayServer};
