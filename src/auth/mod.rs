//! # Authentication Module
//!
//! The services behind the gateway's three operations: cached directory
//! authentication, token-gated access, and group-membership queries.

pub mod groups;
pub mod service;
pub mod token;

pub use groups::GroupService;
pub use service::AuthService;
pub use token::{JwtTokenVerifier, TokenGate, TokenVerifier};
