//! # Fixture Directory
//!
//! An in-memory implementation of the directory collaborator traits, backed
//! by a user list from the configuration file. Intended for local
//! development and integration tests; production deployments wire a real
//! directory implementation instead.
//!
//! Secrets in a fixture file are development fixtures, nothing here ever
//! writes them to a cache or a log line.

use crate::core::error::{IdentityError, IdentityResult};
use crate::core::types::LdapUser;
use crate::directory::{DirectoryConnection, GroupResolver, LdapConnectionInfo, PrincipalResolver};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// One user of the fixture directory.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureUser {
    pub user_principal_name: String,
    pub sam_account_name: String,
    #[serde(default)]
    pub distinguished_name: String,
    #[serde(default)]
    pub display_name: String,
    pub password: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// In-memory directory over a fixed user list.
pub struct FixtureDirectory {
    info: LdapConnectionInfo,
    users: HashMap<String, FixtureUser>,
}

impl FixtureDirectory {
    pub fn new(info: LdapConnectionInfo, users: Vec<FixtureUser>) -> Self {
        let users = users
            .into_iter()
            .map(|u| (u.user_principal_name.clone(), u))
            .collect();
        Self { info, users }
    }
}

#[async_trait]
impl DirectoryConnection for FixtureDirectory {
    fn connection_info(&self) -> &LdapConnectionInfo {
        &self.info
    }

    async fn bind(&self, principal_name: &str, secret: &str) -> IdentityResult<()> {
        match self.users.get(principal_name) {
            Some(user) if user.password == secret => Ok(()),
            Some(_) => Err(IdentityError::InvalidCredentials),
            None => Err(IdentityError::directory_connection(
                "bind principal is unknown to the fixture directory",
            )),
        }
    }
}

#[async_trait]
impl PrincipalResolver for FixtureDirectory {
    async fn resolve_by_principal_name(&self, name: &str) -> IdentityResult<Option<LdapUser>> {
        Ok(self.users.get(name).map(|u| {
            LdapUser::new(
                u.distinguished_name.clone(),
                u.user_principal_name.clone(),
                u.sam_account_name.clone(),
            )
            .with_display_name(u.display_name.clone())
        }))
    }
}

#[async_trait]
impl GroupResolver for FixtureDirectory {
    async fn resolve_group_names_by_dn(&self, dn: &str) -> IdentityResult<Vec<String>> {
        Ok(self
            .users
            .values()
            .find(|u| u.distinguished_name == dn || u.user_principal_name == dn)
            .map(|u| u.groups.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> FixtureDirectory {
        FixtureDirectory::new(
            LdapConnectionInfo {
                host: "fixture".to_string(),
                domain: "EXAMPLE".to_string(),
                domain_fullname: "example.com".to_string(),
            },
            vec![FixtureUser {
                user_principal_name: "alice@example.com".to_string(),
                sam_account_name: "alice".to_string(),
                distinguished_name: "CN=Alice,DC=example,DC=com".to_string(),
                display_name: "Alice Doe".to_string(),
                password: "p1".to_string(),
                groups: vec!["staff".to_string()],
            }],
        )
    }

    #[tokio::test]
    async fn test_bind_outcomes() {
        let dir = directory();
        assert!(dir.bind("alice@example.com", "p1").await.is_ok());
        assert!(matches!(
            dir.bind("alice@example.com", "wrong").await.unwrap_err(),
            IdentityError::InvalidCredentials
        ));
    }

    #[tokio::test]
    async fn test_resolution() {
        let dir = directory();
        let user = dir
            .resolve_by_principal_name("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.sam_account_name, "alice");
        assert!(dir
            .resolve_by_principal_name("bob@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_group_resolution_by_dn() {
        let dir = directory();
        let groups = dir
            .resolve_group_names_by_dn("CN=Alice,DC=example,DC=com")
            .await
            .unwrap();
        assert_eq!(groups, vec!["staff".to_string()]);
        assert!(dir
            .resolve_group_names_by_dn("CN=Nobody")
            .await
            .unwrap()
            .is_empty());
    }
}
