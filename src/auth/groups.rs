//! # Group Membership Service
//!
//! TTL-bounded, tag-indexed cache mapping an account name to its resolved
//! group names. Populated eagerly after a successful authentication (see
//! [`crate::auth::service::AuthService`]) and lazily on direct membership
//! queries.

use crate::caching::{keys, TtlCache};
use crate::core::error::IdentityResult;
use crate::core::types::LdapUser;
use crate::directory::GroupResolver;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Read-through cache over the directory's group-membership resolution.
pub struct GroupService {
    resolver: Arc<dyn GroupResolver>,
    cache: TtlCache<Vec<String>>,
    ttl: Duration,
}

impl GroupService {
    pub fn new(
        resolver: Arc<dyn GroupResolver>,
        ttl: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            resolver,
            cache: TtlCache::new(cleanup_interval),
            ttl,
        }
    }

    /// Get the group names for an account, resolving through the directory
    /// on a miss.
    ///
    /// With `clear_first` the entry is evicted before the read, forcing a
    /// fresh resolution even when an unexpired entry exists. An account with
    /// no memberships yields an empty list, not an error.
    pub async fn get_groups(
        &self,
        sam_account_name: &str,
        distinguished_name: &str,
        clear_first: bool,
    ) -> IdentityResult<Vec<String>> {
        let key = keys::groups_key(sam_account_name);

        if clear_first {
            self.cache.remove(&key);
        } else if let Some(groups) = self.cache.get(&key) {
            return Ok(groups);
        }

        let groups = self.resolve(distinguished_name).await?;
        self.cache.insert(
            &key,
            groups.clone(),
            self.ttl,
            &[sam_account_name.to_string()],
        );
        Ok(groups)
    }

    /// Populate the cache for a freshly authenticated user.
    ///
    /// Used by the post-login warm-up task; always resolves and replaces the
    /// entry so the warm copy reflects the directory at login time.
    pub async fn warm(&self, user: &LdapUser) -> IdentityResult<()> {
        let groups = self.resolve(&user.distinguished_name).await?;
        debug!(
            account = %user.sam_account_name,
            groups = groups.len(),
            "warmed group membership cache"
        );
        self.cache.insert(
            &keys::groups_key(&user.sam_account_name),
            groups,
            self.ttl,
            &[user.sam_account_name.clone()],
        );
        Ok(())
    }

    /// Drop every membership entry tagged with the account name.
    pub fn invalidate_account(&self, sam_account_name: &str) -> usize {
        self.cache.remove_by_tag(sam_account_name)
    }

    /// Resolve through the directory, normalizing to an ordered,
    /// de-duplicated list.
    async fn resolve(&self, distinguished_name: &str) -> IdentityResult<Vec<String>> {
        let mut groups = self
            .resolver
            .resolve_group_names_by_dn(distinguished_name)
            .await?;
        groups.sort();
        groups.dedup();
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockGroupResolver {
        groups: Vec<String>,
        calls: AtomicUsize,
    }

    impl MockGroupResolver {
        fn new(groups: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                groups: groups.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GroupResolver for MockGroupResolver {
        async fn resolve_group_names_by_dn(&self, _dn: &str) -> IdentityResult<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.groups.clone())
        }
    }

    fn service(resolver: Arc<MockGroupResolver>) -> GroupService {
        GroupService::new(resolver, Duration::from_secs(60), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_read_through_and_cache_hit() {
        let resolver = MockGroupResolver::new(&["staff", "admins"]);
        let svc = service(resolver.clone());

        let first = svc
            .get_groups("alice", "CN=Alice,DC=example,DC=com", false)
            .await
            .unwrap();
        assert_eq!(first, vec!["admins".to_string(), "staff".to_string()]);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);

        let second = svc
            .get_groups("alice", "CN=Alice,DC=example,DC=com", false)
            .await
            .unwrap();
        assert_eq!(second, first);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_first_forces_fresh_resolution() {
        let resolver = MockGroupResolver::new(&["staff"]);
        let svc = service(resolver.clone());

        svc.get_groups("alice", "dn", false).await.unwrap();
        svc.get_groups("alice", "dn", true).await.unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_membership_is_success() {
        let resolver = MockGroupResolver::new(&[]);
        let svc = service(resolver);

        let groups = svc.get_groups("alice", "dn", false).await.unwrap();
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn test_groups_are_sorted_and_deduplicated() {
        let resolver = MockGroupResolver::new(&["staff", "admins", "staff"]);
        let svc = service(resolver);

        let groups = svc.get_groups("alice", "dn", false).await.unwrap();
        assert_eq!(groups, vec!["admins".to_string(), "staff".to_string()]);
    }

    #[tokio::test]
    async fn test_warm_then_read_hits_cache() {
        let resolver = MockGroupResolver::new(&["staff"]);
        let svc = service(resolver.clone());
        let user = LdapUser::new("CN=Alice,DC=example,DC=com", "alice@example.com", "alice");

        svc.warm(&user).await.unwrap();
        let groups = svc.get_groups("alice", &user.distinguished_name, false).await.unwrap();
        assert_eq!(groups, vec!["staff".to_string()]);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_account_drops_entry() {
        let resolver = MockGroupResolver::new(&["staff"]);
        let svc = service(resolver.clone());

        svc.get_groups("alice", "dn", false).await.unwrap();
        assert_eq!(svc.invalidate_account("alice"), 1);

        svc.get_groups("alice", "dn", false).await.unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }
}
