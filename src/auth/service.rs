//! # Authentication Service
//!
//! The authentication-result cache in front of the directory authenticator.
//!
//! A login flows: key derivation -> cache read -> (miss) single-flight
//! directory authentication -> tag-indexed cache write -> detached group
//! warm-up. Concurrent logins with the same credential pair share one
//! directory round-trip; failures propagate to every waiter and are never
//! cached here (nonexistent identities are handled by the authenticator's
//! negative-existence cache).

use crate::auth::groups::GroupService;
use crate::caching::{keys, SingleFlight, TtlCache};
use crate::core::error::{IdentityError, IdentityResult};
use crate::core::types::LdapUser;
use crate::directory::DirectoryAuthenticator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cached, de-duplicated authentication over the directory service.
pub struct AuthService {
    authenticator: Arc<DirectoryAuthenticator>,
    groups: Arc<GroupService>,
    cache: Arc<TtlCache<LdapUser>>,
    flight: SingleFlight<LdapUser>,
    auth_ttl: Duration,
}

impl AuthService {
    pub fn new(
        authenticator: Arc<DirectoryAuthenticator>,
        groups: Arc<GroupService>,
        auth_ttl: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            authenticator,
            groups,
            cache: Arc::new(TtlCache::new(cleanup_interval)),
            flight: SingleFlight::new(),
            auth_ttl,
        }
    }

    /// Authenticate a credential pair, serving repeated logins from the
    /// cache.
    ///
    /// A hit returns the cached identity without any directory traffic. On a
    /// miss, concurrent callers with the same credentials attach to a single
    /// in-flight directory authentication; its outcome (success or failure)
    /// is what every one of them observes.
    pub async fn authenticate(&self, username: &str, password: &str) -> IdentityResult<LdapUser> {
        if username.trim().is_empty() || password.trim().is_empty() {
            return Err(IdentityError::BlankCredentials);
        }

        let key = keys::auth_key(username, password);

        if let Some(user) = self.cache.get(&key) {
            debug!(username, "authentication served from cache");
            return Ok(user);
        }

        self.flight
            .run(
                &key,
                Self::bind_and_cache(
                    self.authenticator.clone(),
                    self.groups.clone(),
                    self.cache.clone(),
                    self.auth_ttl,
                    key.clone(),
                    username.to_string(),
                    password.to_string(),
                ),
            )
            .await
    }

    /// The flight body: directory authentication followed by the tagged
    /// cache write and the detached membership warm-up.
    async fn bind_and_cache(
        authenticator: Arc<DirectoryAuthenticator>,
        groups: Arc<GroupService>,
        cache: Arc<TtlCache<LdapUser>>,
        auth_ttl: Duration,
        key: String,
        username: String,
        password: String,
    ) -> IdentityResult<LdapUser> {
        // A miss observed before the flight can be stale: another caller may
        // run an entire flight to completion between the cache read and this
        // point. Re-check so the late arrival reads the fresh entry instead
        // of binding a second time.
        if let Some(user) = cache.get(&key) {
            debug!(%username, "authentication served from cache after stale miss");
            return Ok(user);
        }

        let user = authenticator.authenticate(&username, &password).await?;

        // The write happens before the in-flight handle resolves,
        // so late callers find the entry instead of recomputing.
        cache.insert(&key, user.clone(), auth_ttl, &[user.sam_account_name.clone()]);
        info!(account = %user.sam_account_name, "authenticated against directory");

        // Fire-and-forget membership warm-up: the login response
        // neither waits for it nor fails because of it.
        let warm_user = user.clone();
        tokio::spawn(async move {
            if let Err(err) = groups.warm(&warm_user).await {
                warn!(
                    account = %warm_user.sam_account_name,
                    error = %err,
                    "background group membership population failed"
                );
            }
        });

        Ok(user)
    }

    /// Drop every cached authentication result and group membership for the
    /// account, forcing the next login of any of its credential variants to
    /// go to the directory. Returns the number of entries removed.
    pub fn invalidate_account(&self, sam_account_name: &str) -> usize {
        let removed = self.cache.remove_by_tag(sam_account_name)
            + self.groups.invalidate_account(sam_account_name);
        if removed > 0 {
            info!(account = %sam_account_name, removed, "invalidated cached entries for account");
        }
        removed
    }
}
