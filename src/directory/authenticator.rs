//! # Directory Authenticator
//!
//! Performs the actual identity lookup and credential bind against the
//! directory service, with the negative-existence cache in front of it.
//!
//! Bind failures are classified: a rejected secret for an existing principal
//! is an expected outcome and neither logged as an error nor negative-cached
//! (the identity exists, only the secret was wrong). Everything else is a
//! directory problem, logged at error level.

use crate::caching::{keys, TtlCache};
use crate::core::error::{IdentityError, IdentityResult};
use crate::core::types::LdapUser;
use crate::directory::{DirectoryConnection, PrincipalResolver};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Authenticates a credential pair against the directory service.
pub struct DirectoryAuthenticator {
    connection: Arc<dyn DirectoryConnection>,
    resolver: Arc<dyn PrincipalResolver>,

    /// Negative-existence cache: short-TTL markers for login names the
    /// directory does not know, to suppress repeated lookups during
    /// invalid-login storms.
    not_found: TtlCache<bool>,
    not_found_ttl: Duration,
}

impl DirectoryAuthenticator {
    pub fn new(
        connection: Arc<dyn DirectoryConnection>,
        resolver: Arc<dyn PrincipalResolver>,
        not_found_ttl: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            connection,
            resolver,
            not_found: TtlCache::new(cleanup_interval),
            not_found_ttl,
        }
    }

    /// Whether a previous lookup already proved this login name does not
    /// exist (and the proof has not expired).
    pub fn is_known_missing(&self, username: &str) -> bool {
        self.not_found.contains(&keys::not_found_key(username))
    }

    /// Record that the directory has no principal for this login name.
    pub fn mark_missing(&self, username: &str) {
        self.not_found
            .insert(&keys::not_found_key(username), true, self.not_found_ttl, &[]);
    }

    /// Authenticate a credential pair against the directory.
    ///
    /// Steps, in order: blank-credential rejection, negative-cache
    /// short-circuit, connection-parameter validation, principal resolution,
    /// credential bind, distinguished-name backfill.
    pub async fn authenticate(&self, username: &str, password: &str) -> IdentityResult<LdapUser> {
        if username.trim().is_empty() || password.trim().is_empty() {
            return Err(IdentityError::BlankCredentials);
        }

        if self.is_known_missing(username) {
            warn!(username, "login for user recently proven missing");
            return Err(IdentityError::user_not_found(username));
        }

        let info = self.connection.connection_info();
        if !info.is_complete() {
            error!(
                host = %info.host,
                domain = %info.domain,
                domain_fullname = %info.domain_fullname,
                "invalid directory configuration"
            );
            return Err(IdentityError::directory_config(
                "LDAP host, domain and full domain name must all be configured",
            ));
        }

        let mut user = match self.resolver.resolve_by_principal_name(username).await? {
            Some(user) => user,
            None => {
                self.mark_missing(username);
                warn!(username, "user not found in directory");
                return Err(IdentityError::user_not_found(username));
            }
        };

        match self
            .connection
            .bind(&user.user_principal_name, password)
            .await
        {
            Ok(()) => {}
            Err(IdentityError::InvalidCredentials) => {
                // The principal exists; only the secret was wrong.
                debug!(username, "directory rejected credentials");
                return Err(IdentityError::InvalidCredentials);
            }
            Err(err) => {
                error!(username, error = %err, host = %info.host, "directory bind failed");
                return Err(err);
            }
        }

        if user.distinguished_name.trim().is_empty() {
            // Some directories omit the DN attribute; fall back to the
            // supplied login name so downstream group resolution has a key.
            user.distinguished_name = username.to_string();
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::LdapConnectionInfo;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    struct MockConnection {
        info: LdapConnectionInfo,
        bind_result: fn() -> IdentityResult<()>,
        bind_calls: AtomicUsize,
    }

    impl MockConnection {
        fn new(bind_result: fn() -> IdentityResult<()>) -> Self {
            Self {
                info: LdapConnectionInfo {
                    host: "dc01.example.com".to_string(),
                    domain: "EXAMPLE".to_string(),
                    domain_fullname: "example.com".to_string(),
                },
                bind_result,
                bind_calls: AtomicUsize::new(0),
            }
        }

        fn unconfigured(bind_result: fn() -> IdentityResult<()>) -> Self {
            Self {
                info: LdapConnectionInfo::default(),
                bind_result,
                bind_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DirectoryConnection for MockConnection {
        fn connection_info(&self) -> &LdapConnectionInfo {
            &self.info
        }

        async fn bind(&self, _principal_name: &str, _secret: &str) -> IdentityResult<()> {
            self.bind_calls.fetch_add(1, Ordering::SeqCst);
            (self.bind_result)()
        }
    }

    /// Counts ERROR-level events emitted while the guard is alive.
    struct ErrorCounter {
        errors: Arc<AtomicUsize>,
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorCounter {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.errors.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn count_errors() -> (Arc<AtomicUsize>, tracing::subscriber::DefaultGuard) {
        use tracing_subscriber::layer::SubscriberExt;

        let errors = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(ErrorCounter {
            errors: errors.clone(),
        });
        (errors, tracing::subscriber::set_default(subscriber))
    }

    struct MockResolver {
        known_user: Option<LdapUser>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PrincipalResolver for MockResolver {
        async fn resolve_by_principal_name(&self, name: &str) -> IdentityResult<Option<LdapUser>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .known_user
                .clone()
                .filter(|u| u.user_principal_name == name))
        }
    }

    fn alice() -> LdapUser {
        LdapUser::new("CN=Alice,DC=example,DC=com", "alice@example.com", "alice")
    }

    fn authenticator(
        connection: Arc<MockConnection>,
        resolver: Arc<MockResolver>,
        not_found_ttl: Duration,
    ) -> DirectoryAuthenticator {
        DirectoryAuthenticator::new(connection, resolver, not_found_ttl, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_blank_credentials_rejected_before_any_lookup() {
        let connection = Arc::new(MockConnection::new(|| Ok(())));
        let resolver = Arc::new(MockResolver {
            known_user: Some(alice()),
            calls: AtomicUsize::new(0),
        });
        let auth = authenticator(connection.clone(), resolver.clone(), Duration::from_secs(30));

        for (u, p) in [("", "p1"), ("alice@example.com", ""), ("  ", "p1")] {
            let err = auth.authenticate(u, p).await.unwrap_err();
            assert!(matches!(err, IdentityError::BlankCredentials));
        }
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        assert_eq!(connection.bind_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_authentication() {
        let connection = Arc::new(MockConnection::new(|| Ok(())));
        let resolver = Arc::new(MockResolver {
            known_user: Some(alice()),
            calls: AtomicUsize::new(0),
        });
        let auth = authenticator(connection, resolver, Duration::from_secs(30));

        let user = auth.authenticate("alice@example.com", "p1").await.unwrap();
        assert_eq!(user.sam_account_name, "alice");
    }

    #[tokio::test]
    async fn test_unknown_user_marks_negative_cache() {
        let connection = Arc::new(MockConnection::new(|| Ok(())));
        let resolver = Arc::new(MockResolver {
            known_user: None,
            calls: AtomicUsize::new(0),
        });
        let auth = authenticator(connection, resolver.clone(), Duration::from_secs(30));

        let err = auth.authenticate("bob@example.com", "p1").await.unwrap_err();
        assert!(matches!(err, IdentityError::UserNotFound { .. }));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);

        // Second attempt inside the window fails without a resolver call.
        let err = auth.authenticate("bob@example.com", "p1").await.unwrap_err();
        assert!(matches!(err, IdentityError::UserNotFound { .. }));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_negative_cache_expiry_allows_new_lookup() {
        let connection = Arc::new(MockConnection::new(|| Ok(())));
        let resolver = Arc::new(MockResolver {
            known_user: None,
            calls: AtomicUsize::new(0),
        });
        let auth = authenticator(connection, resolver.clone(), Duration::from_millis(40));

        let _ = auth.authenticate("bob@example.com", "p1").await;
        sleep(Duration::from_millis(60)).await;
        let _ = auth.authenticate("bob@example.com", "p1").await;

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_credentials_not_negative_cached() {
        let connection = Arc::new(MockConnection::new(|| Err(IdentityError::InvalidCredentials)));
        let resolver = Arc::new(MockResolver {
            known_user: Some(alice()),
            calls: AtomicUsize::new(0),
        });
        let auth = authenticator(connection, resolver.clone(), Duration::from_secs(30));

        let err = auth
            .authenticate("alice@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));
        assert!(!auth.is_known_missing("alice@example.com"));

        // The identity exists, so a retry still consults the directory.
        let _ = auth.authenticate("alice@example.com", "wrong").await;
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connection_failure_surfaces_as_directory_error() {
        let connection = Arc::new(MockConnection::new(|| {
            Err(IdentityError::directory_connection("connection refused"))
        }));
        let resolver = Arc::new(MockResolver {
            known_user: Some(alice()),
            calls: AtomicUsize::new(0),
        });
        let auth = authenticator(connection, resolver, Duration::from_secs(30));

        let err = auth
            .authenticate("alice@example.com", "p1")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::DirectoryConnection { .. }));
        assert!(!auth.is_known_missing("alice@example.com"));
    }

    #[tokio::test]
    async fn test_invalid_credentials_never_logged_at_error_level() {
        let (errors, _guard) = count_errors();
        let connection = Arc::new(MockConnection::new(|| Err(IdentityError::InvalidCredentials)));
        let resolver = Arc::new(MockResolver {
            known_user: Some(alice()),
            calls: AtomicUsize::new(0),
        });
        let auth = authenticator(connection, resolver, Duration::from_secs(30));

        let err = auth
            .authenticate("alice@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));
        // A rejected secret is a routine outcome, not a directory problem.
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_connection_failure_logged_at_error_level() {
        let (errors, _guard) = count_errors();
        let connection = Arc::new(MockConnection::new(|| {
            Err(IdentityError::directory_connection("connection refused"))
        }));
        let resolver = Arc::new(MockResolver {
            known_user: Some(alice()),
            calls: AtomicUsize::new(0),
        });
        let auth = authenticator(connection, resolver, Duration::from_secs(30));

        let err = auth
            .authenticate("alice@example.com", "p1")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::DirectoryConnection { .. }));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_configuration_is_fatal() {
        let connection = Arc::new(MockConnection::unconfigured(|| Ok(())));
        let resolver = Arc::new(MockResolver {
            known_user: Some(alice()),
            calls: AtomicUsize::new(0),
        });
        let auth = authenticator(connection.clone(), resolver.clone(), Duration::from_secs(30));

        let err = auth
            .authenticate("alice@example.com", "p1")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::DirectoryConfiguration { .. }));
        // Nothing reached the directory.
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        assert_eq!(connection.bind_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_distinguished_name_backfill() {
        let connection = Arc::new(MockConnection::new(|| Ok(())));
        let mut user = alice();
        user.distinguished_name = String::new();
        let resolver = Arc::new(MockResolver {
            known_user: Some(user),
            calls: AtomicUsize::new(0),
        });
        let auth = authenticator(connection, resolver, Duration::from_secs(30));

        let user = auth.authenticate("alice@example.com", "p1").await.unwrap();
        assert_eq!(user.distinguished_name, "alice@example.com");
    }
}
