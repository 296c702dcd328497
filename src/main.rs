//! # Identity Gateway - Main Entry Point
//!
//! Loads configuration, wires the cache-backed services around a directory
//! implementation, and serves the HTTP boundary until a shutdown signal.
//!
//! The directory backend is selected at startup. This binary ships with the
//! fixture backend (`GATEWAY_FIXTURE_FILE`, a YAML user list) for local
//! development; production deployments wire a real directory implementation
//! through the library API instead of running this binary as-is.

use std::sync::Arc;

use tracing::{error, info};

use identity_gateway::auth::{AuthService, GroupService, JwtTokenVerifier, TokenGate};
use identity_gateway::directory::{
    DirectoryAuthenticator, FixtureDirectory, FixtureUser, LdapConnectionInfo,
};
use identity_gateway::gateway::{AppState, GatewayServer};
use identity_gateway::{GatewayConfig, IdentityError, IdentityResult};

#[tokio::main]
async fn main() -> IdentityResult<()> {
    init_observability();

    info!("starting identity gateway");
    info!("version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_config().await?;

    let server = build_server(config).await?;
    if let Err(e) = server.run().await {
        error!("gateway terminated with error: {}", e);
        std::process::exit(1);
    }

    info!("identity gateway shutdown complete");
    Ok(())
}

/// Initialize structured logging.
fn init_observability() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true).json())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_gateway=info,tower_http=debug".into()),
        )
        .init();
}

/// Load configuration from `GATEWAY_CONFIG` (YAML path) or defaults plus
/// environment overrides.
async fn load_config() -> IdentityResult<GatewayConfig> {
    match std::env::var("GATEWAY_CONFIG") {
        Ok(path) => {
            info!(%path, "loading configuration file");
            GatewayConfig::load_from_file(path).await
        }
        Err(_) => {
            let config = GatewayConfig::from_env()?;
            config.validate()?;
            Ok(config)
        }
    }
}

/// Wire the caches, services, and directory backend into a server.
async fn build_server(config: GatewayConfig) -> IdentityResult<GatewayServer> {
    let directory = Arc::new(load_fixture_directory(&config).await?);

    let authenticator = Arc::new(DirectoryAuthenticator::new(
        directory.clone(),
        directory.clone(),
        config.cache.not_found_ttl,
        config.cache.cleanup_interval,
    ));
    let groups = Arc::new(GroupService::new(
        directory,
        config.cache.groups_ttl,
        config.cache.cleanup_interval,
    ));
    let auth = Arc::new(AuthService::new(
        authenticator,
        groups.clone(),
        config.cache.auth_ttl,
        config.cache.cleanup_interval,
    ));
    let gate = Arc::new(TokenGate::new(
        Arc::new(JwtTokenVerifier::new(&config.token)),
        &config.token,
    ));

    let state = Arc::new(AppState { auth, groups, gate });
    Ok(GatewayServer::new(config, state))
}

/// Load the fixture directory backend from `GATEWAY_FIXTURE_FILE`.
async fn load_fixture_directory(config: &GatewayConfig) -> IdentityResult<FixtureDirectory> {
    let path = std::env::var("GATEWAY_FIXTURE_FILE").map_err(|_| {
        IdentityError::config(
            "no directory backend configured: set GATEWAY_FIXTURE_FILE or embed this crate \
             with a real directory implementation",
        )
    })?;

    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| IdentityError::config(format!("failed to read fixture file: {}", e)))?;
    let users: Vec<FixtureUser> = serde_yaml::from_str(&content)?;
    info!(%path, users = users.len(), "loaded fixture directory");

    Ok(FixtureDirectory::new(
        LdapConnectionInfo {
            host: config.ldap.host.clone(),
            domain: config.ldap.domain.clone(),
            domain_fullname: config.ldap.domain_fullname.clone(),
        },
        users,
    ))
}
