//! # Gateway Server
//!
//! The HTTP boundary over the core services. Handlers are deliberately thin:
//! extract the request, call the service, let [`IdentityError`]'s
//! `IntoResponse` impl map failures to status codes. Everything
//! identity-bound behind `/api/groups` runs only after the token gate
//! accepted the request.

use crate::auth::{AuthService, GroupService, TokenGate};
use crate::core::config::GatewayConfig;
use crate::core::error::{IdentityError, IdentityResult};
use crate::core::types::{LoginRequest, LoginResponse};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state for the HTTP handlers.
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub groups: Arc<GroupService>,
    pub gate: Arc<TokenGate>,
}

/// The identity gateway HTTP server.
pub struct GatewayServer {
    config: GatewayConfig,
    state: Arc<AppState>,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Build the router. Exposed separately so tests can drive it without
    /// binding a socket.
    pub fn router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/api/login", post(login))
            .route("/api/verify", post(verify_token))
            .route("/api/groups", get(get_groups))
            .route("/health", get(health))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
            .with_state(state)
    }

    /// Serve until the shutdown signal fires.
    pub async fn run(self) -> IdentityResult<()> {
        let addr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.http_port
        );
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(%addr, "identity gateway listening");

        let app = Self::router(self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| IdentityError::internal(format!("server error: {}", e)))?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install shutdown signal handler");
        return;
    }
    info!("shutdown signal received");
}

async fn health() -> &'static str {
    "ok"
}

/// `POST /api/login` — authenticate a credential pair.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, IdentityError> {
    let user = state
        .auth
        .authenticate(&request.username, &request.password)
        .await?;
    Ok(Json(LoginResponse { user }))
}

/// `POST /api/verify` — pass/fail verification of the presented token.
async fn verify_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, IdentityError> {
    state.gate.verify_headers(&headers).await?;
    Ok(Json(serde_json::json!({ "valid": true })))
}

#[derive(Debug, Deserialize)]
struct GroupsQuery {
    #[serde(default)]
    clear_cache: bool,
}

/// `GET /api/groups` — the requester's group memberships.
///
/// The token gate runs first; only then are the identity claims read and the
/// membership cache consulted.
async fn get_groups(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GroupsQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, IdentityError> {
    let claims = state.gate.claims_from_headers(&headers).await?;

    // Both identity claims are required: the account name keys (and tags)
    // the membership cache, so a blank one would alias distinct principals
    // onto a single shared entry.
    if claims.sam_account_name.trim().is_empty() || claims.distinguished_name.trim().is_empty() {
        warn!(
            principal = %claims.user_principal_name,
            "token is missing identity claims"
        );
        return Err(IdentityError::user_not_found(claims.user_principal_name));
    }

    let groups = state
        .groups
        .get_groups(
            &claims.sam_account_name,
            &claims.distinguished_name,
            query.clear_cache,
        )
        .await?;
    Ok(Json(groups))
}
