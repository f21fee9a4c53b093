//! axum integration for keel sessions.
//!
//! This crate wires a [`keel_session::Manager`] into an HTTP service:
//!
//! - Session middleware that starts or resumes a session on every request
//! - A login gate rejecting non-public paths without a logged-in user
//! - Account routes (login, logout, current user)
//! - Background session garbage collection tied to the server lifetime
//!
//! # Example
//!
//! ```ignore
//! use keel_server::{Server, ServerConfig, StaticCredentials};
//! use keel_session::ProviderRegistry;
//!
//! let registry = ProviderRegistry::with_defaults();
//! let auth = StaticCredentials::new().with_user("alice", "wonderland");
//! let server = Server::new(&registry, ServerConfig::default(), Arc::new(auth))?;
//! server.run().await?;
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use auth::{Authenticator, Credentials, StaticCredentials, USER_KEY, User};
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use middleware::{CurrentSession, SessionAccess, session_middleware};
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::from_fn_with_state,
};
use keel_session::ProviderRegistry;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The keel HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a new server, resolving the session provider from `registry`.
    pub fn new(
        registry: &ProviderRegistry,
        config: ServerConfig,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self> {
        Ok(Self {
            state: AppState::new(registry, config, authenticator)?,
        })
    }

    /// Application state shared with handlers.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Result<Router> {
        let router = Router::new()
            .merge(routes::health_routes())
            .merge(routes::account_routes())
            .layer(from_fn_with_state(self.state.clone(), session_middleware))
            .layer(TraceLayer::new_for_http());

        let router = match &self.state.config.cors_origin {
            Some(origin) => router.layer(cors_layer(origin)?),
            None => router,
        };

        Ok(router.with_state(self.state.clone()))
    }

    /// Run the server until ctrl-c.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr, shutdown_signal()).await
    }

    /// Run the server on a specific address until `shutdown` resolves.
    ///
    /// Session garbage collection runs for exactly as long as the server.
    pub async fn run_on<F>(self, addr: SocketAddr, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router()?;
        let gc = self
            .state
            .manager
            .spawn_gc(self.state.config.session.gc_interval());

        info!("Starting server on {}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)));

        gc.shutdown().await;
        info!("Server stopped");
        served
    }
}

/// CORS for a single origin with credentials, so browsers send the session cookie.
fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin)
        .map_err(|e| ServerError::Internal(format!("Invalid CORS origin '{origin}': {e}")))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT_ENCODING]))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
