//! HTTP server for the knowledge base.
//!
//! This crate binds the session store to HTTP: it speaks the two-cookie
//! session protocol, evaluates route guards, and serves the login, logout
//! and roster endpoints.
//!
//! # Features
//!
//! - Cookie-backed sessions (`knowledge_base` private token, `kb-public` username)
//! - Route guards: logged in, is user, organization/team member or admin
//! - Request logging
//! - Optional credentialed CORS
//!
//! # Example
//!
//! ```ignore
//! use kb_server::{AppState, CookieConfig, Server, ServerConfig};
//!
//! let state = AppState::new(
//!     ServerConfig::new().with_bind_address("127.0.0.1:3001".parse()?),
//!     session_store,
//!     CookieConfig::default(),
//!     roster,
//!     credentials,
//! );
//! Server::from_state(state).run().await?;
//! ```

pub mod auth;
pub mod config;
pub mod cookies;
pub mod error;
pub mod logging;
pub mod policy;
pub mod routes;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;

pub use config::ServerConfig;
pub use cookies::{CookieConfig, SetCookies, jar_from_headers};
pub use error::{ErrorResponse, Result, ServerError};
pub use logging::request_logging_middleware;
pub use policy::{Decision, Denial, Guard, PolicyEvaluator, Requirement, RosterScope};
pub use routes::{LoginRequest, LoginResponse, RosterResponse, SessionInfo};
pub use session::SessionManager;
pub use state::AppState;

use std::net::SocketAddr;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// The knowledge base HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(routes::health_routes())
            .merge(routes::user_routes(&self.state))
            .merge(routes::organization_routes(&self.state))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http());

        if let Some(cors) = self.cors_layer() {
            router = router.layer(cors);
        }

        router.with_state(self.state.clone())
    }

    /// Credentialed CORS for the configured origins, if any.
    fn cors_layer(&self) -> Option<CorsLayer> {
        let origins: Vec<HeaderValue> = self
            .state
            .config
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        if origins.is_empty() {
            return None;
        }

        Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true),
        )
    }

    /// Run the server on the configured address.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let router = self.router();

        match listener.local_addr() {
            Ok(addr) => info!("Starting server on {}", addr),
            Err(_) => info!("Starting server"),
        }

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}
