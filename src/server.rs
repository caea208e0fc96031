//! HTTP server for DID resolution.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::ledger::LedgerClient;
use crate::resolver::Resolver;
use crate::router::{create_router, AppState};

/// Resolver server.
pub struct ResolverServer {
    config: Arc<Config>,
    resolver: Arc<Resolver>,
}

impl ResolverServer {
    /// Creates a new server resolving against `resolver`.
    pub fn new(config: Config, resolver: Resolver) -> Self {
        Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
        }
    }

    /// Runs the server.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = self.config.bind_address().parse()?;

        let state = AppState {
            resolver: self.resolver.clone(),
        };

        // Create router with middleware
        let app = create_router(state).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any)
                        .expose_headers(Any),
                ),
        );

        info!("DID resolver is starting at http://{}", addr);
        info!("Networks: {}", self.resolver.networks().join(", "));

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Returns the bind address.
    pub fn bind_address(&self) -> String {
        self.config.bind_address()
    }

    /// Returns the base URL of the resolution endpoint.
    pub fn base_url(&self) -> String {
        format!("http://{}/1.0/identifiers", self.bind_address())
    }
}

/// Builder for creating a resolver server.
pub struct ResolverServerBuilder {
    config: Config,
    resolver: Resolver,
}

impl ResolverServerBuilder {
    /// Creates a new builder with default configuration and no networks.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            resolver: Resolver::new(),
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the host address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Replaces the resolver and every network registered so far.
    pub fn resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Serves `network` from `ledger`.
    pub fn network(mut self, network: impl Into<String>, ledger: Arc<dyn LedgerClient>) -> Self {
        self.resolver = self.resolver.with_network(network, ledger);
        self
    }

    /// Builds the server.
    pub fn build(self) -> ResolverServer {
        ResolverServer::new(self.config, self.resolver)
    }
}

impl Default for ResolverServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
