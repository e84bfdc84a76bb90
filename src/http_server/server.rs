//! # HTTP Server
//!
//! Combines the route families into one Axum router and serves it.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::config::HttpServerConfig;
use super::mongo_routes::{mongo_routes, DocumentState};
use super::mssql_routes::{mssql_routes, RelationalState};
use super::observability_routes::health_routes;
use crate::observability::{Event, Logger};
use crate::store::{DocumentStore, RelationalStore};

/// HTTP server for the cities API
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server over the given stores.
    ///
    /// `relational` is `None` when the service runs without a relational
    /// store; the `/mssql` routes then answer with 500.
    pub fn new(
        config: HttpServerConfig,
        documents: Arc<dyn DocumentStore>,
        relational: Option<Arc<dyn RelationalStore>>,
    ) -> Self {
        let document_state = Arc::new(DocumentState::new(documents));
        let relational_state = Arc::new(match relational {
            Some(store) => RelationalState::new(store),
            None => RelationalState::uninitialized(),
        });

        let router = Self::build_router(&config, document_state, relational_state);
        Self { config, router }
    }

    /// Build the combined router with all endpoints
    fn build_router(
        config: &HttpServerConfig,
        document_state: Arc<DocumentState>,
        relational_state: Arc<RelationalState>,
    ) -> Router {
        let router = Router::new()
            .merge(health_routes())
            .nest("/mongo", mongo_routes(document_state))
            .nest("/mssql", mssql_routes(relational_state));

        match Self::cors_layer(config) {
            Some(cors) => router.layer(cors),
            None => router,
        }
    }

    /// CORS is only enabled when origins are configured. Origins are
    /// checked by `ServiceConfig::validate` before the server is built.
    fn cors_layer(config: &HttpServerConfig) -> Option<CorsLayer> {
        if config.cors_origins.is_empty() {
            return None;
        }

        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();

        Some(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any),
        )
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind the listener and serve until the process exits
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr = self
            .config
            .parse_socket_addr()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?.to_string();
        Logger::event(Event::Serving, &[("addr", local_addr.as_str())]);

        axum::serve(listener, self.router).await
    }
}
