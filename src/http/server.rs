//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the operator handlers
//! - Wire up middleware (request ID, tracing, CORS, timeout)
//! - Serve until the shutdown broadcast fires

use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::context::AgentContext;
use crate::http::handlers;
use crate::http::request;

/// Operator-facing HTTP server.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(ctx: AgentContext) -> Self {
        let timeout = Duration::from_secs(ctx.config.listener.request_timeout_secs);
        Self {
            router: Self::build_router(ctx, timeout),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(ctx: AgentContext, timeout: Duration) -> Router {
        Router::new()
            .route("/withdraw/{strategy}", post(handlers::withdraw))
            .route("/status", get(handlers::status))
            .with_state(ctx)
            .layer(TimeoutLayer::new(timeout))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn(request::request_id))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
