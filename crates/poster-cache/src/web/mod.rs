//! Web layer module
//!
//! HTTP interface of the poster cache:
//!
//! - `GET /api/images/{item_id}`: serve a transformed poster
//! - `POST /api/reconcile`: run a reconciliation sweep now
//! - `GET /api/cache/stats`: cache size and last sweep
//! - `GET /health`: liveness

use anyhow::Result;
use axum::{
    Router,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::{
    config::Config,
    services::{CatalogReconciler, PosterCacheService},
};

pub mod handlers;
pub mod responses;

pub use responses::{ApiResponse, handle_error, handle_result};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub posters: PosterCacheService,
    pub reconciler: Arc<CatalogReconciler>,
    /// `max-age` advertised on served posters
    pub image_max_age: Duration,
    /// Cron expression of the scheduled sweep, `None` when disabled
    pub reconcile_schedule: Option<String>,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: &Config,
        posters: PosterCacheService,
        reconciler: Arc<CatalogReconciler>,
    ) -> Self {
        Self {
            posters,
            reconciler,
            image_max_age: config.web.image_max_age,
            reconcile_schedule: config
                .reconcile
                .enabled
                .then(|| config.reconcile.schedule.clone()),
            start_time: Utc::now(),
        }
    }
}

/// Create the router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/images/{item_id}", get(handlers::images::get_poster))
        .route("/api/reconcile", post(handlers::reconcile::trigger_reconcile))
        .route("/api/cache/stats", get(handlers::cache::cache_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &Config, state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        Ok(Self {
            app: create_router(state),
            addr,
        })
    }

    /// Serve until `cancellation_token` fires, reporting bind success or
    /// failure through `ready_signal`.
    pub async fn serve_with_cancellation(
        self,
        ready_signal: tokio::sync::oneshot::Sender<Result<()>>,
        cancellation_token: CancellationToken,
    ) -> Result<()> {
        match tokio::net::TcpListener::bind(&self.addr).await {
            Ok(listener) => {
                // Signal that we're now actually listening on the port
                let _ = ready_signal.send(Ok(()));

                let shutdown_signal = async move {
                    cancellation_token.cancelled().await;
                    tracing::info!("Web server received cancellation signal, shutting down gracefully");
                };

                axum::serve(listener, self.app)
                    .with_graceful_shutdown(shutdown_signal)
                    .await?;
                Ok(())
            }
            Err(bind_error) => {
                let bind_err_msg = format!("Failed to bind to {}: {}", self.addr, bind_error);
                let _ = ready_signal.send(Err(anyhow::anyhow!("{}", bind_err_msg)));
                Err(anyhow::anyhow!("{}", bind_err_msg))
            }
        }
    }

    /// Get the host address
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}
