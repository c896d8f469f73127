//! HTTP surface: routing, middleware, and the server lifecycle.

pub mod error;
pub mod handlers;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::core::cache::RateStore;
use crate::core::config::ServerConfig;
use crate::core::{ConversionService, RequestContext};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn ConversionService>,
    pub store: Arc<dyn RateStore>,
    /// Parent of every request context; cancelled once the shutdown grace runs out.
    pub root: RequestContext,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        service: Arc<dyn ConversionService>,
        store: Arc<dyn RateStore>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            service,
            store,
            root: RequestContext::new(),
            request_timeout,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(AnyOrigin);

    let api = Router::new().route("/convert", get(handlers::convert));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

/// Binds `config.addr()` and serves until SIGINT/SIGTERM.
///
/// In-flight requests get `shutdown_grace` to finish before their contexts
/// are cancelled.
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!(address = %listener.local_addr()?, "Server listening");

    let root = state.root.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(root, config.shutdown_grace()))
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(root: RequestContext, grace: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }

    warn!(?grace, "Shutting down, draining in-flight requests");
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!("Shutdown grace elapsed, cancelling in-flight requests");
        root.cancel();
    });
}
