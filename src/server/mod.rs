//! HTTP transport
//!
//! - `POST /`: push webhook; runs hooks for authorized events
//! - `GET /logs`: output of the latest dispatch

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use eyre::{Context, Result};
use std::sync::Arc;

use crate::event::PushEvent;
use crate::handler::RequestHandler;

pub mod auth;

#[derive(Clone)]
pub struct AppState {
    handler: Arc<RequestHandler>,
    /// Secret callers must present; no check when unset
    required_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(handler: RequestHandler, required_secret: Option<String>) -> Self {
        Self {
            handler: Arc::new(handler),
            required_secret: required_secret.map(Arc::from),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(push_handler))
        .route("/logs", get(logs_handler))
        .with_state(state)
}

/// Bind and serve until Ctrl-C or SIGTERM
pub async fn serve(bind: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", bind))?;

    log::info!("Listening on {}", listener.local_addr().context("Failed to read bound address")?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    log::info!("Server stopped");
    Ok(())
}

async fn push_handler(State(state): State<AppState>, headers: HeaderMap, uri: Uri, body: Bytes) -> Response {
    if let Some(expected) = &state.required_secret {
        let provided = auth::extract_secret(&headers, &uri).unwrap_or_default();
        if !auth::secret_matches(&provided, expected) {
            log::warn!("Rejected push event: missing or wrong webhook secret");
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    let event = PushEvent::from_body(&body);
    log::debug!("Push event: {:?}", event);

    match state.handler.handle(&event).await {
        Ok(log) => (StatusCode::OK, Json(log)).into_response(),
        Err(_) => StatusCode::FORBIDDEN.into_response(),
    }
}

async fn logs_handler(State(state): State<AppState>) -> Response {
    let log = state.handler.peek();
    if log.is_empty() {
        log::debug!("No dispatch has run yet");
    }
    Json(&*log).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received");
}
