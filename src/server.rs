use crate::error::ExtractionError;
use crate::models::{ErrorBody, ExtractRequest};
use crate::scrapers::ListingExtractor;
use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state for HTTP handlers.
struct AppState {
    extractor: ListingExtractor,
}

impl IntoResponse for ExtractionError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

pub fn router(extractor: ListingExtractor) -> Router {
    let state = Arc::new(AppState { extractor });

    Router::new()
        .route("/health", get(health_handler))
        .route("/extract", post(extract_handler))
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(listen_addr: &str, extractor: ListingExtractor) -> Result<()> {
    let addr: SocketAddr = listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address {listen_addr:?}"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(addr = %addr, "starting HTTP server");

    axum::serve(listener, router(extractor))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server error")
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// A body that cannot be read carries no usable credential, so it is rejected as unauthenticated
async fn extract_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ExtractRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Unreadable extract request: {}", rejection.body_text());
            return ExtractionError::AuthenticationFailed.into_response();
        }
    };

    match state
        .extractor
        .extract(
            request.agent_identifier.as_deref(),
            request.credential.as_deref(),
        )
        .await
    {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}
