// HTTP query service
// `GET /` welcome payload and `POST /chat` question answering


use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::RagError;
use crate::config::Config;
use crate::llm::ChatError;
use crate::rag::{QueryRequest, QueryResponse, RagChain};

pub const WELCOME_MESSAGE: &str = "Welcome to the RAG System API. POST a question to /chat.";

/// Error returned by request handlers, rendered as `{"error": message}`
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for AppError {
    #[inline]
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

impl From<RagError> for AppError {
    #[inline]
    fn from(err: RagError) -> Self {
        match err {
            RagError::Llm(e @ (ChatError::Status(_) | ChatError::MalformedResponse(_))) => {
                warn!("Upstream language model fault: {}", e);
                AppError::BadGateway(e.to_string())
            }
            other => {
                error!("Query failed: {}", other);
                AppError::Internal(other.to_string())
            }
        }
    }
}

#[inline]
pub fn create_router(chain: Arc<RagChain>) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/chat", post(chat))
        .layer(TraceLayer::new_for_http())
        .with_state(chain)
}

async fn welcome() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": WELCOME_MESSAGE }))
}

async fn chat(
    State(chain): State<Arc<RagChain>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    if request.query.trim().is_empty() {
        return Err(AppError::BadRequest("Query must not be empty".to_string()));
    }

    let response = chain.execute(&request.query).await?;
    Ok(Json(response))
}

/// Build the query chain from `config` and serve until the process is stopped
#[inline]
pub async fn run_server(config: &Config) -> Result<()> {
    // Resolved once at startup; hostnames go through the system resolver
    let addr = config
        .server
        .socket_addr()
        .context("Invalid server address")?;

    let chain = RagChain::from_config(config)
        .await
        .context("Failed to initialize query chain")?;

    let app = create_router(Arc::new(chain));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Query service listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Query service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
