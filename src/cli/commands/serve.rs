//! HTTP API server for the community app.
//!
//! The gateway authenticates callers and forwards the resolved identity in
//! the `x-user-id` header.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{AssistantResponse, Orchestrator, SelfTestReport};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Header carrying the authenticated caller identity.
pub const USER_HEADER: &str = "x-user-id";

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let state = Arc::new(AppState { orchestrator });

    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    Output::header("Neighborly API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Ask", "POST /ai/query");
    Output::kv("Embeddings", "POST /ai/embeddings");
    Output::kv("Self-test", "GET  /ai/self-test");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ai/query", post(query))
        .route("/ai/embeddings", post(generate_embeddings))
        .route("/ai/self-test", get(self_test))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    input: String,
}

#[derive(Serialize)]
struct EmbeddingsResponse {
    success: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<QueryRequest>,
) -> Response {
    let user_id = match headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        Some(user_id) => user_id.to_string(),
        None => {
            warn!("Rejected query without caller identity");
            return error_response(StatusCode::UNAUTHORIZED, "Not authenticated");
        }
    };

    let input = req.input.trim();
    if input.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "input must not be empty");
    }

    let response: AssistantResponse = state.orchestrator.answer(input, &user_id).await;
    Json(response).into_response()
}

async fn generate_embeddings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let success = state.orchestrator.generate_embeddings().await;
    Json(EmbeddingsResponse { success })
}

async fn self_test(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report: SelfTestReport = state.orchestrator.self_test().await;
    Json(report)
}
