//! HTTP chat server.
//!
//! Exposes the retrieval engine behind a small JSON API:
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Route one chat message (form fields `message`, `user_id`) |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! The engine snapshot is built once before the listener binds — the server
//! never accepts a query against a partially initialized index. All origins,
//! methods, and headers are permitted to support browser-based clients.
//!
//! Error responses follow `{ "error": { "code": ..., "message": ... } }`.

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::chat::{self, IntentClassifier};
use crate::config::Config;
use crate::engine::Engine;
use crate::favorites::{FavoritesStore, InMemoryFavorites};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
    favorites: Arc<dyn FavoritesStore>,
    classifier: Arc<IntentClassifier>,
    default_k: usize,
}

/// Build the engine, then serve until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let engine = Engine::open(config).await?;
    run_server_with_engine(config, engine, Arc::new(InMemoryFavorites::new())).await
}

/// Serve an already-initialized engine with an injected favorites store.
pub async fn run_server_with_engine(
    config: &Config,
    engine: Engine,
    favorites: Arc<dyn FavoritesStore>,
) -> anyhow::Result<()> {
    let state = AppState {
        engine: Arc::new(engine),
        favorites,
        classifier: Arc::new(IntentClassifier::new()),
        default_k: config.retrieval.default_k,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    let bind_addr = &config.server.bind;
    println!("Chat server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatForm {
    message: String,
    #[serde(default = "default_user_id")]
    user_id: String,
}

fn default_user_id() -> String {
    "user_1".to_string()
}

#[derive(Serialize)]
struct ChatResponse {
    response: chat::ChatReply,
}

/// Route one chat message. Unmatched queries fall through to semantic
/// retrieval inside the dispatcher, so this handler only fails on embedding
/// backend errors.
async fn handle_chat(
    State(state): State<AppState>,
    Form(form): Form<ChatForm>,
) -> Result<Json<ChatResponse>, AppError> {
    let reply = chat::respond(
        &state.engine,
        state.favorites.as_ref(),
        &state.classifier,
        &form.user_id,
        &form.message,
        state.default_k,
    )
    .await
    .map_err(|e| internal_error(e.to_string()))?;

    Ok(Json(ChatResponse { response: reply }))
}
