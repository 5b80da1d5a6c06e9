use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::backend::{ChatBackend, RagBackend};
use crate::config::AppConfig;
use crate::controller::{ChatController, ChatOptions, PendingTurn};
use crate::error::ChatError;
use crate::llm::LlmSettings;
use crate::render::{self, page};
use crate::retrieval::{KeywordMatch, PointFilter, Retriever, ScrollRequest};
use crate::transcript::Message;

/// How long a parked turn waits to be collected before it is evicted.
const PENDING_REPLY_TTL: Duration = Duration::from_secs(300);

/// Turns whose user entry has been rendered but whose reply has not been fetched.
///
/// A client that never fetches its reply (closed tab, non-htmx caller) leaves
/// its turn behind; such entries are evicted once they are older than the TTL.
#[derive(Debug, Clone)]
pub struct PendingReplies {
    inner: Arc<Mutex<HashMap<String, (Instant, PendingTurn)>>>,
    ttl: Duration,
}

impl Default for PendingReplies {
    fn default() -> Self {
        Self::with_ttl(PENDING_REPLY_TTL)
    }
}

impl PendingReplies {
    /// Empty set evicting turns older than `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            ttl,
        }
    }

    fn park(&self, turn: PendingTurn) -> String {
        let id = turn.id.to_string();
        let now = Instant::now();
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let before = map.len();
        map.retain(|_, (parked, _)| now.duration_since(*parked) < self.ttl);
        let evicted = before - map.len();
        if evicted > 0 {
            debug!(name: "chat.reply.evicted", evicted, "Evicted uncollected replies");
        }

        map.insert(id.clone(), (now, turn));
        id
    }

    fn take(&self, id: &str) -> Option<PendingTurn> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .map(|(_, turn)| turn)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>, settings: LlmSettings) -> anyhow::Result<()> {
    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        model = %settings.model,
        embedding_model = %settings.embedding_model,
        "LLM configuration loaded"
    );

    let http = reqwest::Client::new();
    let retriever = Retriever::new(http.clone(), &config.retrieval)?;
    let backend: Arc<dyn ChatBackend> =
        Arc::new(RagBackend::new(&http, &settings, retriever.clone()));

    let state = AppState::new(Arc::clone(&config), backend, Some(retriever));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        summarize = config.chat.summarize,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

impl AppState {
    /// Build state around `backend`, starting the chat controller.
    #[must_use]
    pub fn new(
        config: Arc<AppConfig>,
        backend: Arc<dyn ChatBackend>,
        retriever: Option<Retriever>,
    ) -> Self {
        let controller = ChatController::new(
            Arc::clone(&backend),
            ChatOptions::from(&config.chat),
        );
        Self {
            controller,
            backend,
            pending: PendingReplies::default(),
            retriever,
            config,
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(|| async { "ok" }))
        .route("/api/messages", post(send_message))
        .route("/api/turns/{id}", get(turn_reply))
        .route("/api/transcript", get(transcript_json))
        .route("/api/generate-response", post(generate_response))
        .route("/api/summarize", post(summarize))
        .route("/api/collections", get(list_collections))
        .route("/api/collections/{name}", get(collection_info))
        .route("/api/collections/{name}/scroll", post(scroll_collection))
        .nest_service("/static", static_dir)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Error Mapping
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// JSON error response for the API routes.
#[derive(Debug)]
struct ApiError(ChatError);

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ChatError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ChatError::Config(_) | ChatError::QueueClosed => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };
        warn!(name: "api.request.failed", error = %self.0, status = status.as_u16(), "Request failed");
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - Chat page with the current transcript.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(page::chat_page(
        &state.config.server.title,
        state.controller.transcript(),
    ))
}

/// Form body of the chat input.
#[derive(Debug, Deserialize)]
struct SendForm {
    #[serde(default)]
    message: String,
}

/// POST /api/messages - Queue the turn and echo the user entry.
///
/// Responds once the turn has started with the user entry followed by a
/// placeholder that loads the reply. A send made while another turn is in
/// flight therefore answers after the previous reply is in the transcript,
/// and the page keeps the transcript's order. Blank input yields
/// `204 No Content`, which leaves the page as is.
async fn send_message(State(state): State<AppState>, Form(form): Form<SendForm>) -> Response {
    let mut turn = match state.controller.submit(&form.message) {
        Ok(Some(turn)) => turn,
        Ok(None) => return StatusCode::NO_CONTENT.into_response(),
        Err(e) => return Html(render::render_error_notice(&e.to_string())).into_response(),
    };
    let user = match turn.echoed().await {
        Ok(user) => user,
        Err(e) => return Html(render::render_error_notice(&e.to_string())).into_response(),
    };

    let mut html = render::render_entry(user.index, &user.message);
    let id = state.pending.park(turn);
    html.push_str(&render::render_pending_reply(&id));
    Html(html).into_response()
}

/// GET /api/turns/:id - Wait for a queued turn and render its bot entry.
///
/// Failures render an error notice in place of the entry; the transcript is
/// left without a bot entry for that turn.
async fn turn_reply(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(turn) = state.pending.take(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match turn.reply().await {
        Ok(reply) => Html(render::render_entry(reply.index, &reply.message)).into_response(),
        Err(e) => Html(render::render_error_notice(&e.to_string())).into_response(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/transcript - All messages in order.
async fn transcript_json(State(state): State<AppState>) -> Json<Vec<Message>> {
    Json(state.controller.transcript().messages())
}

/// Request body mirroring the host `generate_response` command.
#[derive(Debug, Deserialize)]
struct GenerateRequest {
    question: String,
    #[serde(default)]
    chat_history: String,
}

/// Request body mirroring the host `summarizer` command.
#[derive(Debug, Deserialize)]
struct SummarizeRequest {
    chat_history: String,
}

#[derive(Debug, Serialize)]
struct TextResponse {
    text: String,
}

/// POST /api/generate-response - Direct backend call, bypassing the transcript.
async fn generate_response(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<TextResponse>, ApiError> {
    let text = state
        .backend
        .generate_response(&req.question, &req.chat_history)
        .await?;
    Ok(Json(TextResponse { text }))
}

/// POST /api/summarize - Direct summarizer call.
async fn summarize(
    State(state): State<AppState>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<TextResponse>, ApiError> {
    let text = state.backend.summarize(&req.chat_history).await?;
    Ok(Json(TextResponse { text }))
}

fn retriever(state: &AppState) -> Result<&Retriever, Response> {
    state
        .retriever
        .as_ref()
        .ok_or_else(|| StatusCode::SERVICE_UNAVAILABLE.into_response())
}

/// GET /api/collections - Collection names in the vector store.
async fn list_collections(State(state): State<AppState>) -> Result<Json<Vec<String>>, Response> {
    let names = retriever(&state)?
        .client()
        .list_collections()
        .await
        .map_err(|e| ApiError(e).into_response())?;
    Ok(Json(names))
}

/// GET /api/collections/:name - Raw collection description.
async fn collection_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, Response> {
    let info = retriever(&state)?
        .client()
        .collection_info(&name)
        .await
        .map_err(|e| ApiError(e).into_response())?;
    Ok(Json(info))
}

/// Scroll query: page size, continuation offset and exact-match conditions.
#[derive(Debug, Deserialize)]
struct ScrollQuery {
    #[serde(default = "default_scroll_limit")]
    limit: u32,
    #[serde(default)]
    offset: Option<Value>,
    #[serde(default)]
    must: Vec<KeywordMatch>,
}

fn default_scroll_limit() -> u32 {
    10
}

/// POST /api/collections/:name/scroll - Browse stored chunks.
async fn scroll_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(query): Json<ScrollQuery>,
) -> Result<Response, Response> {
    let request = ScrollRequest {
        limit: query.limit,
        offset: query.offset,
        filter: (!query.must.is_empty()).then_some(PointFilter { must: query.must }),
        with_payload: true,
    };
    let page = retriever(&state)?
        .client()
        .scroll(&name, &request)
        .await
        .map_err(|e| ApiError(e).into_response())?;
    Ok(Json(page).into_response())
}
