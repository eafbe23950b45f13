//! Local HTTP API over a single session.
//!
//! Endpoints:
//! - GET /api/health - Liveness check
//! - GET /api/conversations - List conversations
//! - POST /api/conversations - Create a conversation and select it
//! - GET /api/conversations/{id} - Conversation with display messages
//! - PATCH /api/conversations/{id} - Rename
//! - DELETE /api/conversations/{id} - Delete
//! - POST /api/conversations/{id}/select - Make active
//! - POST /api/chat - Submit a prompt to the active conversation
//! - POST /api/attach/pdf - Attach PDF text (raw body)
//! - POST /api/attach/image?name= - Attach an image (raw body)
//! - POST /api/attach/search - Attach web search snippets
//!
//! All actions go through one mutex, so requests are handled one at a time.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::error::SessionError;
use crate::models::{created_at, Message};
use crate::session::Session;

/// Default port for `thinkr serve`.
pub const DEFAULT_PORT: u16 = 58232;

/// Shared server state.
pub struct ServerState {
    session: Mutex<Session>,
    /// Called with the new active id after every request that may change it.
    on_select: Box<dyn Fn(Option<&str>) + Send + Sync>,
}

impl ServerState {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
            on_select: Box::new(|_| {}),
        }
    }

    /// Observe changes of the active selection.
    #[must_use]
    pub fn on_select(mut self, f: impl Fn(Option<&str>) + Send + Sync + 'static) -> Self {
        self.on_select = Box::new(f);
        self
    }
}

// === Request/Response Types ===

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub messages: usize,
    pub active: bool,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationView {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActiveResponse {
    pub active: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub conversation_id: String,
    pub reply: String,
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttachResponse {
    pub conversation_id: String,
    /// Characters of PDF text or number of search snippets appended.
    pub appended: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageParams {
    pub name: String,
}

/// Session error rendered as a JSON body with a matching status.
pub struct ApiError(SessionError);

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::EmptyPrompt | SessionError::UnsupportedAttachment(_) => {
                StatusCode::BAD_REQUEST
            }
            SessionError::NoActiveConversation => StatusCode::CONFLICT,
            SessionError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SessionError::Completion(_) | SessionError::Search(_) => StatusCode::BAD_GATEWAY,
            SessionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::warn!(error = %self.0, status = status.as_u16(), "request failed");
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// === Server Lifecycle ===

/// Build the API router.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/api/conversations/{id}",
            get(get_conversation)
                .patch(rename_conversation)
                .delete(delete_conversation),
        )
        .route("/api/conversations/{id}/select", post(select_conversation))
        .route("/api/chat", post(chat))
        // Uploads are taken whole; only the extracted text is capped.
        .route(
            "/api/attach/pdf",
            post(attach_pdf).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/api/attach/image",
            post(attach_image).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/attach/search", post(attach_search))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on localhost until the process is stopped.
pub async fn start_server(port: u16, state: ServerState) -> Result<()> {
    let app = router(Arc::new(state));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    println!("Thinkr server listening on http://{addr}");
    tracing::info!(%addr, "server started");

    axum::serve(listener, app).await.context("Server error")
}

// === Handlers ===

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_conversations(
    State(state): State<Arc<ServerState>>,
) -> ApiResult<Vec<ConversationSummary>> {
    let session = state.session.lock().await;
    let active = session.active();

    let summaries = session
        .conversations()?
        .into_iter()
        .map(|(id, conv)| ConversationSummary {
            active: active == Some(id.as_str()),
            created_at: created_at(&id).map(|t| t.to_rfc3339()),
            messages: conv.display_messages().len(),
            title: conv.title,
            id,
        })
        .collect();

    Ok(Json(summaries))
}

async fn create_conversation(
    State(state): State<Arc<ServerState>>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let mut session = state.session.lock().await;
    let id = session.new_conversation()?;
    (state.on_select)(Some(&id));
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn get_conversation(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ApiResult<ConversationView> {
    let session = state.session.lock().await;
    let conv = session.conversation(&id)?;
    Ok(Json(ConversationView {
        messages: conv.display_messages().to_vec(),
        title: conv.title,
        id,
    }))
}

async fn rename_conversation(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<serde_json::Value> {
    let session = state.session.lock().await;
    let changed = session.rename(&id, &req.title)?;
    Ok(Json(serde_json::json!({ "changed": changed })))
}

async fn delete_conversation(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ApiResult<ActiveResponse> {
    let mut session = state.session.lock().await;
    let active = session.delete(&id)?;
    (state.on_select)(active.as_deref());
    Ok(Json(ActiveResponse { active }))
}

async fn select_conversation(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ApiResult<ActiveResponse> {
    let mut session = state.session.lock().await;
    session.select(&id)?;
    (state.on_select)(Some(&id));
    Ok(Json(ActiveResponse { active: Some(id) }))
}

async fn chat(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    let mut session = state.session.lock().await;
    let id = ensure_active(&state, &mut session)?;
    let reply = session.submit(&req.prompt).await?;
    let title = session.conversation(&id)?.title;
    Ok(Json(ChatResponse {
        conversation_id: id,
        reply,
        title,
    }))
}

async fn attach_pdf(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> ApiResult<AttachResponse> {
    let mut session = state.session.lock().await;
    let id = ensure_active(&state, &mut session)?;
    let appended = session.attach_pdf(body.to_vec()).await?;
    Ok(Json(AttachResponse {
        conversation_id: id,
        appended,
    }))
}

async fn attach_image(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<ImageParams>,
    body: Bytes,
) -> ApiResult<AttachResponse> {
    let mut session = state.session.lock().await;
    let id = ensure_active(&state, &mut session)?;
    session.attach_image(&params.name, &body)?;
    Ok(Json(AttachResponse {
        conversation_id: id,
        appended: 0,
    }))
}

async fn attach_search(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<AttachResponse> {
    let mut session = state.session.lock().await;
    let id = ensure_active(&state, &mut session)?;
    let appended = session.attach_search(&req.query).await?;
    Ok(Json(AttachResponse {
        conversation_id: id,
        appended,
    }))
}

/// Start-of-cycle step: make sure a conversation is selected.
fn ensure_active(state: &ServerState, session: &mut Session) -> Result<String, SessionError> {
    let had_active = session.active().is_some();
    let id = session.ensure_active()?;
    if !had_active {
        (state.on_select)(Some(&id));
    }
    Ok(id)
}
