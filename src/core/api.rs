//! HTTP + WebSocket API for analysis sessions
//!
//! Endpoints:
//! - POST /session/new - Create new session
//! - GET /session/{id} - Get session snapshot
//! - POST /session/{id}/start - Begin recording
//! - POST /session/{id}/stop - Stop recording, keep history
//! - POST /session/{id}/reset - Clear everything
//! - DELETE /session/{id} - Dispose session
//! - WS /ws/{id} - Live snapshots
//! - GET /health - Health check

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{ws::{Message, WebSocket}, Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use crate::core::config::EngineConfig;
use crate::core::profiles::RuleProfile;
use crate::core::runtime::{spawn_session, SessionHandle};
use crate::types::{EngineError, SessionSnapshot};

/// App state
#[derive(Default)]
pub struct AppState {
    pub sessions: RwLock<HashMap<String, SessionHandle>>,
}

/// Create new session request
#[derive(Debug, Default, Deserialize)]
pub struct NewSessionRequest {
    pub profile: Option<String>,
    pub tick_interval_ms: Option<u64>,
    pub history_capacity: Option<usize>,
    pub seed: Option<u64>,
}

impl NewSessionRequest {
    fn into_config(self) -> Result<EngineConfig, ApiError> {
        let profile = match self.profile {
            Some(name) => name.parse::<RuleProfile>().map_err(ApiError::bad_request)?,
            None => RuleProfile::default(),
        };
        let mut config = EngineConfig::new(profile);
        config.tick_interval_ms = self.tick_interval_ms;
        if let Some(capacity) = self.history_capacity {
            config.history_capacity = capacity;
        }
        config.seed = self.seed;
        Ok(config)
    }
}

/// Create new session response
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub profile: String,
    pub tick_interval_ms: u64,
    pub websocket_url: String,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions_active: usize,
}

/// Dispose response
#[derive(Debug, Serialize)]
pub struct DisposeResponse {
    pub session_id: String,
    pub disposed: bool,
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Status + message, rendered as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(err: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: err.to_string(),
        }
    }

    fn not_found(id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("no session {}", id),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match err {
            EngineError::Config(_) => StatusCode::BAD_REQUEST,
            EngineError::CaptureUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::SessionClosed => StatusCode::GONE,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Create the API router
pub fn create_router() -> Router {
    let state = Arc::new(AppState::default());

    Router::new()
        .route("/health", get(health))
        .route("/session/new", post(create_session))
        .route("/session/:id", get(get_session).delete(dispose_session))
        .route("/session/:id/start", post(start_session))
        .route("/session/:id/stop", post(stop_session))
        .route("/session/:id/reset", post(reset_session))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sessions_active: sessions.len(),
    })
}

/// Create new session
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewSessionRequest>,
) -> ApiResult<NewSessionResponse> {
    let config = req.into_config()?;
    let profile = config.rule_profile.name().to_string();
    let tick_interval_ms = config.tick_interval_ms();
    let handle = spawn_session(config).map_err(ApiError::bad_request)?;

    let session_id = generate_session_id();
    state.sessions.write().await.insert(session_id.clone(), handle);
    info!("session {} created (profile={})", session_id, profile);

    Ok(Json(NewSessionResponse {
        websocket_url: format!("/ws/{}", session_id),
        session_id,
        profile,
        tick_interval_ms,
    }))
}

async fn handle_for(state: &AppState, id: &str) -> Result<SessionHandle, ApiError> {
    state
        .sessions
        .read()
        .await
        .get(id)
        .cloned()
        .ok_or_else(|| ApiError::not_found(id))
}

/// Get session snapshot
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    let handle = handle_for(&state, &id).await?;
    Ok(Json(handle.snapshot().await?))
}

async fn start_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    let handle = handle_for(&state, &id).await?;
    Ok(Json(handle.start().await?))
}

async fn stop_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    let handle = handle_for(&state, &id).await?;
    Ok(Json(handle.stop().await?))
}

async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    let handle = handle_for(&state, &id).await?;
    Ok(Json(handle.reset().await?))
}

/// Dispose session and cancel its timer
async fn dispose_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DisposeResponse> {
    let handle = state
        .sessions
        .write()
        .await
        .remove(&id)
        .ok_or_else(|| ApiError::not_found(&id))?;
    handle.shutdown();
    info!("session {} disposed", id);

    Ok(Json(DisposeResponse {
        session_id: id,
        disposed: true,
    }))
}

/// WebSocket handler for live snapshots
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let rx = handle_for(&state, &id).await?.subscribe();

    Ok(ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, rx).await;
    }))
}

/// Forward snapshots until either side closes
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<SessionSnapshot>) {
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Ok(snapshot) => {
                    let json = serde_json::to_string(&snapshot).unwrap_or_default();
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("websocket client lagging, skipped {} snapshots", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate session ID
fn generate_session_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis() as u64;
    let seq = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("session_{:x}_{}", millis, seq)
}

/// Run the API server
pub async fn run_server(addr: &str) -> std::io::Result<()> {
    let router = create_router();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("verity API listening on {}", addr);
    println!("Verity API running on {}", addr);
    println!("  POST   /session/new        - Create session");
    println!("  GET    /session/:id        - Get snapshot");
    println!("  POST   /session/:id/start  - Start analysis");
    println!("  POST   /session/:id/stop   - Stop analysis");
    println!("  POST   /session/:id/reset  - Reset session");
    println!("  DELETE /session/:id        - Dispose session");
    println!("  WS     /ws/:id             - Live snapshots");
    println!("  GET    /health             - Health check");
    axum::serve(listener, router).await
}
