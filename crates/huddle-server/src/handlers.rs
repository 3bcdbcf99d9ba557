//! HTTP and WebSocket handlers for the Huddle server.
//!
//! Maps the room management API onto [`HubHandle`] calls and upgrades join
//! requests into hub sessions.

use crate::config::Config;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::{Context, Result};
use axum::{
    extract::{ws::WebSocket, Path, Query, State, WebSocketUpgrade},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use huddle_core::{
    join, Hub, HubError, HubHandle, RoomInfo, SessionBinding, SessionConfig, SessionInfo,
};
use huddle_protocol::codec::MAX_FRAME_SIZE;
use huddle_transport::websocket;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, error, info, warn};

/// Shared server state.
pub struct AppState {
    /// Handle to the running hub.
    pub hub: HubHandle,
    /// Server configuration.
    pub config: Config,
    session_config: SessionConfig,
}

impl AppState {
    /// Create new app state around a running hub.
    #[must_use]
    pub fn new(config: Config, hub: HubHandle) -> Self {
        Self {
            hub,
            session_config: config.session_config(),
            config,
        }
    }
}

/// Body of a room creation request, echoed back on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    /// Room id.
    pub id: String,
    /// Display name, empty when omitted.
    #[serde(default)]
    pub name: String,
}

/// Query string of a join request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinParams {
    /// Session id chosen by the client.
    #[serde(rename = "userID", default)]
    pub user_id: String,
    /// Identity shown to the room.
    #[serde(default)]
    pub username: String,
}

/// API error responses.
#[derive(Debug)]
pub enum ApiError {
    /// The request was rejected.
    BadRequest(String),
    /// The hub is not running.
    Unavailable,
}

impl From<HubError> for ApiError {
    fn from(e: HubError) -> Self {
        match e {
            HubError::InvalidRoomId(_) => ApiError::BadRequest(e.to_string()),
            HubError::Closed => ApiError::Unavailable,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "hub is not running".to_string(),
            ),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Build the HTTP router.
///
/// # Errors
///
/// Returns an error if a configured CORS origin is not a valid header value.
pub fn build_router(state: Arc<AppState>) -> Result<Router> {
    let origins = state
        .config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {}", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(12 * 60 * 60));

    Ok(Router::new()
        .route("/websocket/createRoom", post(create_room))
        .route("/websocket/joinRoom/:room_id", get(join_room))
        .route("/websocket/getRooms", get(get_rooms))
        .route("/websocket/getClients/:room_id", get(get_clients))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state))
}

/// Run the HTTP/WebSocket server until ctrl-c.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let (hub, handle) = Hub::new(config.hub_config());
    let hub_task = tokio::spawn(hub.run());

    let addr = config.bind_addr()?;
    let state = Arc::new(AppState::new(config, handle));
    let app = build_router(state)?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Huddle server listening on {}", addr);
    info!("Join endpoint: ws://{}/websocket/joinRoom/{{roomID}}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Open sessions still hold hub handles; stop without waiting on them
    hub_task.abort();
    info!("Huddle server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received ctrl-c, initiating graceful shutdown");
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create (or reset) a room.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomRequest>, ApiError> {
    debug!(room = %request.id, name = %request.name, "Create room request");

    if let Err(e) = state
        .hub
        .create_room(request.id.clone(), request.name.clone())
        .await
    {
        warn!(room = %request.id, error = %e, "Create room failed");
        metrics::record_http_error("createRoom");
        return Err(e.into());
    }

    Ok(Json(request))
}

/// List all rooms.
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomInfo>> {
    Json(state.hub.list_rooms())
}

/// List the sessions in a room.
pub async fn get_clients(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Json<Vec<SessionInfo>> {
    Json(state.hub.list_sessions(&room_id))
}

/// WebSocket upgrade handler for joining a room.
async fn join_room(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    Query(params): Query<JoinParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let binding = SessionBinding::new(params.user_id, room_id, params.username);
    debug!(
        room = %binding.room_id,
        session = %binding.session_id,
        identity = %binding.identity,
        "Join request"
    );

    // The session reader enforces the configured limit and keeps the
    // connection; the socket itself only fails past the protocol ceiling
    let socket_limit = state.config.session.max_message_size.max(MAX_FRAME_SIZE);

    ws.max_message_size(socket_limit)
        .on_failed_upgrade(|e| {
            warn!(error = %e, "WebSocket upgrade failed");
            metrics::record_http_error("joinRoom");
        })
        .on_upgrade(move |socket| handle_session(socket, binding, state))
}

/// Drive one upgraded connection until both session loops finish.
async fn handle_session(socket: WebSocket, binding: SessionBinding, state: Arc<AppState>) {
    let _metrics_guard = ConnectionMetricsGuard::new();
    let session_id = binding.session_id.clone();

    let (reader, writer) = websocket::split(socket, state.config.session.max_message_size);
    match join(&state.hub, binding, reader, writer, &state.session_config).await {
        Ok(handle) => {
            handle.closed().await;
            debug!(session = %session_id, "WebSocket disconnected");
        }
        Err(e) => {
            error!(session = %session_id, error = %e, "Failed to start session");
        }
    }
}
