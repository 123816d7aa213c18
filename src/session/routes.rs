//! REST endpoints and WebSocket stream for the consultation session.

use std::sync::Arc;

use axum::extract::ws::{Message as WsFrame, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::manager::{ConversationSession, SessionRegistry};
use super::model::{BusinessContext, SessionEvent};
use crate::auth::AuthUser;
use crate::error::SessionError;

/// Shared state for session routes.
#[derive(Clone)]
pub struct SessionRouteState {
    pub registry: Arc<SessionRegistry>,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match &self {
            SessionError::EmptyMessage => StatusCode::BAD_REQUEST,
            SessionError::ReplyInFlight | SessionError::ProfileRequired { .. } => {
                StatusCode::CONFLICT
            }
        };
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    content: String,
}

/// GET /api/session
async fn get_session(
    State(state): State<SessionRouteState>,
    user: AuthUser,
) -> Result<impl IntoResponse, SessionError> {
    let session = state.registry.open(&user.user_id).await?;
    Ok(Json(session.snapshot().await))
}

/// POST /api/session/messages
///
/// Streams the reply to WebSocket subscribers and returns the committed
/// assistant message(s) once the cycle ends.
async fn send_message(
    State(state): State<SessionRouteState>,
    user: AuthUser,
    Json(body): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, SessionError> {
    let session = state.registry.open(&user.user_id).await?;
    let outcome = session.submit_user_message(&body.content).await?;
    Ok(Json(outcome))
}

/// PUT /api/session/context
async fn update_context(
    State(state): State<SessionRouteState>,
    user: AuthUser,
    Json(context): Json<BusinessContext>,
) -> Result<impl IntoResponse, SessionError> {
    let session = state.registry.open(&user.user_id).await?;
    session.update_context(context.clone()).await;
    Ok(Json(context))
}

/// POST /api/session/reset
async fn reset_session(
    State(state): State<SessionRouteState>,
    user: AuthUser,
) -> Result<impl IntoResponse, SessionError> {
    let session = state.registry.open(&user.user_id).await?;
    Ok(Json(session.reset().await?))
}

/// POST /api/session/assessment
async fn refresh_assessment(
    State(state): State<SessionRouteState>,
    user: AuthUser,
) -> Result<Response, SessionError> {
    let session = state.registry.open(&user.user_id).await?;
    let response = match session.refresh_assessments().await {
        Ok(assessments) => {
            Json(serde_json::json!({ "assessments": assessments })).into_response()
        }
        Err(e) => {
            warn!(user_id = %user.user_id, error = %e, "Manual assessment refresh failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": "Assessment generation failed"})),
            )
                .into_response()
        }
    };
    Ok(response)
}

// ── WebSocket ───────────────────────────────────────────────────────────

/// Messages a WebSocket client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    SendMessage { content: String },
    Reset,
}

/// GET /ws/session
async fn ws_handler(
    ws: WebSocketUpgrade,
    user: AuthUser,
    State(state): State<SessionRouteState>,
) -> Result<Response, SessionError> {
    let session = state.registry.open(&user.user_id).await?;
    info!(user_id = %user.user_id, "Session WebSocket client connecting");
    let registry = Arc::clone(&state.registry);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, registry, session)))
}

async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(json) => socket.send(WsFrame::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize WS payload");
            true
        }
    }
}

/// Why `follow_session` stopped.
enum SocketExit {
    Disconnected,
    /// A resubmitted profile replaced the session.
    Replaced,
}

async fn handle_socket(
    mut socket: WebSocket,
    registry: Arc<SessionRegistry>,
    mut session: Arc<ConversationSession>,
) {
    // Errors from client-initiated actions, delivered to this client only.
    let (notice_tx, mut notice_rx) = mpsc::channel::<String>(16);

    loop {
        match follow_session(&mut socket, &session, &notice_tx, &mut notice_rx).await {
            SocketExit::Disconnected => break,
            SocketExit::Replaced => match registry.get(session.user_id()).await {
                Some(next) => {
                    info!(user_id = %session.user_id(), "Moving WebSocket client to the new session");
                    session = next;
                }
                None => break,
            },
        }
    }
}

/// Stream one session's events until the client leaves or the session is
/// replaced. Every call starts with a full snapshot.
async fn follow_session(
    socket: &mut WebSocket,
    session: &Arc<ConversationSession>,
    notice_tx: &mpsc::Sender<String>,
    notice_rx: &mut mpsc::Receiver<String>,
) -> SocketExit {
    // Subscribe before the snapshot so no event falls between the two.
    let mut rx = session.subscribe();
    let snapshot = SessionEvent::Snapshot {
        snapshot: session.snapshot().await,
    };
    if !send_json(socket, &snapshot).await {
        warn!("Failed to send session snapshot, client disconnected");
        return SocketExit::Disconnected;
    }

    loop {
        tokio::select! {
            () = session.retired() => return SocketExit::Replaced,

            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if !send_json(socket, &event).await {
                            debug!("Client disconnected during send");
                            return SocketExit::Disconnected;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind session events");
                        let resync = SessionEvent::Snapshot {
                            snapshot: session.snapshot().await,
                        };
                        if !send_json(socket, &resync).await {
                            return SocketExit::Disconnected;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Session event channel closed");
                        return SocketExit::Disconnected;
                    }
                }
            }

            Some(error) = notice_rx.recv() => {
                let notice = serde_json::json!({"type": "error", "error": error});
                if !send_json(socket, &notice).await {
                    return SocketExit::Disconnected;
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(WsFrame::Text(text))) => {
                        handle_client_message(&text, session, notice_tx).await;
                    }
                    Some(Ok(WsFrame::Ping(data))) => {
                        if socket.send(WsFrame::Pong(data)).await.is_err() {
                            return SocketExit::Disconnected;
                        }
                    }
                    Some(Ok(WsFrame::Close(_))) | None => {
                        info!(user_id = %session.user_id(), "Session WebSocket client disconnected");
                        return SocketExit::Disconnected;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        return SocketExit::Disconnected;
                    }
                    _ => {}
                }
            }
        }
    }
}

async fn handle_client_message(
    text: &str,
    session: &Arc<ConversationSession>,
    notices: &mpsc::Sender<String>,
) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::SendMessage { content }) => {
            // Replies stream for a while; keep the socket loop free.
            let session = Arc::clone(session);
            let notices = notices.clone();
            tokio::spawn(async move {
                if let Err(e) = session.submit_user_message(&content).await {
                    let _ = notices.send(e.to_string()).await;
                }
            });
        }
        Ok(ClientMessage::Reset) => {
            if let Err(e) = session.reset().await {
                let _ = notices.send(e.to_string()).await;
            }
        }
        Err(e) => {
            debug!(error = %e, text, "Unrecognized WS message from client");
        }
    }
}

/// Build the session REST and WebSocket routes.
pub fn session_routes(state: SessionRouteState) -> Router {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/messages", post(send_message))
        .route("/api/session/context", put(update_context))
        .route("/api/session/reset", post(reset_session))
        .route("/api/session/assessment", post(refresh_assessment))
        .route("/ws/session", get(ws_handler))
        .with_state(state)
}
