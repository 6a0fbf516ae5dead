//! WebSocket Connection Handler
//!
//! Owns one connection's lifecycle: the authenticated handshake, the
//! writer task draining the session queue, the receive loop for client
//! commands, and the disconnect path.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{ParticipantRepository, User, UserRepository};
use crate::infrastructure::repositories::{PgParticipantRepository, PgUserRepository};
use crate::presentation::middleware::decode_user_id;
use crate::realtime::events::{
    ClientCommand, ConnectedPayload, ErrorPayload, PongPayload, ServerEvent, TypingPayload,
    UserStatusPayload,
};
use crate::realtime::{OutboundFrame, SessionHandle};
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Connection query parameters: `GET /ws?token=...`
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: String,
}

/// WebSocket upgrade handler.
///
/// The bearer token is validated once, before the upgrade completes; a bad
/// credential rejects the handshake and no session is ever created. The
/// resulting identity is bound to the session for its whole lifetime.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let user = match authenticate(&query.token, &state).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "WebSocket connection rejected");
            return e.into_response();
        }
    };

    ws.max_message_size(state.settings.websocket.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state, user))
}

/// Validate the token and load its (active) user.
async fn authenticate(token: &str, state: &AppState) -> Result<User, AppError> {
    let user_id = decode_user_id(token, &state.settings.jwt.secret)?;

    let user_repo = PgUserRepository::new(state.db.clone());
    let user = user_repo
        .find_by_id(user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("Authentication failed".into()))?;

    Ok(user)
}

/// Handle one authenticated WebSocket connection.
async fn handle_socket(socket: WebSocket, state: AppState, user: User) {
    let session_id = Uuid::new_v4();
    let user_id = user.id;

    tracing::debug!(
        user_id = %user_id,
        session_id = %session_id,
        "New WebSocket connection"
    );

    // Split socket for concurrent read/write
    let (mut sender, mut receiver) = socket.split();

    // Writer task: drain the session queue into the socket. A Close frame
    // (superseded session) closes the socket and ends the task.
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<OutboundFrame>();
    let writer_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                OutboundFrame::Event(envelope) => {
                    let text = match serde_json::to_string(&*envelope) {
                        Ok(t) => t,
                        Err(e) => {
                            tracing::error!("Failed to serialize event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                OutboundFrame::Close { reason } => {
                    // 1000 = normal closure
                    let _ = sender
                        .send(Message::Close(Some(CloseFrame {
                            code: 1000,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                }
            }
        }
    });

    // Register with the presence registry; any previous session for this
    // user is superseded and told to close.
    state
        .router
        .presence()
        .register(user_id, SessionHandle::new(session_id, tx));

    // Rebuild the membership directory entry from storage.
    let participant_repo = PgParticipantRepository::new(state.db.clone());
    match participant_repo.conversation_ids_for_user(user_id).await {
        Ok(conversation_ids) => {
            tracing::info!(
                user_id = %user_id,
                conversations = conversation_ids.len(),
                "Loaded conversations for connected user"
            );
            state.router.directory().replace(user_id, conversation_ids);
        }
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load conversations");
            state.router.presence().unregister(user_id, session_id);
            writer_task.abort();
            return;
        }
    }

    // Connection confirmation to the user, online announcement to the rest.
    state.router.send_to_user(
        ServerEvent::Connected(ConnectedPayload {
            user_id,
            username: user.username.clone(),
            message: format!("Connected successfully as {}", user.username),
        }),
        user_id,
    );
    state.router.broadcast_to_all(
        ServerEvent::UserOnline(UserStatusPayload {
            user_id,
            username: user.username.clone(),
            status: "online".into(),
            last_seen_at: None,
        }),
        Some(user_id),
    );

    tracing::info!(user_id = %user_id, session_id = %session_id, "User connected");

    // Receive loop: the connection's only suspension point.
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_command(&text, &user, &state);
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(session_id = %session_id, "Connection closed by client");
                break;
            }
            Ok(_) => {
                // Ping/pong and binary frames are handled by the transport
            }
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Cleanup. The session-id guard keeps a superseded connection from
    // tearing down its successor's state.
    if state.router.presence().unregister(user_id, session_id) {
        state.router.directory().remove_user(user_id);

        let last_seen = Utc::now();
        let user_repo = PgUserRepository::new(state.db.clone());
        if let Err(e) = user_repo.update_last_seen(user_id, last_seen).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to update last seen");
        }

        state.router.broadcast_to_all(
            ServerEvent::UserOffline(UserStatusPayload {
                user_id,
                username: user.username.clone(),
                status: "offline".into(),
                last_seen_at: Some(last_seen),
            }),
            None,
        );
    }
    writer_task.abort();

    tracing::info!(user_id = %user_id, session_id = %session_id, "User disconnected");
}

/// Handle one client command. Malformed payloads answer with an `error`
/// event on the same session; the connection stays open.
fn handle_command(text: &str, user: &User, state: &AppState) {
    match serde_json::from_str::<ClientCommand>(text) {
        Ok(ClientCommand::Typing(cmd)) => {
            // Recipients come from the directory, so a typing indicator can
            // only reach (and only be sent into) conversations the sender
            // is tracked in.
            if !state.router.directory().contains(user.id, cmd.conversation_id) {
                tracing::debug!(
                    user_id = %user.id,
                    conversation_id = %cmd.conversation_id,
                    "Typing indicator for conversation user is not in, ignored"
                );
                return;
            }
            state.router.broadcast_to_conversation(
                ServerEvent::Typing(TypingPayload {
                    conversation_id: cmd.conversation_id,
                    user_id: user.id,
                    username: user.username.clone(),
                    is_typing: cmd.is_typing,
                }),
                cmd.conversation_id,
                Some(user.id),
            );
        }
        Ok(ClientCommand::Ping) => {
            state
                .router
                .send_to_user(ServerEvent::Pong(PongPayload::pong()), user.id);
        }
        Err(e) => {
            tracing::debug!(user_id = %user.id, error = %e, "Malformed client command");
            let (message, code) = if serde_json::from_str::<serde_json::Value>(text).is_ok() {
                ("Unknown message type".to_string(), "UNKNOWN_MESSAGE_TYPE")
            } else {
                ("Invalid JSON format".to_string(), "INVALID_JSON")
            };
            state.router.send_to_user(
                ServerEvent::Error(ErrorPayload {
                    message,
                    code: code.into(),
                }),
                user.id,
            );
        }
    }
}
