//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::auth_middleware;
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        // WebSocket endpoint; authentication happens in the handshake
        .route("/ws", get(ws_handler))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// API v1 routes (all protected)
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/conversations", conversation_routes(state.clone()))
        .nest("/messages", message_routes(state.clone()))
        .nest("/friendships", friendship_routes(state))
}

/// Conversation routes
fn conversation_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::conversation::create_conversation))
        .route("/", get(handlers::conversation::get_conversations))
        .route("/{conversation_id}", get(handlers::conversation::get_conversation))
        .route("/{conversation_id}", put(handlers::conversation::update_conversation))
        .route("/{conversation_id}", delete(handlers::conversation::delete_conversation))
        .route(
            "/{conversation_id}/participants",
            get(handlers::conversation::get_participants),
        )
        .route(
            "/{conversation_id}/participants/batch",
            post(handlers::conversation::add_participants_batch),
        )
        .route(
            "/{conversation_id}/participants/{user_id}",
            post(handlers::conversation::add_participant),
        )
        .route(
            "/{conversation_id}/participants/{user_id}",
            delete(handlers::conversation::remove_participant),
        )
        .route(
            "/{conversation_id}/leave",
            delete(handlers::conversation::leave_conversation),
        )
        .route(
            "/{conversation_id}/unfriend",
            delete(handlers::conversation::unfriend_in_direct),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Message routes (reactions hang off messages)
fn message_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::message::send_message))
        .route("/", get(handlers::message::get_messages))
        .route("/{message_id}", put(handlers::message::edit_message))
        .route("/{message_id}", delete(handlers::message::delete_message))
        .route("/{message_id}/read", put(handlers::message::mark_message_read))
        .route("/{message_id}/reactions", post(handlers::reaction::add_reaction))
        .route("/{message_id}/reactions", get(handlers::reaction::get_reactions))
        .route(
            "/{message_id}/reactions/{emoji}",
            delete(handlers::reaction::remove_reaction),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Friendship routes
fn friendship_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/send-request", post(handlers::friendship::send_friend_request))
        .route("/respond", post(handlers::friendship::respond_to_friend_request))
        .route("/friends", get(handlers::friendship::get_friends))
        .route(
            "/requests/received",
            get(handlers::friendship::get_received_requests),
        )
        .route("/requests/sent", get(handlers::friendship::get_sent_requests))
        .route("/status/{user_id}", get(handlers::friendship::get_friendship_status))
        .route("/{friendship_id}", delete(handlers::friendship::remove_friendship))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
