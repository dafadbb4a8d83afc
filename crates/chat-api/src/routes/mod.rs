//! Route definitions
//!
//! All API routes organized by domain and mounted under /api/v1.

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{health, invitations, members, notifications, rooms};
use crate::state::AppState;

/// Create the main API router with all routes (excluding health for separate middleware handling)
pub fn create_router() -> Router<AppState> {
    Router::new().nest("/api/v1", api_v1_routes())
}

/// Health check routes (exported separately to bypass rate limiting)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

/// API v1 routes
fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(room_routes())
        .merge(invitation_routes())
        .merge(user_routes())
}

/// Room routes
fn room_routes() -> Router<AppState> {
    Router::new()
        // Room CRUD
        .route("/rooms", post(rooms::create_room))
        .route("/rooms/:room_id", get(rooms::get_room).patch(rooms::update_room))
        .route("/rooms/:room_id/announcement", put(rooms::change_announcement))
        .route("/rooms/:room_id/messages", post(rooms::post_message))
        // Membership
        .route("/rooms/:room_id/join", post(members::join_room))
        .route("/rooms/:room_id/members", get(members::get_room_members))
        .route("/rooms/:room_id/members/@me", delete(members::leave_room))
        .route("/rooms/:room_id/members/:user_id", delete(members::kick_member))
        // Moderation
        .route(
            "/rooms/:room_id/moderators/:user_id",
            put(members::promote_member).delete(members::demote_member),
        )
        .route("/rooms/:room_id/bans", get(members::get_room_bans))
        .route(
            "/rooms/:room_id/bans/:user_id",
            put(members::ban_member).delete(members::unban_member),
        )
        // Invitations
        .route("/rooms/:room_id/invitations", post(invitations::create_invitation))
}

/// Invitation routes
fn invitation_routes() -> Router<AppState> {
    Router::new()
        .route("/invitations/:id/accept", post(invitations::accept_invitation))
        .route("/invitations/:id/decline", post(invitations::decline_invitation))
}

/// Routes scoped to the calling user
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/@me/invitations", get(invitations::get_my_invitations))
        .route("/users/@me/notifications", get(notifications::get_my_notifications))
        .route("/users/@me/notifications/read", post(notifications::mark_notifications_read))
}
