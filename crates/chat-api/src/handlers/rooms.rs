//! Room handlers
//!
//! Endpoints for room lifecycle, settings and messages.

use axum::{
    extract::{Path, State},
    Json,
};
use chat_service::dto::{
    CreateRoomRequest, MessageResponse, PostMessageRequest, RoomResponse, UpdateAnnouncementRequest,
    UpdateRoomRequest,
};
use chat_service::RoomService;

use crate::extractors::{AuthUser, RoomIdPath, ValidatedJson};
use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// Create a room owned by the caller
///
/// POST /rooms
pub async fn create_room(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateRoomRequest>,
) -> ApiResult<Created<Json<RoomResponse>>> {
    let service = RoomService::new(state.service_context());
    let room = service.create_room(auth.user_id, request).await?;
    Ok(Created(Json(room)))
}

/// Get room by ID
///
/// GET /rooms/{room_id}
pub async fn get_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<RoomIdPath>,
) -> ApiResult<Json<RoomResponse>> {
    let room_id = path.room_id()?;

    let service = RoomService::new(state.service_context());
    let room = service.get_room(room_id, auth.user_id).await?;
    Ok(Json(room))
}

/// Update room settings (owner only)
///
/// PATCH /rooms/{room_id}
pub async fn update_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<RoomIdPath>,
    ValidatedJson(request): ValidatedJson<UpdateRoomRequest>,
) -> ApiResult<Json<RoomResponse>> {
    let room_id = path.room_id()?;

    let service = RoomService::new(state.service_context());
    let room = service.update_settings(room_id, auth.user_id, request).await?;
    Ok(Json(room))
}

/// Set or clear the announcement (owner only)
///
/// PUT /rooms/{room_id}/announcement
pub async fn change_announcement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<RoomIdPath>,
    ValidatedJson(request): ValidatedJson<UpdateAnnouncementRequest>,
) -> ApiResult<Json<RoomResponse>> {
    let room_id = path.room_id()?;

    let service = RoomService::new(state.service_context());
    let room = service.change_announcement(room_id, auth.user_id, request).await?;
    Ok(Json(room))
}

/// Post a message
///
/// POST /rooms/{room_id}/messages
pub async fn post_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<RoomIdPath>,
    ValidatedJson(request): ValidatedJson<PostMessageRequest>,
) -> ApiResult<Created<Json<MessageResponse>>> {
    let room_id = path.room_id()?;

    let service = RoomService::new(state.service_context());
    let message = service.post_message(room_id, auth.user_id, request.content).await?;
    Ok(Created(Json(message)))
}
