//! Member handlers
//!
//! Endpoints for joining, leaving and moderating room members.

use axum::{
    extract::{Path, State},
    Json,
};
use chat_service::dto::{JoinRoomRequest, MemberResponse};
use chat_service::RoomService;

use crate::extractors::{AuthUser, OptionalJson, RoomIdPath, RoomUserPath};
use crate::response::{ApiResult, NoContent};
use crate::state::AppState;

/// Get active room members
///
/// GET /rooms/{room_id}/members
pub async fn get_room_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<RoomIdPath>,
) -> ApiResult<Json<Vec<MemberResponse>>> {
    let room_id = path.room_id()?;

    let service = RoomService::new(state.service_context());
    let members = service.list_members(room_id, auth.user_id).await?;
    Ok(Json(members))
}

/// Get banned users
///
/// GET /rooms/{room_id}/bans
pub async fn get_room_bans(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<RoomIdPath>,
) -> ApiResult<Json<Vec<MemberResponse>>> {
    let room_id = path.room_id()?;

    let service = RoomService::new(state.service_context());
    let banned = service.list_bans(room_id, auth.user_id).await?;
    Ok(Json(banned))
}

/// Join a room; private rooms take the room password in the body
///
/// POST /rooms/{room_id}/join
pub async fn join_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<RoomIdPath>,
    OptionalJson(request): OptionalJson<JoinRoomRequest>,
) -> ApiResult<Json<MemberResponse>> {
    let room_id = path.room_id()?;

    let service = RoomService::new(state.service_context());
    let member = service.join_room(room_id, auth.user_id, request.password).await?;
    Ok(Json(member))
}

/// Leave a room
///
/// DELETE /rooms/{room_id}/members/@me
pub async fn leave_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<RoomIdPath>,
) -> ApiResult<NoContent> {
    let room_id = path.room_id()?;

    let service = RoomService::new(state.service_context());
    service.leave_room(room_id, auth.user_id).await?;
    Ok(NoContent)
}

/// Kick a member
///
/// DELETE /rooms/{room_id}/members/{user_id}
pub async fn kick_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<RoomUserPath>,
) -> ApiResult<NoContent> {
    let room_id = path.room_id()?;
    let target_id = path.user_id()?;

    let service = RoomService::new(state.service_context());
    service.kick(room_id, auth.user_id, target_id).await?;
    Ok(NoContent)
}

/// Promote a member to moderator (owner only)
///
/// PUT /rooms/{room_id}/moderators/{user_id}
pub async fn promote_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<RoomUserPath>,
) -> ApiResult<Json<MemberResponse>> {
    let room_id = path.room_id()?;
    let target_id = path.user_id()?;

    let service = RoomService::new(state.service_context());
    let member = service.promote(room_id, auth.user_id, target_id).await?;
    Ok(Json(member))
}

/// Demote a moderator (owner only)
///
/// DELETE /rooms/{room_id}/moderators/{user_id}
pub async fn demote_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<RoomUserPath>,
) -> ApiResult<Json<MemberResponse>> {
    let room_id = path.room_id()?;
    let target_id = path.user_id()?;

    let service = RoomService::new(state.service_context());
    let member = service.demote(room_id, auth.user_id, target_id).await?;
    Ok(Json(member))
}

/// Ban a user
///
/// PUT /rooms/{room_id}/bans/{user_id}
pub async fn ban_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<RoomUserPath>,
) -> ApiResult<NoContent> {
    let room_id = path.room_id()?;
    let target_id = path.user_id()?;

    let service = RoomService::new(state.service_context());
    service.ban(room_id, auth.user_id, target_id).await?;
    Ok(NoContent)
}

/// Lift a ban
///
/// DELETE /rooms/{room_id}/bans/{user_id}
pub async fn unban_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<RoomUserPath>,
) -> ApiResult<NoContent> {
    let room_id = path.room_id()?;
    let target_id = path.user_id()?;

    let service = RoomService::new(state.service_context());
    service.unban(room_id, auth.user_id, target_id).await?;
    Ok(NoContent)
}
