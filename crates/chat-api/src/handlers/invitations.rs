//! Invitation handlers

use axum::{
    extract::{Path, State},
    Json,
};
use chat_service::dto::{CreateInvitationRequest, InvitationResponse};
use chat_service::InvitationService;

use crate::extractors::{AuthUser, InvitationIdPath, RoomIdPath, ValidatedJson};
use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// Invite a user to a private room
///
/// POST /rooms/{room_id}/invitations
pub async fn create_invitation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<RoomIdPath>,
    ValidatedJson(request): ValidatedJson<CreateInvitationRequest>,
) -> ApiResult<Created<Json<InvitationResponse>>> {
    let room_id = path.room_id()?;

    let service = InvitationService::new(state.service_context());
    let invitation = service.create_invitation(room_id, auth.user_id, request).await?;
    Ok(Created(Json(invitation)))
}

/// Pending invitations addressed to the caller
///
/// GET /users/@me/invitations
pub async fn get_my_invitations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<InvitationResponse>>> {
    let service = InvitationService::new(state.service_context());
    let invitations = service.list_pending_invitations(auth.user_id).await?;
    Ok(Json(invitations))
}

/// POST /invitations/{id}/accept
pub async fn accept_invitation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<InvitationIdPath>,
) -> ApiResult<Json<InvitationResponse>> {
    let invitation_id = path.invitation_id()?;

    let service = InvitationService::new(state.service_context());
    let invitation = service.accept_invitation(invitation_id, auth.user_id).await?;
    Ok(Json(invitation))
}

/// POST /invitations/{id}/decline
pub async fn decline_invitation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<InvitationIdPath>,
) -> ApiResult<Json<InvitationResponse>> {
    let invitation_id = path.invitation_id()?;

    let service = InvitationService::new(state.service_context());
    let invitation = service.decline_invitation(invitation_id, auth.user_id).await?;
    Ok(Json(invitation))
}
