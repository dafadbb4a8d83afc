//! Notification feed handlers

use axum::{extract::State, Json};
use chat_service::dto::{MarkReadRequest, NotificationResponse};
use chat_service::NotificationService;
use serde::Serialize;

use crate::extractors::{AuthUser, NotificationPage, ValidatedJson};
use crate::response::ApiResult;
use crate::state::AppState;

/// Result of a mark-read request
#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    /// Notifications that changed from unread to read
    pub updated: u64,
}

/// Notifications of the caller, newest first
///
/// GET /users/@me/notifications
pub async fn get_my_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    page: NotificationPage,
) -> ApiResult<Json<Vec<NotificationResponse>>> {
    let service = NotificationService::new(state.service_context());
    let notifications = service.list_notifications(auth.user_id, page.into_query()).await?;
    Ok(Json(notifications))
}

/// Mark notifications as read
///
/// POST /users/@me/notifications/read
pub async fn mark_notifications_read(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<MarkReadRequest>,
) -> ApiResult<Json<MarkReadResponse>> {
    let service = NotificationService::new(state.service_context());
    let updated = service.mark_read(auth.user_id, &request.ids).await?;
    Ok(Json(MarkReadResponse { updated }))
}
