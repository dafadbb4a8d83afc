//! Notification database model

use chat_core::entities::NotificationKind;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;

/// Database model for notifications table. `kind` is stored as JSONB.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationModel {
    pub id: i64,
    pub user_id: i64,
    pub room_id: i64,
    pub kind: Json<NotificationKind>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
