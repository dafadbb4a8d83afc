//! Notification entity <-> model mapper

use chat_core::entities::Notification;
use chat_core::value_objects::Snowflake;

use crate::models::NotificationModel;

impl From<NotificationModel> for Notification {
    fn from(model: NotificationModel) -> Self {
        Notification {
            id: Snowflake::new(model.id),
            user_id: Snowflake::new(model.user_id),
            room_id: Snowflake::new(model.room_id),
            kind: model.kind.0,
            read: model.read,
            created_at: model.created_at,
        }
    }
}
