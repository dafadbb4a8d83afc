//! Room entity <-> model mapper

use chat_core::entities::{Room, RoomVisibility};
use chat_core::error::DomainError;
use chat_core::value_objects::Snowflake;

use crate::models::RoomModel;
use crate::repositories::corrupt_column;

impl TryFrom<RoomModel> for Room {
    type Error = DomainError;

    fn try_from(model: RoomModel) -> Result<Self, Self::Error> {
        let visibility: RoomVisibility = model
            .visibility
            .parse()
            .map_err(|_| corrupt_column("rooms.visibility", &model.visibility))?;

        Ok(Room {
            id: Snowflake::new(model.id),
            name: model.name,
            description: model.description,
            visibility,
            password_hash: model.password_hash,
            owner_id: Snowflake::new(model.owner_id),
            announcement: model.announcement,
            member_count: model.member_count,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
