//! Invitation entity <-> model mapper

use chat_core::entities::{Invitation, InvitationStatus};
use chat_core::error::DomainError;
use chat_core::value_objects::Snowflake;

use crate::models::InvitationModel;
use crate::repositories::corrupt_column;

impl TryFrom<InvitationModel> for Invitation {
    type Error = DomainError;

    fn try_from(model: InvitationModel) -> Result<Self, Self::Error> {
        let status: InvitationStatus = model
            .status
            .parse()
            .map_err(|_| corrupt_column("room_invitations.status", &model.status))?;

        Ok(Invitation {
            id: Snowflake::new(model.id),
            room_id: Snowflake::new(model.room_id),
            inviter_id: Snowflake::new(model.inviter_id),
            invitee_id: Snowflake::new(model.invitee_id),
            status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
