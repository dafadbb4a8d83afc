//! Membership entity <-> model mapper

use chat_core::entities::{MemberRole, Membership};
use chat_core::error::DomainError;
use chat_core::value_objects::Snowflake;

use crate::models::MembershipModel;
use crate::repositories::corrupt_column;

impl TryFrom<MembershipModel> for Membership {
    type Error = DomainError;

    fn try_from(model: MembershipModel) -> Result<Self, Self::Error> {
        let role: MemberRole = model
            .role
            .parse()
            .map_err(|_| corrupt_column("room_memberships.role", &model.role))?;

        Ok(Membership {
            room_id: Snowflake::new(model.room_id),
            user_id: Snowflake::new(model.user_id),
            role,
            banned: model.banned,
            joined_at: model.joined_at,
            updated_at: model.updated_at,
        })
    }
}

/// Convert a batch of rows, failing on the first bad one
pub fn memberships_from_models(models: Vec<MembershipModel>) -> Result<Vec<Membership>, DomainError> {
    models.into_iter().map(Membership::try_from).collect()
}
