//! Entity to DTO mappers
//!
//! Implements `From` conversions from domain entities to response DTOs.

use chat_core::entities::{Invitation, Membership, Message, Notification, Room};

use super::responses::{
    InvitationResponse, MemberResponse, MessageResponse, NotificationResponse, RoomResponse,
};

// ============================================================================
// Room Mappers
// ============================================================================

impl From<&Room> for RoomResponse {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.to_string(),
            name: room.name.clone(),
            description: room.description.clone(),
            visibility: room.visibility,
            owner_id: room.owner_id.to_string(),
            announcement: room.announcement.clone(),
            has_password: room.has_password(),
            member_count: room.member_count,
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}

impl From<Room> for RoomResponse {
    fn from(room: Room) -> Self {
        Self::from(&room)
    }
}

// ============================================================================
// Membership Mappers
// ============================================================================

impl From<&Membership> for MemberResponse {
    fn from(membership: &Membership) -> Self {
        Self {
            room_id: membership.room_id.to_string(),
            user_id: membership.user_id.to_string(),
            role: membership.role,
            banned: membership.banned,
            joined_at: membership.joined_at,
        }
    }
}

// ============================================================================
// Message Mappers
// ============================================================================

impl MessageResponse {
    /// Message as posted at sequence number `seq`
    pub fn new(message: &Message, seq: u64) -> Self {
        Self {
            id: message.id.to_string(),
            room_id: message.room_id.to_string(),
            author_id: message.author_id.to_string(),
            content: message.content.clone(),
            seq,
            created_at: message.created_at,
        }
    }
}

// ============================================================================
// Invitation Mappers
// ============================================================================

impl From<&Invitation> for InvitationResponse {
    fn from(invitation: &Invitation) -> Self {
        Self {
            id: invitation.id.to_string(),
            room_id: invitation.room_id.to_string(),
            inviter_id: invitation.inviter_id.to_string(),
            invitee_id: invitation.invitee_id.to_string(),
            status: invitation.status,
            created_at: invitation.created_at,
            updated_at: invitation.updated_at,
        }
    }
}

// ============================================================================
// Notification Mappers
// ============================================================================

impl From<&Notification> for NotificationResponse {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id.to_string(),
            room_id: notification.room_id.to_string(),
            kind: notification.kind.clone(),
            read: notification.read,
            created_at: notification.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::{RoomVisibility, Snowflake};

    #[test]
    fn test_room_response_hides_password_hash() {
        let mut room = Room::new(Snowflake::new(1), "Secret".to_string(), Snowflake::new(2), RoomVisibility::Private);
        room.set_password_hash(Some("$argon2id$hash".to_string())).unwrap();

        let response = RoomResponse::from(&room);
        assert!(response.has_password);
        assert_eq!(response.owner_id, "2");

        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn test_member_response_from_membership() {
        let membership = Membership::owner(Snowflake::new(1), Snowflake::new(2));
        let response = MemberResponse::from(&membership);
        assert_eq!(response.user_id, "2");
        assert_eq!(response.role, chat_core::MemberRole::Owner);
        assert!(!response.banned);
    }
}
