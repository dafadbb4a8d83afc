//! Role authority - decides whether an actor may perform an action in a room
//!
//! [`authorize`] is pure: it reads a membership snapshot and never touches
//! storage. Callers load the snapshot fresh for every mutating operation, so
//! a user who was just promoted passes the next check immediately.
//! A denial is final and never retried.

use std::fmt;

use crate::entities::{InvitationStatus, MemberRole, Membership, RoomVisibility};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Operations gated by the role authority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewRoom,
    SendMessage,
    ReadLive,
    Promote,
    Demote,
    Ban,
    Kick,
    Unban,
    ChangeAnnouncement,
    ChangeSettings,
    Invite,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewRoom => "view_room",
            Self::SendMessage => "send_message",
            Self::ReadLive => "read_live",
            Self::Promote => "promote",
            Self::Demote => "demote",
            Self::Ban => "ban",
            Self::Kick => "kick",
            Self::Unban => "unban",
            Self::ChangeAnnouncement => "change_announcement",
            Self::ChangeSettings => "change_settings",
            Self::Invite => "invite",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason an action was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denial {
    reason: &'static str,
}

impl Denial {
    const fn new(reason: &'static str) -> Self {
        Self { reason }
    }

    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason)
    }
}

impl From<Denial> for DomainError {
    fn from(denial: Denial) -> Self {
        DomainError::Forbidden(denial.reason.to_string())
    }
}

const PRIVATE_ROOM: Denial = Denial::new("this room is private");
const NOT_A_MEMBER: Denial = Denial::new("you are not a member of this room");
const BANNED: Denial = Denial::new("you are banned from this room");
const OWNER_ONLY_ROLES: Denial = Denial::new("only the owner can promote or demote members");
const OWNER_ONLY_SETTINGS: Denial = Denial::new("only the owner can change room settings");
const MODERATORS_ONLY: Denial = Denial::new("only the owner or a moderator can moderate members");
const TARGET_NOT_A_MEMBER: Denial = Denial::new("the target is not a member of this room");
const TARGET_IS_OWNER: Denial = Denial::new("the room owner cannot be targeted");
const TARGET_IS_SELF: Denial = Denial::new("you cannot target yourself");
const INVITE_PUBLIC_ROOM: Denial = Denial::new("invitations are only used by private rooms");

/// Snapshot the authority decides on
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationContext<'a> {
    pub visibility: RoomVisibility,
    pub actor_id: Snowflake,
    pub actor: Option<&'a Membership>,
    pub target: Option<&'a Membership>,
    /// Status of the actor's most recent invitation to the room
    pub invitation: Option<InvitationStatus>,
}

impl<'a> AuthorizationContext<'a> {
    pub fn new(visibility: RoomVisibility, actor_id: Snowflake) -> Self {
        Self {
            visibility,
            actor_id,
            actor: None,
            target: None,
            invitation: None,
        }
    }

    pub fn with_actor(mut self, actor: Option<&'a Membership>) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_target(mut self, target: Option<&'a Membership>) -> Self {
        self.target = target;
        self
    }

    pub fn with_invitation(mut self, invitation: Option<InvitationStatus>) -> Self {
        self.invitation = invitation;
        self
    }

    fn active_actor(&self) -> Option<&'a Membership> {
        self.actor.filter(|m| m.is_active())
    }

    /// Membership of the actor, or the reason it does not count
    fn require_active_actor(&self) -> Result<&'a Membership, Denial> {
        match self.actor {
            None => Err(NOT_A_MEMBER),
            Some(m) if m.banned => Err(BANNED),
            Some(m) => Ok(m),
        }
    }

    /// Target must exist, must not be the owner and must not be the actor
    fn require_target(&self) -> Result<&'a Membership, Denial> {
        let target = self.target.ok_or(TARGET_NOT_A_MEMBER)?;
        if target.role == MemberRole::Owner {
            return Err(TARGET_IS_OWNER);
        }
        if target.user_id == self.actor_id {
            return Err(TARGET_IS_SELF);
        }
        Ok(target)
    }
}

/// Decide whether the actor in `ctx` may perform `action`
pub fn authorize(ctx: &AuthorizationContext<'_>, action: Action) -> Result<(), Denial> {
    match action {
        Action::ViewRoom => {
            // A ban hides the room whatever its visibility or invitations say
            if ctx.actor.is_some_and(|m| m.banned) {
                return Err(BANNED);
            }
            let invited = ctx.invitation.is_some_and(InvitationStatus::grants_view);
            if ctx.visibility == RoomVisibility::Public || ctx.active_actor().is_some() || invited {
                Ok(())
            } else {
                Err(PRIVATE_ROOM)
            }
        }
        Action::SendMessage | Action::ReadLive => ctx.require_active_actor().map(|_| ()),
        Action::Promote | Action::Demote => {
            let actor = ctx.actor.ok_or(NOT_A_MEMBER)?;
            if actor.role != MemberRole::Owner {
                return Err(OWNER_ONLY_ROLES);
            }
            ctx.require_target().map(|_| ())
        }
        Action::Ban | Action::Kick | Action::Unban => {
            let actor = ctx.require_active_actor()?;
            if !actor.role.can_moderate() {
                return Err(MODERATORS_ONLY);
            }
            ctx.require_target().map(|_| ())
        }
        Action::ChangeAnnouncement | Action::ChangeSettings => {
            match ctx.actor {
                Some(actor) if actor.role == MemberRole::Owner => Ok(()),
                _ => Err(OWNER_ONLY_SETTINGS),
            }
        }
        Action::Invite => {
            if ctx.visibility != RoomVisibility::Private {
                return Err(INVITE_PUBLIC_ROOM);
            }
            ctx.require_active_actor().map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOM: Snowflake = Snowflake::new(1);
    const OWNER: Snowflake = Snowflake::new(10);
    const MODERATOR: Snowflake = Snowflake::new(20);
    const MEMBER: Snowflake = Snowflake::new(30);
    const STRANGER: Snowflake = Snowflake::new(40);

    fn owner() -> Membership {
        Membership::owner(ROOM, OWNER)
    }

    fn moderator() -> Membership {
        let mut m = Membership::new(ROOM, MODERATOR);
        m.role = MemberRole::Moderator;
        m
    }

    fn member() -> Membership {
        Membership::new(ROOM, MEMBER)
    }

    fn banned(mut m: Membership) -> Membership {
        m.banned = true;
        m
    }

    fn check(
        visibility: RoomVisibility,
        actor_id: Snowflake,
        actor: Option<&Membership>,
        target: Option<&Membership>,
        action: Action,
    ) -> Result<(), Denial> {
        let ctx = AuthorizationContext::new(visibility, actor_id)
            .with_actor(actor)
            .with_target(target);
        authorize(&ctx, action)
    }

    #[test]
    fn test_view_public_room_without_membership() {
        assert!(check(RoomVisibility::Public, STRANGER, None, None, Action::ViewRoom).is_ok());
        assert!(check(RoomVisibility::Private, STRANGER, None, None, Action::ViewRoom).is_err());
    }

    #[test]
    fn test_view_private_room_with_invitation() {
        // An accepted invitation became a membership; once that is gone, so is access
        for (status, allowed) in [
            (InvitationStatus::Pending, true),
            (InvitationStatus::Accepted, false),
            (InvitationStatus::Declined, false),
        ] {
            let ctx = AuthorizationContext::new(RoomVisibility::Private, STRANGER)
                .with_invitation(Some(status));
            assert_eq!(authorize(&ctx, Action::ViewRoom).is_ok(), allowed, "{status}");
        }
    }

    #[test]
    fn test_banned_member_cannot_view_private_room() {
        let m = banned(member());
        let denial = check(RoomVisibility::Private, MEMBER, Some(&m), None, Action::ViewRoom)
            .unwrap_err();
        assert_eq!(denial.reason(), "you are banned from this room");
    }

    #[test]
    fn test_banned_member_cannot_view_public_room() {
        let m = banned(member());
        assert!(check(RoomVisibility::Public, MEMBER, Some(&m), None, Action::ViewRoom).is_err());

        let ctx = AuthorizationContext::new(RoomVisibility::Private, MEMBER)
            .with_actor(Some(&m))
            .with_invitation(Some(InvitationStatus::Pending));
        assert_eq!(authorize(&ctx, Action::ViewRoom).unwrap_err().reason(), "you are banned from this room");
    }

    #[test]
    fn test_send_message_requires_active_membership() {
        let m = member();
        assert!(check(RoomVisibility::Public, MEMBER, Some(&m), None, Action::SendMessage).is_ok());
        assert!(check(RoomVisibility::Public, STRANGER, None, None, Action::SendMessage).is_err());

        let b = banned(member());
        assert!(check(RoomVisibility::Public, MEMBER, Some(&b), None, Action::ReadLive).is_err());
    }

    #[test]
    fn test_only_owner_promotes() {
        let (o, md, m) = (owner(), moderator(), member());
        assert!(check(RoomVisibility::Private, OWNER, Some(&o), Some(&m), Action::Promote).is_ok());
        assert!(check(RoomVisibility::Private, OWNER, Some(&o), Some(&md), Action::Demote).is_ok());

        let denial = check(RoomVisibility::Private, MODERATOR, Some(&md), Some(&m), Action::Promote)
            .unwrap_err();
        assert_eq!(denial.reason(), "only the owner can promote or demote members");
    }

    #[test]
    fn test_owner_role_is_immutable() {
        let o = owner();
        // Self-demotion is also refused
        assert!(check(RoomVisibility::Private, OWNER, Some(&o), Some(&o), Action::Demote).is_err());

        let md = moderator();
        for action in [Action::Ban, Action::Kick, Action::Unban] {
            let denial = check(RoomVisibility::Private, MODERATOR, Some(&md), Some(&o), action)
                .unwrap_err();
            assert_eq!(denial.reason(), "the room owner cannot be targeted");
        }
    }

    #[test]
    fn test_moderation_rules() {
        let (o, md, m) = (owner(), moderator(), member());
        // Owner may ban a moderator, moderator may ban a member
        assert!(check(RoomVisibility::Private, OWNER, Some(&o), Some(&md), Action::Ban).is_ok());
        assert!(check(RoomVisibility::Private, MODERATOR, Some(&md), Some(&m), Action::Kick).is_ok());
        // Member may not moderate
        assert!(check(RoomVisibility::Private, MEMBER, Some(&m), Some(&md), Action::Ban).is_err());
        // Nobody targets themselves
        let denial = check(RoomVisibility::Private, MODERATOR, Some(&md), Some(&md), Action::Ban)
            .unwrap_err();
        assert_eq!(denial.reason(), "you cannot target yourself");
    }

    #[test]
    fn test_banned_moderator_loses_moderation() {
        let md = banned(moderator());
        let m = member();
        assert!(check(RoomVisibility::Public, MODERATOR, Some(&md), Some(&m), Action::Kick).is_err());
    }

    #[test]
    fn test_settings_are_owner_only() {
        let (o, md) = (owner(), moderator());
        for action in [Action::ChangeAnnouncement, Action::ChangeSettings] {
            assert!(check(RoomVisibility::Public, OWNER, Some(&o), None, action).is_ok());
            assert!(check(RoomVisibility::Public, MODERATOR, Some(&md), None, action).is_err());
        }
    }

    #[test]
    fn test_invite_only_in_private_rooms() {
        let m = member();
        assert!(check(RoomVisibility::Private, MEMBER, Some(&m), None, Action::Invite).is_ok());
        assert!(check(RoomVisibility::Public, MEMBER, Some(&m), None, Action::Invite).is_err());
        assert!(check(RoomVisibility::Private, STRANGER, None, None, Action::Invite).is_err());
    }

    #[test]
    fn test_denial_into_domain_error() {
        let err: DomainError = OWNER_ONLY_ROLES.into();
        assert!(err.is_authorization());
        assert_eq!(err.to_string(), "Forbidden: only the owner can promote or demote members");
    }
}
