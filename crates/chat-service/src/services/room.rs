//! Room service - room lifecycle, membership changes and moderation
//!
//! Every mutating operation follows the same steps: load a fresh snapshot,
//! ask the role authority, write through the membership store, emit the room
//! event, then hand user-directed signals to the notification fanout.

use std::sync::Arc;

use chat_common::{hash_room_password, validate_room_password, verify_room_password};
use chat_core::{
    authorize, Action, AuthorizationContext, DomainError, MemberRole, Membership, Message, Room,
    RoomEvent, RoomEventDraft, RoomEventPayload, RoomVisibility, Snowflake,
};
use tracing::{info, instrument};
use validator::Validate;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::membership::{MembershipStore, UpsertOutcome};
use super::retry::with_retry;
use crate::dto::{
    CreateRoomRequest, MemberResponse, MessageResponse, RoomResponse, RoomSnapshot,
    UpdateAnnouncementRequest, UpdateRoomRequest,
};

/// Room service for room and membership operations
pub struct RoomService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RoomService<'a> {
    /// Create a new RoomService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    fn members(&self) -> MembershipStore<'a> {
        MembershipStore::new(self.ctx)
    }

    /// Load a room or fail with `RoomNotFound`
    pub async fn load_room(&self, room_id: Snowflake) -> ServiceResult<Room> {
        let rooms = self.ctx.room_repo();
        with_retry(self.ctx.retry(), "room.find_by_id", || rooms.find_by_id(room_id))
            .await?
            .ok_or_else(|| DomainError::RoomNotFound(room_id).into())
    }

    /// Current state of the room as seen at sequence number `seq`
    pub async fn build_snapshot(&self, room: &Room, seq: u64) -> ServiceResult<RoomSnapshot> {
        let members = self.members().list_active_members(room.id).await?;
        let banned = self.members().list_banned_members(room.id).await?;

        Ok(RoomSnapshot {
            room: RoomResponse::from(room),
            members: members.iter().map(MemberResponse::from).collect(),
            banned: banned.iter().map(MemberResponse::from).collect(),
            seq,
        })
    }

    async fn emit(&self, room_id: Snowflake, actor_id: Snowflake, payload: RoomEventPayload) -> ServiceResult<Arc<RoomEvent>> {
        let event = self
            .ctx
            .bus()
            .emit(RoomEventDraft::new(room_id, actor_id, payload))
            .await?;
        self.ctx.fanout().submit_event(&event);
        Ok(event)
    }

    /// Status of the user's latest invitation to the room
    async fn invitation_status(&self, room_id: Snowflake, user_id: Snowflake) -> ServiceResult<Option<chat_core::InvitationStatus>> {
        let invitations = self.ctx.invitation_repo();
        let latest =
            with_retry(self.ctx.retry(), "invitation.find_latest", || invitations.find_latest(room_id, user_id)).await?;
        Ok(latest.map(|i| i.status))
    }

    async fn require_view(&self, room: &Room, actor_id: Snowflake) -> ServiceResult<()> {
        let actor = self.members().get_membership(room.id, actor_id).await?;
        let invitation = match &actor {
            Some(m) if m.is_active() => None,
            _ => self.invitation_status(room.id, actor_id).await?,
        };

        let ctx = AuthorizationContext::new(room.visibility, actor_id)
            .with_actor(actor.as_ref())
            .with_invitation(invitation);
        authorize(&ctx, Action::ViewRoom)?;
        Ok(())
    }

    /// Error for a conditional membership write that matched no row
    async fn unchanged(&self, room_id: Snowflake, target_id: Snowflake, conflict: &str) -> ServiceError {
        match self.members().get_membership(room_id, target_id).await {
            Ok(Some(_)) => ServiceError::conflict(conflict),
            Ok(None) => DomainError::MembershipNotFound.into(),
            Err(e) => e,
        }
    }

    /// Load both memberships and run `action` against them
    async fn authorize_on_target(
        &self,
        room: &Room,
        actor_id: Snowflake,
        target_id: Snowflake,
        action: Action,
    ) -> ServiceResult<Membership> {
        let actor = self.members().get_membership(room.id, actor_id).await?;
        let target = self.members().get_membership(room.id, target_id).await?;

        let ctx = AuthorizationContext::new(room.visibility, actor_id)
            .with_actor(actor.as_ref())
            .with_target(target.as_ref());
        authorize(&ctx, action)?;

        target.ok_or_else(|| DomainError::MembershipNotFound.into())
    }

    /// Check actor-only actions (send, announcement, settings)
    async fn authorize_actor(&self, room: &Room, actor_id: Snowflake, action: Action) -> ServiceResult<()> {
        let actor = self.members().get_membership(room.id, actor_id).await?;
        let ctx = AuthorizationContext::new(room.visibility, actor_id).with_actor(actor.as_ref());
        authorize(&ctx, action)?;
        Ok(())
    }

    // ========================================================================
    // Room lifecycle
    // ========================================================================

    /// Create a room owned by `owner_id`
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_room(&self, owner_id: Snowflake, request: CreateRoomRequest) -> ServiceResult<RoomResponse> {
        request.validate()?;

        let mut room = Room::new(self.ctx.generate_id(), request.name.trim().to_string(), owner_id, request.visibility);
        room.description = request.description;

        if let Some(password) = request.password {
            if request.visibility == RoomVisibility::Public {
                return Err(ServiceError::validation("only private rooms can have a password"));
            }
            validate_room_password(&password)?;
            room.set_password_hash(Some(hash_room_password(&password)?))?;
        }

        let owner = Membership::owner(room.id, owner_id);
        let rooms = self.ctx.room_repo();
        with_retry(self.ctx.retry(), "room.create_with_owner", || rooms.create_with_owner(&room, &owner)).await?;

        info!(room_id = %room.id, owner_id = %owner_id, visibility = %room.visibility, "Room created");

        Ok(RoomResponse::from(&room))
    }

    /// Get a room the actor may view
    #[instrument(skip(self))]
    pub async fn get_room(&self, room_id: Snowflake, actor_id: Snowflake) -> ServiceResult<RoomResponse> {
        let room = self.load_room(room_id).await?;
        self.require_view(&room, actor_id).await?;
        Ok(RoomResponse::from(&room))
    }

    /// Change name, description, visibility or password. Owner only.
    #[instrument(skip(self, request))]
    pub async fn update_settings(
        &self,
        room_id: Snowflake,
        actor_id: Snowflake,
        request: UpdateRoomRequest,
    ) -> ServiceResult<RoomResponse> {
        request.validate()?;

        let mut room = self.load_room(room_id).await?;
        self.authorize_actor(&room, actor_id, Action::ChangeSettings).await?;

        if let Some(name) = request.name {
            room.set_name(name.trim().to_string());
        }
        if let Some(description) = request.description {
            room.set_description(Some(description).filter(|d| !d.is_empty()));
        }
        if let Some(visibility) = request.visibility {
            room.set_visibility(visibility);
        }
        if request.clear_password {
            room.set_password_hash(None)?;
        }
        if let Some(password) = request.password {
            if !room.is_private() {
                return Err(ServiceError::validation("only private rooms can have a password"));
            }
            validate_room_password(&password)?;
            room.set_password_hash(Some(hash_room_password(&password)?))?;
        }

        let rooms = self.ctx.room_repo();
        with_retry(self.ctx.retry(), "room.update", || rooms.update(&room)).await?;

        info!(room_id = %room_id, actor_id = %actor_id, "Room settings updated");

        Ok(RoomResponse::from(&room))
    }

    /// Set or clear the announcement. Owner only.
    #[instrument(skip(self, request))]
    pub async fn change_announcement(
        &self,
        room_id: Snowflake,
        actor_id: Snowflake,
        request: UpdateAnnouncementRequest,
    ) -> ServiceResult<RoomResponse> {
        request.validate()?;

        let mut room = self.load_room(room_id).await?;
        self.authorize_actor(&room, actor_id, Action::ChangeAnnouncement).await?;

        let announcement = request.announcement.filter(|a| !a.trim().is_empty());
        room.set_announcement(announcement.clone());

        let rooms = self.ctx.room_repo();
        with_retry(self.ctx.retry(), "room.update", || rooms.update(&room)).await?;

        self.emit(room_id, actor_id, RoomEventPayload::AnnouncementChanged { announcement })
            .await?;

        info!(room_id = %room_id, actor_id = %actor_id, "Announcement changed");

        Ok(RoomResponse::from(&room))
    }

    /// Everything a client needs to render the room, with the current sequence number
    #[instrument(skip(self))]
    pub async fn room_snapshot(&self, room_id: Snowflake, actor_id: Snowflake) -> ServiceResult<RoomSnapshot> {
        let room = self.load_room(room_id).await?;
        self.require_view(&room, actor_id).await?;

        let seq = self.ctx.bus().position(room_id).await?;
        self.build_snapshot(&room, seq).await
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Join a room.
    ///
    /// Public rooms are open. Private rooms need the room password; rooms
    /// without one are entered by accepting an invitation instead.
    #[instrument(skip(self, password))]
    pub async fn join_room(
        &self,
        room_id: Snowflake,
        user_id: Snowflake,
        password: Option<String>,
    ) -> ServiceResult<MemberResponse> {
        let room = self.load_room(room_id).await?;

        if let Some(existing) = self.members().get_membership(room_id, user_id).await? {
            if existing.banned {
                return Err(ServiceError::forbidden("you are banned from this room"));
            }
            return Ok(MemberResponse::from(&existing));
        }

        if room.is_private() {
            let Some(hash) = room.password_hash.as_deref() else {
                return Err(ServiceError::forbidden("this room is invitation-only"));
            };
            let supplied = password.as_deref().unwrap_or_default();
            if supplied.is_empty() || !verify_room_password(supplied, hash)? {
                return Err(ServiceError::forbidden("incorrect room password"));
            }
        }

        let membership = Membership::new(room_id, user_id);
        match self.members().upsert_membership(&membership).await? {
            UpsertOutcome::Inserted => {
                self.emit(room_id, user_id, RoomEventPayload::MemberJoined { user_id })
                    .await?;
                info!(room_id = %room_id, user_id = %user_id, "Member joined");
                Ok(MemberResponse::from(&membership))
            }
            UpsertOutcome::Existing => {
                let existing = self.members().require_membership(room_id, user_id).await?;
                Ok(MemberResponse::from(&existing))
            }
        }
    }

    /// Leave a room. The owner cannot leave; banned members stay banned.
    #[instrument(skip(self))]
    pub async fn leave_room(&self, room_id: Snowflake, user_id: Snowflake) -> ServiceResult<()> {
        let room = self.load_room(room_id).await?;
        let membership = self.members().require_membership(room.id, user_id).await?;

        if membership.is_owner() {
            return Err(DomainError::CannotLeaveOwnedRoom.into());
        }
        if membership.banned {
            return Err(ServiceError::forbidden("you are banned from this room"));
        }

        if !self.members().remove_membership(room_id, user_id).await? {
            return Err(DomainError::MembershipNotFound.into());
        }

        self.emit(room_id, user_id, RoomEventPayload::MemberLeft { user_id })
            .await?;

        info!(room_id = %room_id, user_id = %user_id, "Member left");
        Ok(())
    }

    /// Active members of a room the actor may view
    #[instrument(skip(self))]
    pub async fn list_members(&self, room_id: Snowflake, actor_id: Snowflake) -> ServiceResult<Vec<MemberResponse>> {
        let room = self.load_room(room_id).await?;
        self.require_view(&room, actor_id).await?;

        let members = self.members().list_active_members(room_id).await?;
        Ok(members.iter().map(MemberResponse::from).collect())
    }

    /// Banned members of a room the actor may view
    #[instrument(skip(self))]
    pub async fn list_bans(&self, room_id: Snowflake, actor_id: Snowflake) -> ServiceResult<Vec<MemberResponse>> {
        let room = self.load_room(room_id).await?;
        self.require_view(&room, actor_id).await?;

        let banned = self.members().list_banned_members(room_id).await?;
        Ok(banned.iter().map(MemberResponse::from).collect())
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Post a message. Requires an active membership.
    #[instrument(skip(self, content))]
    pub async fn post_message(
        &self,
        room_id: Snowflake,
        author_id: Snowflake,
        content: String,
    ) -> ServiceResult<MessageResponse> {
        let room = self.load_room(room_id).await?;
        self.authorize_actor(&room, author_id, Action::SendMessage).await?;

        let message = Message::new(self.ctx.generate_id(), room_id, author_id, content)?;
        let event = self
            .emit(
                room_id,
                author_id,
                RoomEventPayload::MessagePosted {
                    message_id: message.id,
                    content: message.content.clone(),
                },
            )
            .await?;

        info!(room_id = %room_id, message_id = %message.id, seq = event.seq, "Message posted");

        Ok(MessageResponse::new(&message, event.seq))
    }

    // ========================================================================
    // Roles
    // ========================================================================

    /// Make a member a moderator. Owner only.
    #[instrument(skip(self))]
    pub async fn promote(&self, room_id: Snowflake, actor_id: Snowflake, target_id: Snowflake) -> ServiceResult<MemberResponse> {
        self.change_role(room_id, actor_id, target_id, Action::Promote).await
    }

    /// Make a moderator a member again. Owner only.
    #[instrument(skip(self))]
    pub async fn demote(&self, room_id: Snowflake, actor_id: Snowflake, target_id: Snowflake) -> ServiceResult<MemberResponse> {
        self.change_role(room_id, actor_id, target_id, Action::Demote).await
    }

    async fn change_role(
        &self,
        room_id: Snowflake,
        actor_id: Snowflake,
        target_id: Snowflake,
        action: Action,
    ) -> ServiceResult<MemberResponse> {
        let room = self.load_room(room_id).await?;
        let mut target = self.authorize_on_target(&room, actor_id, target_id, action).await?;

        let (from, to) = match action {
            Action::Promote => (MemberRole::Member, MemberRole::Moderator),
            _ => (MemberRole::Moderator, MemberRole::Member),
        };
        if target.role != from {
            return Err(ServiceError::conflict(format!("target is already a {}", target.role)));
        }

        if !self.members().set_role(room_id, target_id, to).await? {
            return Err(DomainError::MembershipNotFound.into());
        }
        target.role = to;

        let payload = match action {
            Action::Promote => RoomEventPayload::RolePromoted { target_id, role: to },
            _ => RoomEventPayload::RoleDemoted { target_id, role: to },
        };
        self.emit(room_id, actor_id, payload).await?;

        info!(room_id = %room_id, target_id = %target_id, actor_id = %actor_id, role = %to, "Member role changed");

        Ok(MemberResponse::from(&target))
    }

    // ========================================================================
    // Moderation
    // ========================================================================

    /// Ban a member. The membership row and its role are kept.
    #[instrument(skip(self))]
    pub async fn ban(&self, room_id: Snowflake, actor_id: Snowflake, target_id: Snowflake) -> ServiceResult<()> {
        let room = self.load_room(room_id).await?;
        let target = self.authorize_on_target(&room, actor_id, target_id, Action::Ban).await?;

        if target.banned {
            return Err(ServiceError::conflict("member is already banned"));
        }
        // The write only matches while the flag is unset, so one of two racing bans wins
        if !self.members().set_banned(room_id, target_id, true).await? {
            return Err(self.unchanged(room_id, target_id, "member is already banned").await);
        }

        self.emit(room_id, actor_id, RoomEventPayload::MemberBanned { target_id })
            .await?;

        info!(room_id = %room_id, target_id = %target_id, actor_id = %actor_id, "Member banned");
        Ok(())
    }

    /// Lift a ban
    #[instrument(skip(self))]
    pub async fn unban(&self, room_id: Snowflake, actor_id: Snowflake, target_id: Snowflake) -> ServiceResult<()> {
        let room = self.load_room(room_id).await?;
        let target = self.authorize_on_target(&room, actor_id, target_id, Action::Unban).await?;

        if !target.banned {
            return Err(ServiceError::conflict("member is not banned"));
        }
        if !self.members().set_banned(room_id, target_id, false).await? {
            return Err(self.unchanged(room_id, target_id, "member is not banned").await);
        }

        self.emit(room_id, actor_id, RoomEventPayload::MemberUnbanned { target_id })
            .await?;

        info!(room_id = %room_id, target_id = %target_id, actor_id = %actor_id, "Member unbanned");
        Ok(())
    }

    /// Remove a member from the room. A banned member must be unbanned first.
    #[instrument(skip(self))]
    pub async fn kick(&self, room_id: Snowflake, actor_id: Snowflake, target_id: Snowflake) -> ServiceResult<()> {
        let room = self.load_room(room_id).await?;
        let target = self.authorize_on_target(&room, actor_id, target_id, Action::Kick).await?;

        if target.banned {
            return Err(ServiceError::conflict("banned members cannot be kicked"));
        }
        if !self.members().remove_membership(room_id, target_id).await? {
            return Err(DomainError::MembershipNotFound.into());
        }

        self.emit(room_id, actor_id, RoomEventPayload::MemberKicked { target_id })
            .await?;

        info!(room_id = %room_id, target_id = %target_id, actor_id = %actor_id, "Member kicked");
        Ok(())
    }
}
