//! Invitation flow for private rooms

use chat_core::{
    authorize, Action, AuthorizationContext, DomainError, Invitation, InvitationStatus, Membership,
    NotificationTarget, RoomEventDraft, RoomEventPayload, Snowflake,
};
use tracing::{info, instrument};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::membership::MembershipStore;
use super::retry::with_retry;
use super::room::RoomService;
use crate::dto::{CreateInvitationRequest, InvitationResponse};

/// Invitation service
pub struct InvitationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> InvitationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    async fn load_invitation(&self, invitation_id: Snowflake) -> ServiceResult<Invitation> {
        let repo = self.ctx.invitation_repo();
        with_retry(self.ctx.retry(), "invitation.find_by_id", || repo.find_by_id(invitation_id))
            .await?
            .ok_or_else(|| DomainError::InvitationNotFound(invitation_id).into())
    }

    /// Invite a user to a private room.
    ///
    /// Re-inviting while an invitation is pending updates that invitation
    /// instead of creating a second one.
    #[instrument(skip(self, request), fields(invitee_id = %request.invitee_id))]
    pub async fn create_invitation(
        &self,
        room_id: Snowflake,
        inviter_id: Snowflake,
        request: CreateInvitationRequest,
    ) -> ServiceResult<InvitationResponse> {
        let invitee_id = request.invitee_id;
        let room = RoomService::new(self.ctx).load_room(room_id).await?;
        if !room.is_private() {
            return Err(DomainError::NotPrivateRoom.into());
        }

        let members = MembershipStore::new(self.ctx);
        if members
            .get_membership(room_id, invitee_id)
            .await?
            .is_some_and(|m| m.is_active())
        {
            return Err(DomainError::AlreadyMember.into());
        }

        let inviter = members.get_membership(room_id, inviter_id).await?;
        let ctx = AuthorizationContext::new(room.visibility, inviter_id).with_actor(inviter.as_ref());
        authorize(&ctx, Action::Invite)?;

        let draft = Invitation::new(self.ctx.generate_id(), room_id, inviter_id, invitee_id);
        let repo = self.ctx.invitation_repo();
        let invitation =
            with_retry(self.ctx.retry(), "invitation.upsert_pending", || repo.upsert_pending(&draft)).await?;

        self.ctx.fanout().submit(NotificationTarget::from_invitation(&invitation));

        info!(
            invitation_id = %invitation.id,
            room_id = %room_id,
            inviter_id = %inviter_id,
            invitee_id = %invitee_id,
            "Invitation created"
        );

        Ok(InvitationResponse::from(&invitation))
    }

    /// Accept an invitation, creating the invitee's membership
    #[instrument(skip(self))]
    pub async fn accept_invitation(&self, invitation_id: Snowflake, actor_id: Snowflake) -> ServiceResult<InvitationResponse> {
        let mut invitation = self.load_invitation(invitation_id).await?;
        if !invitation.is_for(actor_id) {
            return Err(DomainError::NotInvitee.into());
        }
        if !invitation.is_pending() {
            return Err(ServiceError::conflict("invitation is no longer pending"));
        }

        let room_id = invitation.room_id;
        let members = MembershipStore::new(self.ctx);
        let existing = members.get_membership(room_id, actor_id).await?;
        if existing.as_ref().is_some_and(|m| m.banned) {
            return Err(ServiceError::forbidden("you are banned from this room"));
        }

        let membership = Membership::new(room_id, actor_id);
        let repo = self.ctx.invitation_repo();
        with_retry(self.ctx.retry(), "invitation.accept", || repo.accept(invitation_id, &membership)).await?;
        invitation.resolve(InvitationStatus::Accepted);

        members.refresh_member_count(room_id).await?;

        if existing.is_none() {
            let event = self
                .ctx
                .bus()
                .emit(RoomEventDraft::new(
                    room_id,
                    actor_id,
                    RoomEventPayload::MemberJoined { user_id: actor_id },
                ))
                .await?;
            self.ctx.fanout().submit_event(&event);
        }

        info!(invitation_id = %invitation_id, room_id = %room_id, user_id = %actor_id, "Invitation accepted");

        Ok(InvitationResponse::from(&invitation))
    }

    /// Decline a pending invitation
    #[instrument(skip(self))]
    pub async fn decline_invitation(&self, invitation_id: Snowflake, actor_id: Snowflake) -> ServiceResult<InvitationResponse> {
        let mut invitation = self.load_invitation(invitation_id).await?;
        if !invitation.is_for(actor_id) {
            return Err(DomainError::NotInvitee.into());
        }

        let repo = self.ctx.invitation_repo();
        let resolved = with_retry(self.ctx.retry(), "invitation.resolve", || {
            repo.resolve(invitation_id, InvitationStatus::Declined)
        })
        .await?;
        if !resolved {
            return Err(ServiceError::conflict("invitation is no longer pending"));
        }
        invitation.resolve(InvitationStatus::Declined);

        info!(invitation_id = %invitation_id, user_id = %actor_id, "Invitation declined");

        Ok(InvitationResponse::from(&invitation))
    }

    /// Pending invitations addressed to `user_id`, newest first
    #[instrument(skip(self))]
    pub async fn list_pending_invitations(&self, user_id: Snowflake) -> ServiceResult<Vec<InvitationResponse>> {
        let repo = self.ctx.invitation_repo();
        let pending = with_retry(self.ctx.retry(), "invitation.find_pending_by_invitee", || {
            repo.find_pending_by_invitee(user_id)
        })
        .await?;

        Ok(pending.iter().map(InvitationResponse::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::subscription::{Delivery, SubscriptionService};
    use crate::services::testing::TestHarness;
    use chat_core::traits::MembershipRepository;
    use chat_core::{MemberRole, NotificationKind, RemovalReason, RoomVisibility};
    use chat_db::memory::{Fault, Table};

    const OWNER: Snowflake = Snowflake::new(100);
    const ALICE: Snowflake = Snowflake::new(200);
    const BOB: Snowflake = Snowflake::new(300);

    fn invite(invitee_id: Snowflake) -> CreateInvitationRequest {
        CreateInvitationRequest { invitee_id }
    }

    fn id(raw: &str) -> Snowflake {
        raw.parse().unwrap()
    }

    #[tokio::test]
    async fn test_public_room_rejects_invitations() {
        let h = TestHarness::new();
        let room = h.room(RoomVisibility::Public).await;

        let err = InvitationService::new(&h.ctx)
            .create_invitation(room.id, OWNER, invite(ALICE))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_PRIVATE_ROOM");
    }

    #[tokio::test]
    async fn test_invitation_checks_inviter_and_invitee() {
        let h = TestHarness::new();
        let room = h.room(RoomVisibility::Private).await;
        let service = InvitationService::new(&h.ctx);

        let err = service.create_invitation(room.id, BOB, invite(ALICE)).await.unwrap_err();
        assert_eq!(err.status_code(), 403);

        h.member(room.id, ALICE).await;
        let err = service.create_invitation(room.id, OWNER, invite(ALICE)).await.unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_MEMBER");

        // Plain members of a private room may invite
        service.create_invitation(room.id, ALICE, invite(BOB)).await.unwrap();
    }

    #[tokio::test]
    async fn test_reinviting_keeps_one_pending_invitation() {
        let h = TestHarness::new();
        let room = h.room(RoomVisibility::Private).await;
        h.member(room.id, ALICE).await;
        let service = InvitationService::new(&h.ctx);

        let first = service.create_invitation(room.id, OWNER, invite(BOB)).await.unwrap();
        let second = service.create_invitation(room.id, ALICE, invite(BOB)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.inviter_id, ALICE.to_string());

        let pending = service.list_pending_invitations(BOB).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, InvitationStatus::Pending);
    }

    #[tokio::test]
    async fn test_concurrent_invitations_keep_one_pending() {
        let h = TestHarness::new();
        let room = h.room(RoomVisibility::Private).await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ctx = h.ctx.clone();
                tokio::spawn(async move {
                    InvitationService::new(&ctx)
                        .create_invitation(room.id, OWNER, invite(BOB))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let pending = InvitationService::new(&h.ctx).list_pending_invitations(BOB).await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_only_invitee_may_respond() {
        let h = TestHarness::new();
        let room = h.room(RoomVisibility::Private).await;
        let service = InvitationService::new(&h.ctx);
        let invitation = service.create_invitation(room.id, OWNER, invite(ALICE)).await.unwrap();
        let invitation_id = id(&invitation.id);

        let err = service.accept_invitation(invitation_id, BOB).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_INVITEE");
        let err = service.decline_invitation(invitation_id, BOB).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_INVITEE");

        let err = service.accept_invitation(Snowflake::new(404), ALICE).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_stale_invitation_conflicts() {
        let h = TestHarness::new();
        let room = h.room(RoomVisibility::Private).await;
        let service = InvitationService::new(&h.ctx);
        let invitation = service.create_invitation(room.id, OWNER, invite(ALICE)).await.unwrap();
        let invitation_id = id(&invitation.id);

        let declined = service.decline_invitation(invitation_id, ALICE).await.unwrap();
        assert_eq!(declined.status, InvitationStatus::Declined);

        assert_eq!(service.accept_invitation(invitation_id, ALICE).await.unwrap_err().status_code(), 409);
        assert_eq!(service.decline_invitation(invitation_id, ALICE).await.unwrap_err().status_code(), 409);
        assert!(service.list_pending_invitations(ALICE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_banned_invitee_cannot_accept() {
        let h = TestHarness::new();
        let room = h.room(RoomVisibility::Private).await;
        h.member(room.id, ALICE).await;
        h.db.memberships().set_banned(room.id, ALICE, true).await.unwrap();

        let service = InvitationService::new(&h.ctx);
        let invitation = service.create_invitation(room.id, OWNER, invite(ALICE)).await.unwrap();
        let err = service.accept_invitation(id(&invitation.id), ALICE).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_accept_retries_unavailable_store() {
        let h = TestHarness::new();
        let room = h.room(RoomVisibility::Private).await;
        let service = InvitationService::new(&h.ctx);
        let invitation = service.create_invitation(room.id, OWNER, invite(ALICE)).await.unwrap();

        h.db.fail_next(Table::Invitations, Fault::Unavailable, 2);
        let accepted = service.accept_invitation(id(&invitation.id), ALICE).await.unwrap();
        assert_eq!(accepted.status, InvitationStatus::Accepted);

        let membership = h.db.memberships().find(room.id, ALICE).await.unwrap().unwrap();
        assert_eq!(membership.role, MemberRole::Member);
    }

    #[tokio::test]
    async fn test_owner_alice_bob_scenario() {
        let h = TestHarness::new();
        let owner_rooms = RoomService::new(&h.ctx);
        let invitations = InvitationService::new(&h.ctx);

        // O creates a private room and invites A
        let room = h.room(RoomVisibility::Private).await;
        let invitation = invitations.create_invitation(room.id, OWNER, invite(ALICE)).await.unwrap();
        assert_eq!(invitations.list_pending_invitations(ALICE).await.unwrap().len(), 1);

        // A accepts
        let accepted = invitations.accept_invitation(id(&invitation.id), ALICE).await.unwrap();
        assert_eq!(accepted.status, InvitationStatus::Accepted);
        let alice = h.db.memberships().find(room.id, ALICE).await.unwrap().unwrap();
        assert_eq!(alice.role, MemberRole::Member);
        assert!(invitations.list_pending_invitations(ALICE).await.unwrap().is_empty());

        // O promotes A
        let promoted = owner_rooms.promote(room.id, OWNER, ALICE).await.unwrap();
        assert_eq!(promoted.role, MemberRole::Moderator);

        // B joins through an invitation and watches the room
        let bob_invite = invitations.create_invitation(room.id, ALICE, invite(BOB)).await.unwrap();
        invitations.accept_invitation(id(&bob_invite.id), BOB).await.unwrap();
        let mut bob_sub = SubscriptionService::new(&h.ctx)
            .subscribe(Snowflake::new(9000), BOB, room.id)
            .await
            .unwrap();

        // A bans B
        owner_rooms.ban(room.id, ALICE, BOB).await.unwrap();
        let bob = h.db.memberships().find(room.id, BOB).await.unwrap().unwrap();
        assert!(bob.banned);
        assert!(matches!(
            bob_sub.next().await.unwrap(),
            Delivery::Removed { reason: RemovalReason::Banned, .. }
        ));

        h.ctx.fanout().flush().await;
        let feed = h.notifications_of(BOB).await;
        assert_eq!(feed[0].kind, NotificationKind::Banned { actor_id: ALICE });

        // O bans A: moderators are not protected from the owner
        owner_rooms.ban(room.id, OWNER, ALICE).await.unwrap();
        let alice = h.db.memberships().find(room.id, ALICE).await.unwrap().unwrap();
        assert!(alice.banned);
        assert_eq!(alice.role, MemberRole::Moderator);
    }
}
