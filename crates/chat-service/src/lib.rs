//! # chat-service
//!
//! Application layer: room and membership operations, invitations, the room
//! event bus, live subscriptions and notification fanout.

pub mod dto;
pub mod services;

pub use services::{
    Delivery, InvitationService, NotificationService, ResyncOutcome, RoomEventBus, RoomService,
    RoomSubscription, ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult,
    SessionId, SubscriptionService,
};
