//! Route handlers
//!
//! All HTTP request handlers organized by domain.

pub mod health;
pub mod invitations;
pub mod members;
pub mod notifications;
pub mod rooms;
