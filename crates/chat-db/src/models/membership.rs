//! Membership database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for room_memberships table
#[derive(Debug, Clone, FromRow)]
pub struct MembershipModel {
    pub room_id: i64,
    pub user_id: i64,
    pub role: String,
    pub banned: bool,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
