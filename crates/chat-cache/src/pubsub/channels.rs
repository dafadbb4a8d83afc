//! Pub/Sub channel definitions.

use chat_core::Snowflake;

/// Channel prefix for user-specific events
pub const USER_CHANNEL_PREFIX: &str = "user:";
/// Suffix of the per-user notification channel
pub const NOTIFICATIONS_SUFFIX: &str = ":notifications";
/// Pattern matching every user's notification channel
pub const USER_NOTIFICATIONS_PATTERN: &str = "user:*:notifications";

/// Pub/Sub channel types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PubSubChannel {
    /// Notifications addressed to one user, delivered to all their sessions
    UserNotifications(Snowflake),
    /// Custom channel name
    Custom(String),
}

impl PubSubChannel {
    #[must_use]
    pub fn user_notifications(user_id: Snowflake) -> Self {
        Self::UserNotifications(user_id)
    }

    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Get the Redis channel name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::UserNotifications(id) => format!("{USER_CHANNEL_PREFIX}{id}{NOTIFICATIONS_SUFFIX}"),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Parse a channel name back to a `PubSubChannel`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let user_id = name
            .strip_prefix(USER_CHANNEL_PREFIX)
            .and_then(|rest| rest.strip_suffix(NOTIFICATIONS_SUFFIX))
            .and_then(|id| id.parse::<i64>().ok());

        match user_id {
            Some(id) => Self::UserNotifications(Snowflake::from(id)),
            None => Self::Custom(name.to_string()),
        }
    }

    /// Addressee of a user channel
    #[must_use]
    pub fn user_id(&self) -> Option<Snowflake> {
        match self {
            Self::UserNotifications(id) => Some(*id),
            Self::Custom(_) => None,
        }
    }
}

impl std::fmt::Display for PubSubChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        let user_id = Snowflake::from(11111i64);
        assert_eq!(PubSubChannel::user_notifications(user_id).name(), "user:11111:notifications");
        assert_eq!(PubSubChannel::custom("test").name(), "test");
    }

    #[test]
    fn test_channel_parse() {
        let channel = PubSubChannel::parse("user:11111:notifications");
        assert_eq!(channel, PubSubChannel::UserNotifications(Snowflake::from(11111i64)));
        assert_eq!(channel.user_id(), Some(Snowflake::from(11111i64)));

        assert_eq!(PubSubChannel::parse("user:abc:notifications"), PubSubChannel::custom("user:abc:notifications"));
        assert_eq!(PubSubChannel::parse("user:42"), PubSubChannel::custom("user:42"));
    }
}
