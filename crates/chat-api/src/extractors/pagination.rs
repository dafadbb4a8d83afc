//! Pagination extractor
//!
//! Cursor-based paging of the notification feed, newest first.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use chat_core::Snowflake;
use chat_service::dto::NotificationQueryParams;
use serde::Deserialize;

use crate::response::ApiError;

/// Default page size
const DEFAULT_LIMIT: i64 = 50;
/// Maximum page size
const MAX_LIMIT: i64 = 100;

/// Raw query parameters
#[derive(Debug, Deserialize)]
pub struct NotificationPageParams {
    #[serde(default)]
    pub unread_only: Option<bool>,
    /// Only notifications older than this id
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Validated notification page
#[derive(Debug, Clone)]
pub struct NotificationPage {
    pub unread_only: bool,
    pub before: Option<Snowflake>,
    /// Clamped to 1-100
    pub limit: i64,
}

impl Default for NotificationPage {
    fn default() -> Self {
        Self {
            unread_only: false,
            before: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl NotificationPage {
    /// Service query for this page
    pub fn into_query(self) -> NotificationQueryParams {
        NotificationQueryParams {
            unread_only: Some(self.unread_only),
            before: self.before,
            limit: Some(self.limit),
        }
    }
}

impl TryFrom<NotificationPageParams> for NotificationPage {
    type Error = ApiError;

    fn try_from(params: NotificationPageParams) -> Result<Self, Self::Error> {
        let before = params
            .before
            .map(|s| {
                s.parse::<Snowflake>()
                    .map_err(|_| ApiError::invalid_query("Invalid 'before' cursor format"))
            })
            .transpose()?;

        Ok(NotificationPage {
            unread_only: params.unread_only.unwrap_or(false),
            before,
            limit: params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for NotificationPage
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<NotificationPageParams>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_query(e.to_string()))?;

        NotificationPage::try_from(params)
    }
}
