//! Social core: identities, the follow graph, posts and comments, likes, and
//! the feed composer that stitches them into viewer-personalized pages.
//!
//! Every operation takes a borrowed `rusqlite::Connection` and returns a
//! typed [`SocialError`]. HTTP status mapping happens in `crate::error`.

pub mod content;
pub mod engagement;
pub mod feed;
pub mod graph;
pub mod guard;
pub mod identity;
pub mod validation;
pub mod views;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error("{kind} with ID {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Not authorized to {0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

impl SocialError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field),
            message: message.into(),
        }
    }
}

pub type SocialResult<T> = Result<T, SocialError>;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 50;

/// Raw `page`/`limit` query parameters, before range checks.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// A validated page window: `page >= 1`, `1 <= limit <= 50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> SocialResult<Self> {
        if page < 1 {
            return Err(SocialError::validation("page", "Page must be at least 1"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(SocialError::validation(
                "limit",
                format!("Limit must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TryFrom<PageParams> for PageRequest {
    type Error = SocialError;

    fn try_from(params: PageParams) -> SocialResult<Self> {
        Self::new(
            params.page.unwrap_or(1),
            params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}
