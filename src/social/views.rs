use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::models::{CommentId, Language, PostId, UserId};

/// Author card embedded in posts, comments and search results.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    pub bio: String,
    pub place: Option<String>,
    pub state: Option<String>,
    pub is_following: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfileView {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    pub bio: String,
    pub languages: Vec<String>,
    pub place: Option<String>,
    pub state: Option<String>,
    pub follower_count: i64,
    pub following_count: i64,
    pub post_count: i64,
    pub is_following: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: PostId,
    pub user: UserSummary,
    pub content: String,
    pub language: Language,
    pub image_url: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: CommentId,
    pub user: UserSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub can_delete: bool,
}

/// A page of items whose `has_next` is the `len == limit` heuristic.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn from_items(items: Vec<T>, page: u32, limit: u32) -> Self {
        let has_next = items.len() == limit as usize;
        Self {
            items,
            page,
            limit,
            has_next,
        }
    }
}

/// Comment listings carry a real total, so `has_next` is exact.
#[derive(Debug, Clone, Serialize)]
pub struct CommentPage {
    pub comments: Vec<CommentView>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub has_next: bool,
}
