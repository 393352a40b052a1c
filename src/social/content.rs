//! Posts and comments: creation and soft deletion.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{guard, validation, SocialError, SocialResult};
use crate::db::models::{Comment, CommentId, Language, Post, PostId, UserId};

/// A post that exists and has not been soft-deleted.
pub fn live_post(conn: &Connection, post_id: &PostId) -> SocialResult<Post> {
    conn.query_row(
        &format!(
            "SELECT {} FROM posts WHERE id = ?1 AND is_deleted = 0",
            Post::COLUMNS
        ),
        params![post_id],
        Post::from_row,
    )
    .optional()?
    .ok_or_else(|| SocialError::not_found("Post", post_id))
}

fn live_comment(conn: &Connection, comment_id: &CommentId) -> rusqlite::Result<Option<Comment>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM comments WHERE id = ?1 AND is_deleted = 0",
            Comment::COLUMNS
        ),
        params![comment_id],
        Comment::from_row,
    )
    .optional()
}

pub fn create_post(
    conn: &Connection,
    owner: &UserId,
    content: &str,
    language: Language,
    image_url: Option<String>,
) -> SocialResult<Post> {
    let content = validation::post_content(content)?;
    let id = PostId::generate();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO posts (id, user_id, content, language, image_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![id, owner, content, language, image_url, now],
    )?;

    tracing::debug!(post_id = %id, user_id = %owner, %language, "created post");
    Ok(Post {
        id,
        user_id: owner.clone(),
        content,
        language,
        image_url,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    })
}

/// Soft delete. Deleting twice reports NotFound the second time.
pub fn delete_post(conn: &Connection, post_id: &PostId, actor: &UserId) -> SocialResult<()> {
    let post = live_post(conn, post_id)?;
    guard::authorize_post_delete(actor, &post.user_id)?;

    conn.execute(
        "UPDATE posts SET is_deleted = 1, updated_at = ?2 WHERE id = ?1",
        params![post_id, Utc::now()],
    )?;
    tracing::info!(post_id = %post_id, user_id = %actor, "deleted post");
    Ok(())
}

pub fn create_comment(
    conn: &Connection,
    post_id: &PostId,
    actor: &UserId,
    content: &str,
) -> SocialResult<Comment> {
    live_post(conn, post_id)?;
    let content = validation::comment_content(content)?;
    let id = CommentId::generate();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO comments (id, post_id, user_id, content, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![id, post_id, actor, content, now],
    )?;

    Ok(Comment {
        id,
        post_id: post_id.clone(),
        user_id: actor.clone(),
        content,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    })
}

/// Returns `false` when there is no live comment with this id.
pub fn delete_comment(
    conn: &Connection,
    comment_id: &CommentId,
    actor: &UserId,
) -> SocialResult<bool> {
    let Some(comment) = live_comment(conn, comment_id)? else {
        return Ok(false);
    };
    // The parent may already be soft-deleted; its owner still counts.
    let post_owner: UserId = conn.query_row(
        "SELECT user_id FROM posts WHERE id = ?1",
        params![comment.post_id],
        |row| row.get(0),
    )?;
    guard::authorize_comment_delete(actor, &comment.user_id, &post_owner)?;

    conn.execute(
        "UPDATE comments SET is_deleted = 1, updated_at = ?2 WHERE id = ?1",
        params![comment_id, Utc::now()],
    )?;
    Ok(true)
}
