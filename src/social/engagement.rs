use chrono::Utc;
use rusqlite::{params, Connection};

use super::{content, SocialResult};
use crate::db;
use crate::db::models::{PostId, UserId};

/// Like a live post. `false` when the like already exists.
pub fn like_post(conn: &Connection, post_id: &PostId, actor: &UserId) -> SocialResult<bool> {
    content::live_post(conn, post_id)?;

    let inserted = conn.execute(
        "INSERT INTO likes (id, user_id, post_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![uuid::Uuid::now_v7().to_string(), actor, post_id, Utc::now()],
    );
    match inserted {
        Ok(_) => Ok(true),
        Err(e) if db::is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// `false` when there was nothing to remove.
pub fn unlike_post(conn: &Connection, post_id: &PostId, actor: &UserId) -> SocialResult<bool> {
    let rows = conn.execute(
        "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
        params![actor, post_id],
    )?;
    Ok(rows > 0)
}
