//! The follow graph: directed edges between users.

use chrono::Utc;
use rusqlite::{params, Connection};

use super::{guard, identity, SocialError, SocialResult};
use crate::db;
use crate::db::models::UserId;

/// Add `follower -> target`. `false` when the edge already exists.
pub fn follow_user(conn: &Connection, follower: &UserId, target: &UserId) -> SocialResult<bool> {
    guard::authorize_follow(follower, target)?;

    for id in [follower, target] {
        if !identity::user_exists(conn, id)? {
            return Err(SocialError::not_found("User", id));
        }
    }

    let inserted = conn.execute(
        "INSERT INTO follows (id, follower_id, following_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![uuid::Uuid::now_v7().to_string(), follower, target, Utc::now()],
    );
    match inserted {
        Ok(_) => {
            tracing::debug!(follower = %follower, target = %target, "follow added");
            Ok(true)
        }
        Err(e) if db::is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

pub fn unfollow_user(conn: &Connection, follower: &UserId, target: &UserId) -> SocialResult<bool> {
    let rows = conn.execute(
        "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
        params![follower, target],
    )?;
    Ok(rows > 0)
}
