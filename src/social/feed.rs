//! Feed composer: read-only, viewer-personalized listings of posts and comments.
//!
//! Every listing is one SQL statement. Counts and viewer flags come from
//! correlated subqueries so nothing is cached and soft-deleted rows never
//! leak into a count.

use rusqlite::types::ToSql;
use rusqlite::{params, Connection, Row};

use super::identity::{summary_from_row, SUMMARY_COLUMNS};
use super::views::{CommentPage, CommentView, Page, PostView};
use super::{content, guard, PageRequest, SocialError, SocialResult};
use crate::db::models::{CommentId, PostId, UserId};

pub type FeedPage = Page<PostView>;

/// Which posts a listing draws from.
#[derive(Debug, Clone, Copy)]
enum Scope<'a> {
    All,
    /// The viewer's own posts plus posts of everyone they follow.
    Following(&'a UserId),
    Owner(&'a UserId),
    Single(&'a PostId),
}

impl Scope<'_> {
    fn clause(&self) -> &'static str {
        match self {
            Scope::All => "1 = 1",
            Scope::Following(_) => {
                "(p.user_id = ?4 OR p.user_id IN \
                 (SELECT following_id FROM follows WHERE follower_id = ?4))"
            }
            Scope::Owner(_) => "p.user_id = ?4",
            Scope::Single(_) => "p.id = ?4",
        }
    }

    fn param(&self) -> Option<&dyn ToSql> {
        match self {
            Scope::All => None,
            Scope::Following(id) | Scope::Owner(id) => Some(*id),
            Scope::Single(id) => Some(*id),
        }
    }
}

/// Viewer-dependent follow flag for the author joined as `u`. Viewer is `?1`.
const FOLLOWING_FLAG: &str = "CASE WHEN ?1 IS NULL OR u.id = ?1 THEN 0 \
     ELSE EXISTS(SELECT 1 FROM follows f WHERE f.follower_id = ?1 AND f.following_id = u.id) END";

fn query_posts(
    conn: &Connection,
    scope: Scope<'_>,
    viewer: Option<&UserId>,
    limit: u32,
    offset: u64,
) -> rusqlite::Result<Vec<PostView>> {
    let sql = format!(
        "SELECT p.id, p.content, p.language, p.image_url, p.created_at,
                {SUMMARY_COLUMNS},
                (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id),
                (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id AND c.is_deleted = 0),
                CASE WHEN ?1 IS NULL THEN 0
                     ELSE EXISTS(SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = ?1)
                END,
                {FOLLOWING_FLAG}
         FROM posts p
         JOIN users u ON u.id = p.user_id
         WHERE p.is_deleted = 0 AND {}
         ORDER BY p.created_at DESC, p.id DESC
         LIMIT ?2 OFFSET ?3",
        scope.clause()
    );

    let mut bound: Vec<&dyn ToSql> = vec![&viewer, &limit, &offset];
    if let Some(param) = scope.param() {
        bound.push(param);
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(&*bound, post_view_from_row)?;
    rows.collect()
}

fn post_view_from_row(row: &Row<'_>) -> rusqlite::Result<PostView> {
    let is_following: bool = row.get(15)?;
    Ok(PostView {
        id: row.get(0)?,
        content: row.get(1)?,
        language: row.get(2)?,
        image_url: row.get(3)?,
        created_at: row.get(4)?,
        user: summary_from_row(row, 5, is_following)?,
        like_count: row.get(12)?,
        comment_count: row.get(13)?,
        is_liked: row.get(14)?,
    })
}

/// Newest-first live posts. With `following_only` and a viewer, only the
/// viewer's own posts and those of users they follow.
pub fn get_feed(
    conn: &Connection,
    viewer: Option<&UserId>,
    page: PageRequest,
    following_only: bool,
) -> SocialResult<FeedPage> {
    let scope = match (following_only, viewer) {
        (true, Some(viewer)) => Scope::Following(viewer),
        (true, None) => {
            tracing::debug!("following_only requested without a viewer, serving global feed");
            Scope::All
        }
        (false, _) => Scope::All,
    };

    let items = query_posts(conn, scope, viewer, page.limit(), page.offset())?;
    Ok(Page::from_items(items, page.page(), page.limit()))
}

pub fn get_post_by_id(
    conn: &Connection,
    post_id: &PostId,
    viewer: Option<&UserId>,
) -> SocialResult<PostView> {
    query_posts(conn, Scope::Single(post_id), viewer, 1, 0)?
        .pop()
        .ok_or_else(|| SocialError::not_found("Post", post_id))
}

/// Posts by one author. An unknown author yields an empty page.
pub fn get_user_posts(
    conn: &Connection,
    owner: &UserId,
    page: PageRequest,
    viewer: Option<&UserId>,
) -> SocialResult<FeedPage> {
    let mut items = query_posts(conn, Scope::Owner(owner), viewer, page.limit(), page.offset())?;
    // The author is the page subject, not a recommendation
    for item in &mut items {
        item.user.is_following = false;
    }
    Ok(Page::from_items(items, page.page(), page.limit()))
}

fn query_comments(
    conn: &Connection,
    clause: &str,
    key: &dyn ToSql,
    viewer: Option<&UserId>,
    limit: u32,
    offset: u64,
) -> rusqlite::Result<Vec<CommentView>> {
    let sql = format!(
        "SELECT c.id, c.content, c.created_at,
                {SUMMARY_COLUMNS},
                {FOLLOWING_FLAG},
                p.user_id
         FROM comments c
         JOIN users u ON u.id = c.user_id
         JOIN posts p ON p.id = c.post_id
         WHERE c.is_deleted = 0 AND {clause}
         ORDER BY c.created_at DESC, c.id DESC
         LIMIT ?2 OFFSET ?3"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![viewer, limit, offset, key], |row| {
        let is_following: bool = row.get(10)?;
        let post_owner: UserId = row.get(11)?;
        let user = summary_from_row(row, 3, is_following)?;
        let can_delete = guard::viewer_can_delete_comment(viewer, &user.id, &post_owner);
        Ok(CommentView {
            id: row.get(0)?,
            content: row.get(1)?,
            created_at: row.get(2)?,
            user,
            can_delete,
        })
    })?;
    rows.collect()
}

/// Live comments on a live post, newest first, with an exact total.
pub fn get_comments(
    conn: &Connection,
    post_id: &PostId,
    page: PageRequest,
    viewer: Option<&UserId>,
) -> SocialResult<CommentPage> {
    content::live_post(conn, post_id)?;

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE post_id = ?1 AND is_deleted = 0",
        params![post_id],
        |row| row.get(0),
    )?;

    let comments = query_comments(
        conn,
        "c.post_id = ?4",
        post_id,
        viewer,
        page.limit(),
        page.offset(),
    )?;

    let returned = comments.len() as u64;
    let has_next =
        returned == u64::from(page.limit()) && page.offset() + returned < total.max(0) as u64;

    Ok(CommentPage {
        comments,
        total,
        page: page.page(),
        limit: page.limit(),
        has_next,
    })
}

/// A single live comment as the viewer sees it.
pub fn get_comment(
    conn: &Connection,
    comment_id: &CommentId,
    viewer: Option<&UserId>,
) -> SocialResult<CommentView> {
    query_comments(conn, "c.id = ?4", comment_id, viewer, 1, 0)?
        .pop()
        .ok_or_else(|| SocialError::not_found("Comment", comment_id))
}
