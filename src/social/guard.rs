//! Authorization rules for mutations. Pure functions over ids; callers load
//! the ownership facts and ask here whether the actor may proceed.

use super::{SocialError, SocialResult};
use crate::db::models::UserId;

/// Only the author may delete a post.
pub fn authorize_post_delete(actor: &UserId, post_owner: &UserId) -> SocialResult<()> {
    if actor != post_owner {
        return Err(SocialError::Forbidden("delete this post"));
    }
    Ok(())
}

/// The comment author or the author of the post it sits under.
pub fn can_delete_comment(actor: &UserId, comment_owner: &UserId, post_owner: &UserId) -> bool {
    actor == comment_owner || actor == post_owner
}

pub fn authorize_comment_delete(
    actor: &UserId,
    comment_owner: &UserId,
    post_owner: &UserId,
) -> SocialResult<()> {
    if !can_delete_comment(actor, comment_owner, post_owner) {
        return Err(SocialError::Forbidden("delete this comment"));
    }
    Ok(())
}

/// Viewer-side flag for comment listings; anonymous viewers never can.
pub fn viewer_can_delete_comment(
    viewer: Option<&UserId>,
    comment_owner: &UserId,
    post_owner: &UserId,
) -> bool {
    viewer.is_some_and(|v| can_delete_comment(v, comment_owner, post_owner))
}

/// Rejected before any lookup, so it fails the same way whether or not the
/// target exists.
pub fn authorize_follow(follower: &UserId, target: &UserId) -> SocialResult<()> {
    if follower == target {
        return Err(SocialError::validation("user_id", "Cannot follow yourself"));
    }
    Ok(())
}
