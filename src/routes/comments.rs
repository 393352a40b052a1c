use axum::extract::State;
use axum::routing::delete;
use axum::Router;

use crate::db::models::CommentId;
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiPath, CurrentUser};
use crate::routes::ApiResponse;
use crate::social::content;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/comments/{id}", delete(delete_comment))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(comment_id): ApiPath<CommentId>,
) -> AppResult<ApiResponse<()>> {
    let conn = state.db.get()?;
    if !content::delete_comment(&conn, &comment_id, &user.id)? {
        return Err(AppError::NotFound("Comment not found".into()));
    }
    Ok(ApiResponse::outcome(true, "Comment deleted successfully"))
}
