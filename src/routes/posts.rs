use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{Language, PostId, UserId};
use crate::error::AppResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser, MaybeUser};
use crate::media::{self, ImageKind};
use crate::routes::media::read_file_field;
use crate::routes::ApiResponse;
use crate::social::feed::{self, FeedPage};
use crate::social::views::{CommentPage, CommentView, PostView};
use crate::social::{content, engagement, validation, PageParams, PageRequest};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_feed).post(create_post))
        .route("/api/posts/upload-image", post(upload_image))
        .route("/api/posts/user/{user_id}", get(user_posts))
        .route("/api/posts/{id}", get(get_post).delete(delete_post))
        .route("/api/posts/{id}/like", post(like).delete(unlike))
        .route(
            "/api/posts/{id}/comments",
            get(list_comments).post(create_comment),
        )
}

#[derive(Debug, Deserialize)]
struct FeedParams {
    page: Option<u32>,
    limit: Option<u32>,
    #[serde(default)]
    following_only: bool,
}

#[derive(Debug, Deserialize)]
struct NewPost {
    content: String,
    language: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct PostCreated {
    post_id: PostId,
    content: String,
    language: Language,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct NewComment {
    content: String,
}

#[derive(Debug, Serialize)]
struct ImageUploaded {
    image_url: String,
}

async fn list_feed(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiQuery(params): ApiQuery<FeedParams>,
) -> AppResult<ApiResponse<FeedPage>> {
    let page = PageRequest::try_from(PageParams {
        page: params.page,
        limit: params.limit,
    })?;
    let conn = state.db.get()?;
    let feed = feed::get_feed(&conn, viewer.id(), page, params.following_only)?;
    Ok(ApiResponse::data(feed))
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<NewPost>,
) -> AppResult<impl IntoResponse> {
    let language = validation::language(body.language.as_deref())?;
    let conn = state.db.get()?;
    let post = content::create_post(&conn, &user.id, &body.content, language, body.image_url)?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(
            "Post created successfully",
            PostCreated {
                post_id: post.id,
                content: post.content,
                language: post.language,
                created_at: post.created_at,
            },
        ),
    ))
}

async fn upload_image(
    State(state): State<AppState>,
    _user: CurrentUser,
    multipart: Multipart,
) -> AppResult<ApiResponse<ImageUploaded>> {
    let (bytes, content_type) = read_file_field(multipart).await?;
    let image_url = media::upload_image(
        state.media.as_ref(),
        &state.config.media,
        ImageKind::Post,
        bytes,
        &content_type,
    )
    .await?;
    Ok(ApiResponse::with_message(
        "Image uploaded successfully",
        ImageUploaded { image_url },
    ))
}

async fn get_post(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(post_id): ApiPath<PostId>,
) -> AppResult<ApiResponse<PostView>> {
    let conn = state.db.get()?;
    Ok(ApiResponse::data(feed::get_post_by_id(
        &conn,
        &post_id,
        viewer.id(),
    )?))
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(post_id): ApiPath<PostId>,
) -> AppResult<ApiResponse<()>> {
    let conn = state.db.get()?;
    content::delete_post(&conn, &post_id, &user.id)?;
    Ok(ApiResponse::outcome(true, "Post deleted successfully"))
}

async fn like(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(post_id): ApiPath<PostId>,
) -> AppResult<ApiResponse<()>> {
    let conn = state.db.get()?;
    Ok(if engagement::like_post(&conn, &post_id, &user.id)? {
        ApiResponse::outcome(true, "Post liked successfully")
    } else {
        ApiResponse::outcome(false, "Post already liked")
    })
}

async fn unlike(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(post_id): ApiPath<PostId>,
) -> AppResult<ApiResponse<()>> {
    let conn = state.db.get()?;
    Ok(if engagement::unlike_post(&conn, &post_id, &user.id)? {
        ApiResponse::outcome(true, "Post unliked successfully")
    } else {
        ApiResponse::outcome(false, "Post was not liked")
    })
}

async fn user_posts(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(owner): ApiPath<UserId>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> AppResult<ApiResponse<FeedPage>> {
    let page = PageRequest::try_from(params)?;
    let conn = state.db.get()?;
    let posts = feed::get_user_posts(&conn, &owner, page, viewer.id())?;
    Ok(ApiResponse::data(posts))
}

async fn list_comments(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(post_id): ApiPath<PostId>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> AppResult<ApiResponse<CommentPage>> {
    let page = PageRequest::try_from(params)?;
    let conn = state.db.get()?;
    let comments = feed::get_comments(&conn, &post_id, page, viewer.id())?;
    Ok(ApiResponse::data(comments))
}

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(post_id): ApiPath<PostId>,
    ApiJson(body): ApiJson<NewComment>,
) -> AppResult<impl IntoResponse> {
    let conn = state.db.get()?;
    let comment = content::create_comment(&conn, &post_id, &user.id, &body.content)?;
    let view: CommentView = feed::get_comment(&conn, &comment.id, Some(&user.id))?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Comment created successfully", view),
    ))
}
