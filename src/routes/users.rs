use axum::extract::{Multipart, State};
use axum::routing::{get, post, put};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::db::models::{User, UserId};
use crate::error::AppResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser, MaybeUser};
use crate::media::{self, ImageKind};
use crate::routes::media::read_file_field;
use crate::routes::ApiResponse;
use crate::social::identity::{self, ProfileUpdate};
use crate::social::views::{Page, UserProfileView, UserSummary};
use crate::social::{graph, PageParams, PageRequest};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users/profile", get(own_profile).put(update_profile))
        .route("/api/users/password", put(update_password))
        .route("/api/users/upload-avatar", post(upload_avatar))
        .route("/api/users/search", get(search))
        .route("/api/users/{id}", get(profile))
        .route("/api/users/{id}/follow", post(follow).delete(unfollow))
}

#[derive(Debug, Deserialize)]
struct PasswordChange {
    current_password: String,
    new_password: String,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct AvatarUploaded {
    profile_picture: String,
}

async fn own_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<ApiResponse<UserProfileView>> {
    let conn = state.db.get()?;
    let profile = identity::get_profile(&conn, &user.id, Some(&user.id))?;
    Ok(ApiResponse::data(profile))
}

async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<ProfileUpdate>,
) -> AppResult<ApiResponse<User>> {
    let conn = state.db.get()?;
    let updated = identity::update_profile(&conn, &user.id, body)?;
    Ok(ApiResponse::with_message("Profile updated successfully", updated))
}

async fn update_password(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<PasswordChange>,
) -> AppResult<ApiResponse<()>> {
    let conn = state.db.get()?;
    identity::update_password(
        &conn,
        &user.id,
        &body.current_password,
        &body.new_password,
        state.config.auth.bcrypt_cost,
    )?;
    Ok(ApiResponse::outcome(true, "Password updated successfully"))
}

async fn upload_avatar(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<ApiResponse<AvatarUploaded>> {
    let (bytes, content_type) = read_file_field(multipart).await?;
    let url = media::upload_image(
        state.media.as_ref(),
        &state.config.media,
        ImageKind::Avatar,
        bytes,
        &content_type,
    )
    .await?;

    let conn = state.db.get()?;
    let updated = identity::set_profile_picture(&conn, &user.id, &url)?;
    Ok(ApiResponse::with_message(
        "Profile picture uploaded successfully",
        AvatarUploaded {
            profile_picture: updated.profile_picture.unwrap_or(url),
        },
    ))
}

async fn search(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> AppResult<ApiResponse<Page<UserSummary>>> {
    let page = PageRequest::try_from(PageParams {
        page: params.page,
        limit: params.limit,
    })?;
    let conn = state.db.get()?;
    let results = identity::search_users(&conn, &params.q, page, viewer.id())?;
    Ok(ApiResponse::data(results))
}

async fn profile(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(user_id): ApiPath<UserId>,
) -> AppResult<ApiResponse<UserProfileView>> {
    let conn = state.db.get()?;
    let profile = identity::get_profile(&conn, &user_id, viewer.id())?;
    Ok(ApiResponse::data(profile))
}

async fn follow(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(target): ApiPath<UserId>,
) -> AppResult<ApiResponse<()>> {
    let conn = state.db.get()?;
    Ok(if graph::follow_user(&conn, &user.id, &target)? {
        ApiResponse::outcome(true, "Successfully followed user")
    } else {
        ApiResponse::outcome(false, "Already following this user")
    })
}

async fn unfollow(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(target): ApiPath<UserId>,
) -> AppResult<ApiResponse<()>> {
    let conn = state.db.get()?;
    Ok(if graph::unfollow_user(&conn, &user.id, &target)? {
        ApiResponse::outcome(true, "Successfully unfollowed user")
    } else {
        ApiResponse::outcome(false, "Not following this user")
    })
}
