use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::auth::session;
use crate::db::models::{User, UserId};
use crate::error::AppResult;
use crate::extractors::{ApiJson, CurrentUser};
use crate::routes::ApiResponse;
use crate::social::identity::{self, Registration};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct Registered {
    user_id: UserId,
    email: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
}

async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Registration>,
) -> AppResult<impl IntoResponse> {
    let conn = state.db.get()?;
    let user = identity::register(&conn, body, state.config.auth.bcrypt_cost)?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(
            "User registered successfully",
            Registered {
                user_id: user.id,
                email: user.email,
            },
        ),
    ))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> AppResult<ApiResponse<TokenResponse>> {
    let conn = state.db.get()?;
    let user = identity::authenticate(&conn, &body.email, &body.password)?;
    let access_token = session::issue_token(&conn, &user.id, state.config.auth.token_hours)?;

    tracing::info!(user_id = %user.id, "login");
    Ok(ApiResponse::with_message(
        "Login successful",
        TokenResponse {
            access_token,
            token_type: "bearer",
        },
    ))
}

async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<ApiResponse<User>> {
    let conn = state.db.get()?;
    Ok(ApiResponse::data(identity::get_user(&conn, &user.id)?))
}

async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<ApiResponse<()>> {
    let conn = state.db.get()?;
    session::revoke_token(&conn, &user.token)?;
    Ok(ApiResponse::outcome(true, "Logged out successfully"))
}
