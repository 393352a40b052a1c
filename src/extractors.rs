use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;

use crate::auth::{bearer_token, session};
use crate::db::models::UserId;
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller, resolved from a bearer token.
/// Returns 401 if no valid session is found.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub token: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized = || AppError::Unauthorized("Could not validate credentials".into());

        let token = bearer_token(&parts.headers).ok_or_else(unauthorized)?;
        let conn = state.db.get()?;
        let id = session::resolve_viewer(&conn, token)?.ok_or_else(unauthorized)?;

        Ok(CurrentUser {
            id,
            token: token.to_string(),
        })
    }
}

/// Optional viewer: `None` instead of 401 when the token is missing or invalid.
pub struct MaybeUser(pub Option<UserId>);

impl MaybeUser {
    pub fn id(&self) -> Option<&UserId> {
        self.0.as_ref()
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user.id))),
            Err(AppError::Unauthorized(_)) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}

/// `Json` whose rejections use the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejections use the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// `Path` whose rejections use the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
