//! Identity store: accounts, credentials, profiles and user search.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;

use super::views::{Page, UserProfileView, UserSummary};
use super::{validation, PageRequest, SocialError, SocialResult};
use crate::auth::password;
use crate::db;
use crate::db::models::{User, UserId};

/// Author-card columns, read by [`summary_from_row`]. Expects `users` aliased as `u`.
pub(crate) const SUMMARY_COLUMNS: &str =
    "u.id, u.first_name, u.last_name, u.profile_picture, u.bio, u.place, u.state";

/// Reads the seven [`SUMMARY_COLUMNS`] starting at `start`.
pub(crate) fn summary_from_row(
    row: &Row<'_>,
    start: usize,
    is_following: bool,
) -> rusqlite::Result<UserSummary> {
    Ok(UserSummary {
        id: row.get(start)?,
        first_name: row.get(start + 1)?,
        last_name: row.get(start + 2)?,
        profile_picture: row.get(start + 3)?,
        bio: row.get(start + 4)?,
        place: row.get(start + 5)?,
        state: row.get(start + 6)?,
        is_following,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub languages: Option<Vec<String>>,
    pub bio: Option<String>,
    pub place: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub email_notifications: Option<bool>,
}

pub fn register(conn: &Connection, reg: Registration, bcrypt_cost: u32) -> SocialResult<User> {
    let email = validation::email(&reg.email)?;
    validation::password("password", &reg.password)?;
    let first_name = validation::first_name(&reg.first_name)?;
    let last_name = validation::last_name(&reg.last_name)?;

    let conflict = || SocialError::Conflict(format!("User with email {email} already exists"));

    if find_by_email(conn, &email)?.is_some() {
        return Err(conflict());
    }

    let password_hash = password::hash_password(&reg.password, bcrypt_cost)?;
    let id = UserId::generate();
    let now = Utc::now();

    let inserted = conn.execute(
        "INSERT INTO users (id, email, password_hash, first_name, last_name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![id, email, password_hash, first_name, last_name, now],
    );
    match inserted {
        Ok(_) => {}
        // Lost a race with a concurrent registration for the same email
        Err(e) if db::is_unique_violation(&e) => return Err(conflict()),
        Err(e) => return Err(e.into()),
    }

    tracing::info!(user_id = %id, "registered user");
    get_user(conn, &id)
}

/// Check credentials. Unknown email and wrong password are indistinguishable.
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> SocialResult<User> {
    let invalid = || SocialError::Unauthorized("Invalid email or password".into());

    let email = email.trim().to_lowercase();
    let user = find_by_email(conn, &email)?.ok_or_else(invalid)?;
    if !password::verify_password(password, &user.password_hash) {
        tracing::debug!(user_id = %user.id, "password mismatch");
        return Err(invalid());
    }
    Ok(user)
}

pub fn find_user(conn: &Connection, user_id: &UserId) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS),
        params![user_id],
        User::from_row,
    )
    .optional()
}

fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE email = ?1", User::COLUMNS),
        params![email],
        User::from_row,
    )
    .optional()
}

pub fn get_user(conn: &Connection, user_id: &UserId) -> SocialResult<User> {
    find_user(conn, user_id)?.ok_or_else(|| SocialError::not_found("User", user_id))
}

pub fn user_exists(conn: &Connection, user_id: &UserId) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
        params![user_id],
        |row| row.get(0),
    )
}

/// Public profile with live counts and the viewer's follow status.
pub fn get_profile(
    conn: &Connection,
    user_id: &UserId,
    viewer: Option<&UserId>,
) -> SocialResult<UserProfileView> {
    let user = get_user(conn, user_id)?;

    let (follower_count, following_count, post_count, is_following): (i64, i64, i64, bool) = conn
        .query_row(
            "SELECT
                (SELECT COUNT(*) FROM follows WHERE following_id = ?1),
                (SELECT COUNT(*) FROM follows WHERE follower_id = ?1),
                (SELECT COUNT(*) FROM posts WHERE user_id = ?1 AND is_deleted = 0),
                CASE WHEN ?2 IS NULL OR ?2 = ?1 THEN 0
                     ELSE EXISTS(SELECT 1 FROM follows WHERE follower_id = ?2 AND following_id = ?1)
                END",
            params![user_id, viewer],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

    Ok(UserProfileView {
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        profile_picture: user.profile_picture,
        bio: user.bio,
        languages: user.languages,
        place: user.place,
        state: user.state,
        follower_count,
        following_count,
        post_count,
        is_following,
        created_at: user.created_at,
    })
}

pub fn update_profile(
    conn: &Connection,
    user_id: &UserId,
    update: ProfileUpdate,
) -> SocialResult<User> {
    let mut user = get_user(conn, user_id)?;

    user.first_name = validation::first_name(&update.first_name)?;
    user.last_name = validation::last_name(&update.last_name)?;
    if let Some(bio) = update.bio.as_deref() {
        user.bio = validation::bio(Some(bio))?;
    }
    if update.date_of_birth.is_some() {
        user.date_of_birth =
            validation::date_of_birth(update.date_of_birth, Utc::now().date_naive())?;
    }
    if let Some(languages) = update.languages {
        let languages: Vec<String> = languages
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        user.languages = if languages.is_empty() {
            vec!["English".to_string()]
        } else {
            languages
        };
    }
    if update.place.is_some() {
        user.place = update.place;
    }
    if update.district.is_some() {
        user.district = update.district;
    }
    if update.state.is_some() {
        user.state = update.state;
    }
    if let Some(enabled) = update.email_notifications {
        user.email_notifications = enabled;
    }

    let languages = serde_json::to_string(&user.languages)
        .map_err(|e| SocialError::validation("languages", e.to_string()))?;

    conn.execute(
        "UPDATE users SET first_name = ?2, last_name = ?3, date_of_birth = ?4, languages = ?5,
                bio = ?6, place = ?7, district = ?8, state = ?9, email_notifications = ?10,
                updated_at = ?11
         WHERE id = ?1",
        params![
            user_id,
            user.first_name,
            user.last_name,
            user.date_of_birth,
            languages,
            user.bio,
            user.place,
            user.district,
            user.state,
            user.email_notifications,
            Utc::now(),
        ],
    )?;

    get_user(conn, user_id)
}

pub fn update_password(
    conn: &Connection,
    user_id: &UserId,
    current_password: &str,
    new_password: &str,
    bcrypt_cost: u32,
) -> SocialResult<()> {
    let user = get_user(conn, user_id)?;
    if !password::verify_password(current_password, &user.password_hash) {
        return Err(SocialError::Unauthorized(
            "Current password is incorrect".into(),
        ));
    }
    validation::password("new_password", new_password)?;

    let hash = password::hash_password(new_password, bcrypt_cost)?;
    conn.execute(
        "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
        params![user_id, hash, Utc::now()],
    )?;
    Ok(())
}

pub fn set_profile_picture(conn: &Connection, user_id: &UserId, url: &str) -> SocialResult<User> {
    let rows = conn.execute(
        "UPDATE users SET profile_picture = ?2, updated_at = ?3 WHERE id = ?1",
        params![user_id, url, Utc::now()],
    )?;
    if rows == 0 {
        return Err(SocialError::not_found("User", user_id));
    }
    get_user(conn, user_id)
}

/// Case-insensitive substring search over names and email.
pub fn search_users(
    conn: &Connection,
    query: &str,
    page: PageRequest,
    viewer: Option<&UserId>,
) -> SocialResult<Page<UserSummary>> {
    let query = validation::search_query(query)?;
    let pattern = format!("%{}%", escape_like(&query));

    let mut stmt = conn.prepare(&format!(
        "SELECT {SUMMARY_COLUMNS},
                CASE WHEN ?2 IS NULL OR u.id = ?2 THEN 0
                     ELSE EXISTS(SELECT 1 FROM follows f WHERE f.follower_id = ?2 AND f.following_id = u.id)
                END
         FROM users u
         WHERE u.first_name LIKE ?1 ESCAPE '\\'
            OR u.last_name LIKE ?1 ESCAPE '\\'
            OR u.email LIKE ?1 ESCAPE '\\'
         ORDER BY u.first_name, u.last_name, u.id
         LIMIT ?3 OFFSET ?4"
    ))?;

    let users = stmt
        .query_map(
            params![pattern, viewer, page.limit(), page.offset()],
            |row| {
                let is_following: bool = row.get(7)?;
                summary_from_row(row, 0, is_following)
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::from_items(users, page.page(), page.limit()))
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
