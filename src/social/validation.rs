//! Input rules shared by the social operations. Every function trims where
//! the stored value is trimmed and counts characters, not bytes.

use chrono::{Datelike, NaiveDate};

use super::{SocialError, SocialResult};
use crate::db::models::Language;

pub const POST_MAX_CHARS: usize = 500;
pub const COMMENT_MAX_CHARS: usize = 1000;
pub const BIO_MAX_CHARS: usize = 200;
pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const MINIMUM_AGE_YEARS: i32 = 13;

fn bounded_text(
    field: &'static str,
    raw: &str,
    min: usize,
    max: usize,
    message: &str,
) -> SocialResult<String> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
        return Err(SocialError::validation(field, message));
    }
    Ok(trimmed.to_string())
}

pub fn post_content(raw: &str) -> SocialResult<String> {
    bounded_text(
        "content",
        raw,
        1,
        POST_MAX_CHARS,
        "Content must be 1-500 characters",
    )
}

pub fn comment_content(raw: &str) -> SocialResult<String> {
    bounded_text(
        "content",
        raw,
        1,
        COMMENT_MAX_CHARS,
        "Comment must be 1-1000 characters",
    )
}

/// Missing language means English.
pub fn language(raw: Option<&str>) -> SocialResult<Language> {
    match raw {
        None => Ok(Language::default()),
        Some(s) => s.parse().map_err(|_| {
            let allowed: Vec<&str> = Language::ALL.iter().map(Language::as_str).collect();
            SocialError::validation(
                "language",
                format!("Language must be one of: {}", allowed.join(", ")),
            )
        }),
    }
}

pub fn first_name(raw: &str) -> SocialResult<String> {
    bounded_text(
        "first_name",
        raw,
        NAME_MIN_CHARS,
        NAME_MAX_CHARS,
        "First name must be 2-50 characters",
    )
}

pub fn last_name(raw: &str) -> SocialResult<String> {
    bounded_text(
        "last_name",
        raw,
        NAME_MIN_CHARS,
        NAME_MAX_CHARS,
        "Last name must be 2-50 characters",
    )
}

pub fn bio(raw: Option<&str>) -> SocialResult<String> {
    let bio = raw.unwrap_or_default();
    if bio.chars().count() > BIO_MAX_CHARS {
        return Err(SocialError::validation(
            "bio",
            "Bio must not exceed 200 characters",
        ));
    }
    Ok(bio.to_string())
}

pub fn password(field: &'static str, raw: &str) -> SocialResult<()> {
    if raw.chars().count() < PASSWORD_MIN_CHARS {
        return Err(SocialError::validation(
            field,
            "Password must be at least 8 characters",
        ));
    }
    if !raw.chars().any(char::is_uppercase) {
        return Err(SocialError::validation(
            field,
            "Password must contain at least one uppercase letter",
        ));
    }
    if !raw.chars().any(char::is_lowercase) {
        return Err(SocialError::validation(
            field,
            "Password must contain at least one lowercase letter",
        ));
    }
    if !raw.chars().any(|c| c.is_ascii_digit()) {
        return Err(SocialError::validation(
            field,
            "Password must contain at least one digit",
        ));
    }
    Ok(())
}

/// Normalizes to trimmed lowercase. Only the overall shape is checked:
/// one `@`, a non-empty local part, and a dotted domain.
pub fn email(raw: &str) -> SocialResult<String> {
    let email = raw.trim().to_lowercase();
    let invalid = || SocialError::validation("email", "Invalid email address");

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(email)
}

pub fn date_of_birth(dob: Option<NaiveDate>, today: NaiveDate) -> SocialResult<Option<NaiveDate>> {
    let Some(dob) = dob else {
        return Ok(None);
    };
    // Feb 29 birthdays fall back to Feb 28 in non-leap years
    let cutoff = today
        .with_year(today.year() - MINIMUM_AGE_YEARS)
        .or_else(|| NaiveDate::from_ymd_opt(today.year() - MINIMUM_AGE_YEARS, 2, 28))
        .unwrap_or(today);
    if dob > cutoff {
        return Err(SocialError::validation(
            "date_of_birth",
            "User must be at least 13 years old",
        ));
    }
    Ok(Some(dob))
}

pub fn search_query(raw: &str) -> SocialResult<String> {
    let q = raw.trim();
    if q.is_empty() {
        return Err(SocialError::validation("q", "Search query must not be empty"));
    }
    Ok(q.to_string())
}
