use crate::error::AppError;
use crate::services::ledger::LedgerError;
use serde_json::Value;
use sha2::{Digest, Sha256};

const MAX_NAME_LEN: usize = 32;
const MAX_EXTERNAL_ID_LEN: usize = 128;
const MAX_PHOTO_URL_LEN: usize = 512;
const DEFAULT_LEADERBOARD_SIZE: i64 = 20;
const DEFAULT_HISTORY_SIZE: i64 = 20;
const MAX_HISTORY_SIZE: i64 = 100;

/// Accepts JSON integers and integral floats such as `500.0`. Anything else,
/// including numeric strings, is an invalid score. Range checks are the
/// ledger's job.
pub fn parse_score(value: &Value, max: i64) -> Result<i64, LedgerError> {
    let invalid = || LedgerError::InvalidScore { max };
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else {
                let f = n.as_f64().ok_or_else(invalid)?;
                if f.fract() == 0.0 && f.abs() <= max as f64 {
                    Ok(f as i64)
                } else {
                    Err(invalid())
                }
            }
        }
        _ => Err(invalid()),
    }
}

pub fn validate_external_id(id: &str) -> Result<String, AppError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(AppError::BadRequest("externalId is required".into()))
    } else if trimmed.len() > MAX_EXTERNAL_ID_LEN {
        Err(AppError::BadRequest("externalId is too long".into()))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn clean_name(name: Option<&str>) -> String {
    name.unwrap_or_default()
        .trim()
        .chars()
        .take(MAX_NAME_LEN)
        .collect()
}

/// Falls back to the username, then to "Anonymous".
pub fn display_name(display_name: Option<&str>, username: &str) -> String {
    let cleaned = clean_name(display_name);
    if !cleaned.is_empty() {
        cleaned
    } else if !username.is_empty() {
        username.to_string()
    } else {
        "Anonymous".to_string()
    }
}

pub fn validate_photo(photo: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(url) = photo.map(str::trim).filter(|u| !u.is_empty()) else {
        return Ok(None);
    };
    if url.len() > MAX_PHOTO_URL_LEN {
        return Err(AppError::BadRequest("Photo URL too long".into()));
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(AppError::BadRequest("Photo must be an http(s) URL".into()));
    }
    Ok(Some(url.to_string()))
}

/// `None` means every player.
pub fn parse_leaderboard_limit(limit: Option<&str>) -> Result<Option<i64>, AppError> {
    let Some(raw) = limit.map(str::trim) else {
        return Ok(Some(DEFAULT_LEADERBOARD_SIZE));
    };
    if raw.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    match raw.parse::<i64>() {
        Ok(n) if n >= 1 => Ok(Some(n)),
        _ => Err(AppError::BadRequest(
            "limit must be a positive number or \"all\"".into(),
        )),
    }
}

/// Digests are compared so timing reveals nothing about the key itself.
pub fn gateway_key_matches(presented: Option<&str>, expected: &str) -> bool {
    presented.is_some_and(|key| Sha256::digest(key.as_bytes()) == Sha256::digest(expected.as_bytes()))
}

/// A session may only submit scores for its own player.
pub fn validate_owner(session_player: &str, target: &str) -> Result<(), AppError> {
    if session_player == target {
        Ok(())
    } else {
        Err(AppError::Forbidden("Forbidden".into()))
    }
}

pub fn history_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_HISTORY_SIZE).clamp(1, MAX_HISTORY_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_score_accepts_whole_numbers() {
        assert_eq!(parse_score(&json!(500), 30_000).unwrap(), 500);
        assert_eq!(parse_score(&json!(500.0), 30_000).unwrap(), 500);
        // range is checked later
        assert_eq!(parse_score(&json!(-3), 30_000).unwrap(), -3);
    }

    #[test]
    fn test_parse_score_rejects_non_integers() {
        for value in [json!(12.5), json!("500"), json!(null), json!([1]), json!(1e300)] {
            assert!(matches!(
                parse_score(&value, 30_000),
                Err(LedgerError::InvalidScore { max: 30_000 })
            ));
        }
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(display_name(Some("  Quetzal  "), "q"), "Quetzal");
        assert_eq!(display_name(Some("   "), "tlaloc"), "tlaloc");
        assert_eq!(display_name(None, ""), "Anonymous");
        assert_eq!(display_name(Some("x".repeat(80).as_str()), "").len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_validate_photo() {
        assert_eq!(validate_photo(None).unwrap(), None);
        assert_eq!(validate_photo(Some("  ")).unwrap(), None);
        assert_eq!(
            validate_photo(Some("https://pbs.twimg.com/a.png")).unwrap().as_deref(),
            Some("https://pbs.twimg.com/a.png")
        );
        assert!(validate_photo(Some("javascript:alert(1)")).is_err());
    }

    #[test]
    fn test_leaderboard_limit() {
        assert_eq!(parse_leaderboard_limit(None).unwrap(), Some(20));
        assert_eq!(parse_leaderboard_limit(Some("5")).unwrap(), Some(5));
        assert_eq!(parse_leaderboard_limit(Some("ALL")).unwrap(), None);
        assert!(parse_leaderboard_limit(Some("0")).is_err());
        assert!(parse_leaderboard_limit(Some("ten")).is_err());
    }

    #[test]
    fn test_gateway_key_matches() {
        assert!(gateway_key_matches(Some("s3cret"), "s3cret"));
        assert!(!gateway_key_matches(Some("s3cre"), "s3cret"));
        assert!(!gateway_key_matches(Some(""), "s3cret"));
        assert!(!gateway_key_matches(None, "s3cret"));
    }

    #[test]
    fn test_validate_owner() {
        assert!(validate_owner("p-1", "p-1").is_ok());
        assert!(matches!(validate_owner("p-1", "p-2"), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_history_limit_is_clamped() {
        assert_eq!(history_limit(None), 20);
        assert_eq!(history_limit(Some(0)), 1);
        assert_eq!(history_limit(Some(5_000)), 100);
    }
}
