use crate::services::ledger::LedgerError;
use ntex::http::StatusCode;
use ntex::web::{HttpResponse, WebResponseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Db(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Ledger(e) => match e {
                LedgerError::InvalidScore { .. } => StatusCode::BAD_REQUEST,
                LedgerError::PlayerNotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::WeeklyGameLimitReached { .. }
                | LedgerError::WeeklyPointCapExceeded { .. } => StatusCode::FORBIDDEN,
                LedgerError::TransientConflict { .. } => StatusCode::CONFLICT,
                LedgerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl AppError {
    fn body(&self) -> serde_json::Value {
        let message = match self {
            AppError::Db(_) | AppError::Ledger(LedgerError::Store(_)) => "Database error".to_string(),
            AppError::Internal(_) => "Internal error".to_string(),
            AppError::NotFound(_) => "Not found".to_string(),
            AppError::BadRequest(msg) | AppError::Unauthorized(msg) | AppError::Forbidden(msg) => {
                msg.clone()
            }
            AppError::Ledger(e) => e.to_string(),
        };

        let mut body = serde_json::json!({ "error": message });
        if let AppError::Ledger(e) = self {
            if let Some(games_left) = e.games_left() {
                body["gamesLeft"] = games_left.into();
            }
        }
        body
    }
}

impl WebResponseError for AppError {
    fn error_response(&self, _: &ntex::web::HttpRequest) -> HttpResponse {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        HttpResponse::build(status).json(&self.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn db_error() -> rusqlite::Error {
        rusqlite::Error::QueryReturnedNoRows
    }

    #[test]
    fn test_ledger_error_statuses() {
        let cases = [
            (LedgerError::InvalidScore { max: 30_000 }, StatusCode::BAD_REQUEST),
            (LedgerError::PlayerNotFound("p-1".into()), StatusCode::NOT_FOUND),
            (LedgerError::WeeklyGameLimitReached { games_left: 0 }, StatusCode::FORBIDDEN),
            (
                LedgerError::WeeklyPointCapExceeded { cap: 210_000, games_left: 2 },
                StatusCode::FORBIDDEN,
            ),
            (LedgerError::TransientConflict { attempts: 3 }, StatusCode::CONFLICT),
            (LedgerError::Store(db_error()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            let name = format!("{err:?}");
            assert_eq!(AppError::from(err).status(), status, "{name}");
        }
    }

    #[test]
    fn test_app_error_statuses() {
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Db(db_error()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_quota_rejections_report_games_left() {
        let limit = AppError::from(LedgerError::WeeklyGameLimitReached { games_left: 0 });
        assert_eq!(
            limit.body(),
            json!({ "error": "Weekly game limit reached", "gamesLeft": 0 })
        );

        let cap = AppError::from(LedgerError::WeeklyPointCapExceeded { cap: 210_000, games_left: 2 });
        assert_eq!(
            cap.body(),
            json!({ "error": "Weekly point cap of 210000 exceeded", "gamesLeft": 2 })
        );

        let invalid = AppError::from(LedgerError::InvalidScore { max: 30_000 });
        assert!(invalid.body().get("gamesLeft").is_none());
    }

    #[test]
    fn test_storage_failures_are_masked() {
        assert_eq!(AppError::Db(db_error()).body(), json!({ "error": "Database error" }));
        assert_eq!(
            AppError::from(LedgerError::Store(db_error())).body(),
            json!({ "error": "Database error" })
        );
        assert_eq!(
            AppError::Internal("join failed".into()).body(),
            json!({ "error": "Internal error" })
        );
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        assert_eq!(
            AppError::Forbidden("Forbidden".into()).body(),
            json!({ "error": "Forbidden" })
        );
        assert_eq!(
            AppError::Unauthorized("Session expired".into()).body(),
            json!({ "error": "Session expired" })
        );
    }
}
