use crate::error::AppError;
use ntex::http::header::AUTHORIZATION;
use ntex::web::HttpRequest;

pub mod leaderboard;
pub mod ledger;
pub mod players;

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(req: &HttpRequest) -> Result<String, AppError> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".into()))
}

/// SQLite calls block, so they run off the ntex worker threads.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
}
