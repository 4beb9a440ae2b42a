use crate::error::AppError;
use crate::handlers::blocking;
use crate::models::leaderboard::*;
use crate::services::leaderboard as service;
use crate::state::AppState;
use crate::validation;
use chrono::Utc;
use ntex::web::{self, HttpResponse};
use std::sync::Arc;

pub async fn get_leaderboard(
    state: web::types::State<Arc<AppState>>,
    query: web::types::Query<LeaderboardQuery>,
) -> Result<HttpResponse, AppError> {
    let limit = validation::parse_leaderboard_limit(query.limit.as_deref())?;
    let state = Arc::clone(&*state);
    let entries = blocking(move || {
        service::get_leaderboard(&state.db, &state.config.policy, limit, Utc::now())
    })
    .await?;
    Ok(HttpResponse::Ok().json(&entries))
}
