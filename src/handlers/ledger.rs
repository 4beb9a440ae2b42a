use crate::error::AppError;
use crate::handlers::{bearer_token, blocking};
use crate::models::ledger::*;
use crate::services::{ledger as service, players};
use crate::state::AppState;
use crate::validation;
use chrono::Utc;
use ntex::web::{self, HttpRequest, HttpResponse};
use std::sync::Arc;

pub async fn update_score(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    path: web::types::Path<String>,
    body: web::types::Json<ScoreSubmission>,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(&req)?;
    let target = path.into_inner();
    let submission = body.into_inner();
    let state = Arc::clone(&*state);

    let receipt = blocking(move || {
        let now = Utc::now();
        let player_id = players::resolve_session(&state.db, &token, now)?;
        validation::validate_owner(&player_id, &target)?;
        let policy = &state.config.policy;
        let score = validation::parse_score(&submission.score, policy.max_game_score)?;
        Ok(service::submit_score(&state.db, policy, &player_id, score, now)?)
    })
    .await?;

    Ok(HttpResponse::Ok().json(&receipt))
}
