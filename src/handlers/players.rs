use crate::error::AppError;
use crate::handlers::{bearer_token, blocking};
use crate::models::players::*;
use crate::services::players as service;
use crate::state::AppState;
use crate::validation;
use chrono::Utc;
use ntex::web::{self, HttpRequest, HttpResponse};
use std::sync::Arc;

const GATEWAY_KEY_HEADER: &str = "X-Gateway-Key";

pub async fn login(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    body: web::types::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    if let Some(expected) = &state.config.gateway_key {
        let presented = req
            .headers()
            .get(GATEWAY_KEY_HEADER)
            .and_then(|value| value.to_str().ok());
        if !validation::gateway_key_matches(presented, expected) {
            return Err(AppError::Unauthorized("Unknown identity gateway".into()));
        }
    }

    let login = body.into_inner();
    let state = Arc::clone(&*state);
    let result = blocking(move || {
        let now = Utc::now();
        let session = service::login(&state.db, login, state.config.session_ttl, now)?;
        let player =
            service::get_player_summary(&state.db, &state.config.policy, &session.player_id, now)?;
        Ok(LoginResult {
            token: session.token,
            expires_at: session.expires_at,
            player,
        })
    })
    .await?;

    Ok(HttpResponse::Ok().json(&result))
}

pub async fn logout(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(&req)?;
    let state = Arc::clone(&*state);
    blocking(move || service::logout(&state.db, &token)).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn get_me(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(&req)?;
    let state = Arc::clone(&*state);
    let summary = blocking(move || {
        let now = Utc::now();
        let player_id = service::resolve_session(&state.db, &token, now)?;
        service::get_player_summary(&state.db, &state.config.policy, &player_id, now)
    })
    .await?;
    Ok(HttpResponse::Ok().json(&summary))
}

pub async fn get_my_games(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    query: web::types::Query<GamesQuery>,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(&req)?;
    let limit = query.limit;
    let state = Arc::clone(&*state);
    let games = blocking(move || {
        let player_id = service::resolve_session(&state.db, &token, Utc::now())?;
        service::recent_games(&state.db, &player_id, limit)
    })
    .await?;
    Ok(HttpResponse::Ok().json(&games))
}
