mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod state;
mod store;
mod validation;

use config::Config;
use db::Db;
use ntex::web;
use ntex_cors::Cors;
use state::AppState;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[ntex::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::load();
    let db = Db::open(&config.database_path).map_err(std::io::Error::other)?;
    let addr = format!("{}:{}", config.host, config.port);
    let origin = config.frontend_url.clone();
    let state = Arc::new(AppState { db, config });

    info!(%addr, "Aztec2048 server starting");

    web::HttpServer::new(move || {
        web::App::new()
            .state(state.clone())
            .wrap(
                Cors::new()
                    .allowed_origin(&origin)
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec!["Content-Type", "Authorization", "X-Gateway-Key"])
                    .max_age(3600)
                    .finish(),
            )
            .route("/api/health", web::get().to(health))
            // Sessions
            .route("/auth/login", web::post().to(handlers::players::login))
            .route("/auth/logout", web::post().to(handlers::players::logout))
            // Player
            .route("/api/me", web::get().to(handlers::players::get_me))
            .route("/api/me/games", web::get().to(handlers::players::get_my_games))
            .route("/api/update-score/{id}", web::post().to(handlers::ledger::update_score))
            // Leaderboard
            .route("/api/leaderboard", web::get().to(handlers::leaderboard::get_leaderboard))
    })
    .bind(addr)?
    .run()
    .await
}

async fn health() -> web::HttpResponse {
    web::HttpResponse::Ok().json(&serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
