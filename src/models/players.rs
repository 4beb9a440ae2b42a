use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub external_id: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug)]
pub struct Session {
    pub player_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub player: PlayerSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerProfile {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub photo: Option<String>,
    pub total_score: i64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub photo: Option<String>,
    pub total_score: i64,
    pub games_this_week: usize,
    pub games_left: usize,
    pub weekly_points: i64,
    pub week_starts_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: String,
    pub score: i64,
    pub played_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct GamesQuery {
    pub limit: Option<i64>,
}
