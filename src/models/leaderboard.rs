use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub photo: Option<String>,
    pub total_score: i64,
    pub games_this_week: usize,
    pub games_left: usize,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    /// A positive count or `all`.
    pub limit: Option<String>,
}
