use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One accepted game inside the rolling weekly window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyScore {
    pub score: i64,
    pub date: DateTime<Utc>,
}

/// The slice of a player account the ledger reads and writes.
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub total_score: i64,
    pub weekly_scores: Vec<WeeklyScore>,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct ScoreUpdate {
    pub total_score: i64,
    pub weekly_scores: Vec<WeeklyScore>,
    /// Set when the update commits a new game; appended to the game history.
    pub accepted: Option<WeeklyScore>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreSubmission {
    // Untyped: a missing or non-numeric score is an invalid score, not a
    // malformed body.
    #[serde(default)]
    pub score: serde_json::Value,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReceipt {
    pub total_score: i64,
    pub games_this_week: usize,
    pub games_left: usize,
}
