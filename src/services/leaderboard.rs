use crate::db::Db;
use crate::error::AppError;
use crate::models::leaderboard::*;
use crate::services::ledger::QuotaPolicy;
use chrono::{DateTime, Utc};
use rusqlite::params;

/// Players by total score, highest first, ties broken by id. `limit` of
/// `None` returns everyone.
pub fn get_leaderboard(
    db: &Db,
    policy: &QuotaPolicy,
    limit: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Vec<LeaderboardEntry>, AppError> {
    let week_start = policy.week_start(now).timestamp_millis();
    // SQLite treats a negative LIMIT as no limit
    let limit = limit.unwrap_or(-1);

    Ok(db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT p.id, p.username, p.display_name, p.photo, p.total_score,
                    (SELECT COUNT(*) FROM weekly_scores w
                     WHERE w.player_id = p.id AND w.scored_at >= ?1)
             FROM players p
             ORDER BY p.total_score DESC, p.id ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![week_start, limit], |row| {
            let games_this_week = row.get::<_, i64>(5)?.max(0) as usize;
            Ok(LeaderboardEntry {
                rank: 0,
                id: row.get(0)?,
                username: row.get(1)?,
                display_name: row.get(2)?,
                photo: row.get(3)?,
                total_score: row.get(4)?,
                games_this_week,
                games_left: policy.games_left(games_this_week),
            })
        })?;

        let mut entries = Vec::new();
        for (position, row) in rows.enumerate() {
            let mut entry = row?;
            entry.rank = position as i64 + 1;
            entries.push(entry);
        }
        Ok(entries)
    })?)
}
