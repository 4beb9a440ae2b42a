use crate::db::Db;
use crate::models::ledger::{PlayerRecord, ScoreUpdate, WeeklyScore};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// Player records as the ledger sees them.
pub trait PlayerStore {
    fn fetch_player(&self, id: &str) -> Result<Option<PlayerRecord>, rusqlite::Error>;

    /// Replaces the player's score state if its version still equals
    /// `expected_version`, bumping the version. Returns `false` when another
    /// write got there first; nothing is changed in that case.
    fn swap_scores(
        &self,
        id: &str,
        expected_version: i64,
        update: &ScoreUpdate,
    ) -> Result<bool, rusqlite::Error>;
}

pub(crate) fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(0, ms))
}

pub(crate) fn load_weekly_scores(
    conn: &Connection,
    player_id: &str,
) -> Result<Vec<WeeklyScore>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT score, scored_at FROM weekly_scores
         WHERE player_id = ?1 ORDER BY scored_at, rowid",
    )?;
    let rows = stmt.query_map(params![player_id], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut scores = Vec::new();
    for row in rows {
        let (score, scored_at) = row?;
        scores.push(WeeklyScore {
            score,
            date: millis_to_utc(scored_at)?,
        });
    }
    Ok(scores)
}

impl PlayerStore for Db {
    fn fetch_player(&self, id: &str) -> Result<Option<PlayerRecord>, rusqlite::Error> {
        self.with_conn(|conn| {
            let head = conn
                .query_row(
                    "SELECT total_score, version FROM players WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()?;

            let Some((total_score, version)) = head else {
                return Ok(None);
            };
            Ok(Some(PlayerRecord {
                total_score,
                weekly_scores: load_weekly_scores(conn, id)?,
                version,
            }))
        })
    }

    fn swap_scores(
        &self,
        id: &str,
        expected_version: i64,
        update: &ScoreUpdate,
    ) -> Result<bool, rusqlite::Error> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE players SET total_score = ?1, version = version + 1
                 WHERE id = ?2 AND version = ?3",
                params![update.total_score, id, expected_version],
            )?;
            if changed == 0 {
                return Ok(false);
            }

            tx.execute("DELETE FROM weekly_scores WHERE player_id = ?1", params![id])?;
            let mut insert = tx.prepare(
                "INSERT INTO weekly_scores (player_id, score, scored_at) VALUES (?1, ?2, ?3)",
            )?;
            for entry in &update.weekly_scores {
                insert.execute(params![id, entry.score, entry.date.timestamp_millis()])?;
            }

            if let Some(game) = &update.accepted {
                tx.execute(
                    "INSERT INTO games (id, player_id, score, played_at) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        Uuid::new_v4().to_string(),
                        id,
                        game.score,
                        game.date.timestamp_millis()
                    ],
                )?;
            }
            Ok(true)
        })
    }
}
