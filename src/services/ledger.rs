//! Weekly quota accounting for score submissions.
//!
//! A player may bank at most `max_games_per_week` games and, when the cap is
//! enabled, `max_weekly_points` points per week. Weeks start on Sunday at
//! 00:00:00 in the configured offset. Every submission prunes history older
//! than the current week before the quota is checked, and that pruning is
//! persisted even when the submission itself is rejected.
//!
//! Writes go through [`PlayerStore::swap_scores`], a compare-and-swap on the
//! player's version. A lost race re-runs the whole evaluation on a fresh
//! snapshot, so two concurrent submissions can never both spend the last
//! game of the week.

use crate::models::ledger::*;
use crate::store::PlayerStore;
use chrono::{DateTime, Datelike, Duration, FixedOffset, Offset, Timelike, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct QuotaPolicy {
    pub max_game_score: i64,
    pub max_games_per_week: usize,
    /// `None` disables the weekly point cap.
    pub max_weekly_points: Option<i64>,
    pub week_offset: FixedOffset,
    pub commit_attempts: u32,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        QuotaPolicy {
            max_game_score: 30_000,
            max_games_per_week: 7,
            max_weekly_points: Some(210_000),
            week_offset: Utc.fix(),
            commit_attempts: 3,
        }
    }
}

impl QuotaPolicy {
    pub fn games_left(&self, games_this_week: usize) -> usize {
        self.max_games_per_week.saturating_sub(games_this_week)
    }

    pub fn week_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        start_of_week(now, self.week_offset)
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Score must be a whole number between 1 and {max}")]
    InvalidScore { max: i64 },
    #[error("Player {0} not found")]
    PlayerNotFound(String),
    #[error("Weekly game limit reached")]
    WeeklyGameLimitReached { games_left: usize },
    #[error("Weekly point cap of {cap} exceeded")]
    WeeklyPointCapExceeded { cap: i64, games_left: usize },
    #[error("Score update conflicted {attempts} times, try again")]
    TransientConflict { attempts: u32 },
    #[error("Storage error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl LedgerError {
    pub fn games_left(&self) -> Option<usize> {
        match self {
            LedgerError::WeeklyGameLimitReached { games_left }
            | LedgerError::WeeklyPointCapExceeded { games_left, .. } => Some(*games_left),
            _ => None,
        }
    }
}

/// Start of the week containing `now`: the most recent Sunday at 00:00:00
/// local time in `offset`, as a UTC instant.
pub fn start_of_week(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local = now.with_timezone(&offset);
    let days_since_sunday = i64::from(local.weekday().num_days_from_sunday());
    // nanosecond() exceeds 1e9 only inside a leap second
    let since_midnight = Duration::seconds(i64::from(local.num_seconds_from_midnight()))
        + Duration::nanoseconds(i64::from(local.nanosecond() % 1_000_000_000));
    now - since_midnight - Duration::days(days_since_sunday)
}

/// Entries that fall inside the week starting at `week_start`.
pub fn windowed(
    scores: &[WeeklyScore],
    week_start: DateTime<Utc>,
) -> impl Iterator<Item = &WeeklyScore> + '_ {
    scores.iter().filter(move |s| s.date >= week_start)
}

pub fn prune(mut scores: Vec<WeeklyScore>, week_start: DateTime<Utc>) -> Vec<WeeklyScore> {
    scores.retain(|s| s.date >= week_start);
    scores
}

fn check_quota(policy: &QuotaPolicy, weekly: &[WeeklyScore], score: i64) -> Result<(), LedgerError> {
    let games = weekly.len();
    if games >= policy.max_games_per_week {
        return Err(LedgerError::WeeklyGameLimitReached {
            games_left: policy.games_left(games),
        });
    }
    if let Some(cap) = policy.max_weekly_points {
        let points: i64 = weekly.iter().map(|s| s.score).sum();
        if points + score > cap {
            return Err(LedgerError::WeeklyPointCapExceeded {
                cap,
                games_left: policy.games_left(games),
            });
        }
    }
    Ok(())
}

pub fn submit_score<S: PlayerStore + ?Sized>(
    store: &S,
    policy: &QuotaPolicy,
    player_id: &str,
    score: i64,
    now: DateTime<Utc>,
) -> Result<ScoreReceipt, LedgerError> {
    if score <= 0 || score > policy.max_game_score {
        return Err(LedgerError::InvalidScore {
            max: policy.max_game_score,
        });
    }

    let week_start = policy.week_start(now);
    let attempts = policy.commit_attempts.max(1);

    for attempt in 1..=attempts {
        let record = store
            .fetch_player(player_id)?
            .ok_or_else(|| LedgerError::PlayerNotFound(player_id.to_string()))?;
        let stored = record.weekly_scores.len();
        let mut weekly = prune(record.weekly_scores, week_start);
        let pruned = stored - weekly.len();

        if let Err(rejection) = check_quota(policy, &weekly, score) {
            // Nothing to persist unless the window moved.
            let persisted = pruned == 0
                || store.swap_scores(
                    player_id,
                    record.version,
                    &ScoreUpdate {
                        total_score: record.total_score,
                        weekly_scores: weekly,
                        accepted: None,
                    },
                )?;
            if persisted {
                debug!(player_id, score, pruned, reason = %rejection, "score rejected");
                return Err(rejection);
            }
            debug!(player_id, attempt, "pruning raced another update, retrying");
            continue;
        }

        let entry = WeeklyScore { score, date: now };
        weekly.push(entry);
        let receipt = ScoreReceipt {
            total_score: record.total_score + score,
            games_this_week: weekly.len(),
            games_left: policy.games_left(weekly.len()),
        };
        let update = ScoreUpdate {
            total_score: receipt.total_score,
            weekly_scores: weekly,
            accepted: Some(entry),
        };

        if store.swap_scores(player_id, record.version, &update)? {
            info!(
                player_id,
                score,
                total_score = receipt.total_score,
                games_left = receipt.games_left,
                "score accepted"
            );
            return Ok(receipt);
        }
        debug!(player_id, attempt, "score commit raced another update, retrying");
    }

    warn!(player_id, attempts, "giving up on contended score update");
    Err(LedgerError::TransientConflict { attempts })
}
