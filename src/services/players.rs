use crate::db::Db;
use crate::error::AppError;
use crate::models::players::*;
use crate::services::ledger::{self, QuotaPolicy};
use crate::store::{load_weekly_scores, millis_to_utc};
use crate::validation;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_token(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}

/// Creates the player on first sight of `external_id`, refreshes its profile
/// otherwise, and opens a session for it.
pub fn login(
    db: &Db,
    req: LoginRequest,
    session_ttl: Duration,
    now: DateTime<Utc>,
) -> Result<Session, AppError> {
    let external_id = validation::validate_external_id(&req.external_id)?;
    let username = validation::clean_name(req.username.as_deref());
    let requested_display = validation::clean_name(req.display_name.as_deref());
    let photo = validation::validate_photo(req.photo.as_deref())?;

    let token = generate_token();
    let expires_at = now
        .checked_add_signed(session_ttl)
        .ok_or_else(|| AppError::Internal("Session expiry out of range".into()))?;
    let now_ms = now.timestamp_millis();

    let (player_id, created) = db.with_tx(|tx| {
        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM players WHERE external_id = ?1",
                params![external_id],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing {
            // Fields left out of the request keep their stored values.
            Some(id) => {
                tx.execute(
                    "UPDATE players SET username = COALESCE(NULLIF(?1, ''), username),
                     display_name = COALESCE(NULLIF(?2, ''), display_name),
                     photo = COALESCE(?3, photo) WHERE id = ?4",
                    params![username, requested_display, photo, id],
                )?;
                (id, false)
            }
            None => {
                let id = Uuid::new_v4().to_string();
                let display_name = validation::display_name(Some(requested_display.as_str()), &username);
                tx.execute(
                    "INSERT INTO players (id, external_id, username, display_name, photo)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![id, external_id, username, display_name, photo],
                )?;
                (id, true)
            }
        };

        tx.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now_ms])?;
        tx.execute(
            "INSERT INTO sessions (token_hash, player_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                hash_token(&token),
                outcome.0,
                now_ms,
                expires_at.timestamp_millis()
            ],
        )?;
        Ok(outcome)
    })?;

    info!(player_id = %player_id, created, "session opened");
    Ok(Session {
        player_id,
        token,
        expires_at,
    })
}

/// Resolves a bearer token to the player it was issued for.
pub fn resolve_session(db: &Db, token: &str, now: DateTime<Utc>) -> Result<String, AppError> {
    let session = db.with_conn(|conn| {
        conn.query_row(
            "SELECT player_id, expires_at FROM sessions WHERE token_hash = ?1",
            params![hash_token(token)],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()
    })?;

    match session {
        Some((player_id, expires_at)) if expires_at > now.timestamp_millis() => Ok(player_id),
        Some(_) => Err(AppError::Unauthorized("Session expired".into())),
        None => Err(AppError::Unauthorized("Invalid token".into())),
    }
}

pub fn logout(db: &Db, token: &str) -> Result<(), AppError> {
    db.with_conn(|conn| {
        conn.execute(
            "DELETE FROM sessions WHERE token_hash = ?1",
            params![hash_token(token)],
        )
    })?;
    Ok(())
}

fn fetch_profile(conn: &Connection, player_id: &str) -> Result<Option<PlayerProfile>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, username, display_name, photo, total_score FROM players WHERE id = ?1",
        params![player_id],
        |row| {
            Ok(PlayerProfile {
                id: row.get(0)?,
                username: row.get(1)?,
                display_name: row.get(2)?,
                photo: row.get(3)?,
                total_score: row.get(4)?,
            })
        },
    )
    .optional()
}

/// Display fields plus this week's quota usage. Stored history is left
/// untouched; entries from earlier weeks are only filtered out.
pub fn get_player_summary(
    db: &Db,
    policy: &QuotaPolicy,
    player_id: &str,
    now: DateTime<Utc>,
) -> Result<PlayerSummary, AppError> {
    let week_start = policy.week_start(now);

    let (profile, weekly) = db.with_conn(|conn| {
        let Some(profile) = fetch_profile(conn, player_id)? else {
            return Ok(None);
        };
        Ok(Some((profile, load_weekly_scores(conn, player_id)?)))
    })?
    .ok_or_else(|| AppError::NotFound("Player not found".into()))?;

    let (games_this_week, weekly_points) = ledger::windowed(&weekly, week_start)
        .fold((0usize, 0i64), |(games, points), s| (games + 1, points + s.score));

    Ok(PlayerSummary {
        id: profile.id,
        username: profile.username,
        display_name: profile.display_name,
        photo: profile.photo,
        total_score: profile.total_score,
        games_this_week,
        games_left: policy.games_left(games_this_week),
        weekly_points,
        week_starts_at: week_start,
    })
}

/// Accepted games, newest first. Unlike the weekly window this history is
/// never pruned.
pub fn recent_games(db: &Db, player_id: &str, limit: Option<i64>) -> Result<Vec<GameRecord>, AppError> {
    let limit = validation::history_limit(limit);

    Ok(db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, score, played_at FROM games
             WHERE player_id = ?1 ORDER BY played_at DESC, rowid DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![player_id, limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut games = Vec::new();
        for row in rows {
            let (id, score, played_at) = row?;
            games.push(GameRecord {
                id,
                score,
                played_at: millis_to_utc(played_at)?,
            });
        }
        Ok(games)
    })?)
}
