use crate::services::ledger::QuotaPolicy;
use chrono::{Duration, FixedOffset};
use std::{env, fmt::Display, str::FromStr};
use tracing::{info, warn};

const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub frontend_url: String,
    /// Shared secret the identity front door sends with `/auth/login`.
    pub gateway_key: Option<String>,
    pub session_ttl: Duration,
    pub policy: QuotaPolicy,
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = QuotaPolicy::default();

        let max_weekly_points = match lookup("MAX_WEEKLY_POINTS").as_deref().map(str::trim) {
            None => defaults.max_weekly_points,
            Some("0") | Some("off") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(cap) if cap > 0 => Some(cap),
                _ => {
                    warn!("Invalid MAX_WEEKLY_POINTS value: {raw}");
                    defaults.max_weekly_points
                }
            },
        };

        let offset_minutes: i32 = try_load(&lookup, "WEEK_UTC_OFFSET_MINUTES", 0);
        let week_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                warn!("WEEK_UTC_OFFSET_MINUTES out of range: {offset_minutes}");
                defaults.week_offset
            });

        let policy = QuotaPolicy {
            max_game_score: try_load(&lookup, "MAX_GAME_SCORE", defaults.max_game_score),
            max_games_per_week: try_load(&lookup, "MAX_GAMES_PER_WEEK", defaults.max_games_per_week),
            max_weekly_points,
            week_offset,
            commit_attempts: try_load(&lookup, "SCORE_COMMIT_ATTEMPTS", defaults.commit_attempts),
        };

        Self {
            host: try_load(&lookup, "HOST", "0.0.0.0".to_string()),
            port: try_load(&lookup, "PORT", 5000),
            database_path: try_load(&lookup, "DATABASE_PATH", "aztec2048.db".to_string()),
            frontend_url: try_load(&lookup, "FRONTEND_URL", "*".to_string()),
            gateway_key: lookup("GATEWAY_KEY").filter(|k| !k.is_empty()),
            session_ttl: session_ttl(try_load(&lookup, "SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS)),
            policy,
        }
    }
}

fn session_ttl(hours: i64) -> Duration {
    let ttl = Some(hours).filter(|h| *h >= 1).and_then(Duration::try_hours);
    ttl.unwrap_or_else(|| {
        warn!("SESSION_TTL_HOURS out of range: {hours}, using default: {DEFAULT_SESSION_TTL_HOURS}");
        Duration::hours(DEFAULT_SESSION_TTL_HOURS)
    })
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };
    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 5000);
        assert_eq!(config.frontend_url, "*");
        assert!(config.gateway_key.is_none());
        assert_eq!(config.session_ttl, Duration::hours(24));
        assert_eq!(config.policy.max_game_score, 30_000);
        assert_eq!(config.policy.max_games_per_week, 7);
        assert_eq!(config.policy.max_weekly_points, Some(210_000));
        assert_eq!(config.policy.week_offset.local_minus_utc(), 0);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = config_from(&[
            ("PORT", "not-a-port"),
            ("MAX_WEEKLY_POINTS", "off"),
            ("WEEK_UTC_OFFSET_MINUTES", "-300"),
            ("MAX_GAMES_PER_WEEK", "10"),
            ("GATEWAY_KEY", "s3cret"),
        ]);
        assert_eq!(config.port, 5000);
        assert_eq!(config.policy.max_weekly_points, None);
        assert_eq!(config.policy.week_offset.local_minus_utc(), -300 * 60);
        assert_eq!(config.policy.max_games_per_week, 10);
        assert_eq!(config.gateway_key.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_session_ttl_out_of_range_falls_back() {
        for raw in ["0", "-3", "9223372036854775807"] {
            let config = config_from(&[("SESSION_TTL_HOURS", raw)]);
            assert_eq!(config.session_ttl, Duration::hours(24), "SESSION_TTL_HOURS={raw}");
        }
        let config = config_from(&[("SESSION_TTL_HOURS", "72")]);
        assert_eq!(config.session_ttl, Duration::hours(72));
    }

    #[test]
    fn test_offset_out_of_range_falls_back_to_utc() {
        let config = config_from(&[("WEEK_UTC_OFFSET_MINUTES", "100000")]);
        assert_eq!(config.policy.week_offset.local_minus_utc(), 0);
    }
}
