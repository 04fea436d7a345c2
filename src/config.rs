use crate::api::nfl_api::{NflApiClient, DEFAULT_BASE_URL};
use crate::utils::confidence::ScoringPolicy;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_STORE_PATH: &str = "data/analyses.jsonl";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Service settings, read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct Config {
    pub nfl_api_key: Option<String>,
    pub nfl_api_base_url: String,
    pub bind_addr: SocketAddr,
    pub store_path: PathBuf,
    pub cors_origin: String,
    pub tesseract_bin: PathBuf,
    pub current_season: Option<i32>,
    pub last_season: Option<i32>,
    pub scoring: ScoringPolicy,
}

impl Config {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; unset and blank variables take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let defaults = ScoringPolicy::default();
        let recent_weight: f64 =
            parse_var(&get, "SCORING_RECENT_WEIGHT")?.unwrap_or(defaults.recent_weight);
        let h2h_weight: f64 =
            parse_var(&get, "SCORING_H2H_WEIGHT")?.unwrap_or(defaults.h2h_weight);
        for (field, weight) in [
            ("SCORING_RECENT_WEIGHT", recent_weight),
            ("SCORING_H2H_WEIGHT", h2h_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{} is outside 0.0..=1.0", weight),
                });
            }
        }

        let alternative_threshold: u8 = parse_var(&get, "SCORING_ALTERNATIVE_THRESHOLD")?
            .unwrap_or(defaults.alternative_threshold);
        if alternative_threshold > 100 {
            return Err(ConfigError::InvalidValue {
                field: "SCORING_ALTERNATIVE_THRESHOLD",
                reason: format!("{} is above 100", alternative_threshold),
            });
        }

        let stats_timeout = parse_var::<u64, _>(&get, "SCORING_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.stats_timeout);

        Ok(Self {
            nfl_api_key: get("NFL_API_KEY"),
            nfl_api_base_url: get("NFL_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            bind_addr: parse_var(&get, "PARLAY_PULSE_ADDR")?
                .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8000))),
            store_path: get("PARLAY_PULSE_STORE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH)),
            cors_origin: get("PARLAY_PULSE_CORS_ORIGIN")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            tesseract_bin: get("TESSERACT_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("tesseract")),
            current_season: parse_var(&get, "NFL_CURRENT_SEASON")?,
            last_season: parse_var(&get, "NFL_LAST_SEASON")?,
            scoring: ScoringPolicy {
                recent_weight,
                h2h_weight,
                alternative_threshold,
                stats_timeout,
                ..defaults
            },
        })
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.nfl_api_key
            .as_deref()
            .ok_or(ConfigError::MissingField {
                field: "NFL_API_KEY",
            })
    }

    /// Stats client configured with the key, base URL and season overrides
    pub fn stats_client(&self) -> Result<NflApiClient, ConfigError> {
        let client = NflApiClient::new(self.require_api_key()?.to_string())
            .with_base_url(self.nfl_api_base_url.as_str());

        // An overridden current season implies its predecessor; otherwise the
        // client's date-derived last completed season stands
        let (current, last) = match self.current_season {
            Some(current) => (current, self.last_season.unwrap_or(current - 1)),
            None => (
                client.current_season(),
                self.last_season.unwrap_or(client.last_season()),
            ),
        };
        Ok(client.with_seasons(current, last))
    }
}

fn parse_var<T, F>(get: &F, field: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    get(field)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    field,
                    reason: format!("'{}': {}", raw, e),
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StatsProvider;
    use crate::api::nfl_api::{last_completed_season_for, nfl_season_for};
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8000");
        assert_eq!(config.store_path, PathBuf::from(DEFAULT_STORE_PATH));
        assert_eq!(config.cors_origin, DEFAULT_CORS_ORIGIN);
        assert_eq!(config.scoring, ScoringPolicy::default());
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingField { field: "NFL_API_KEY" })
        ));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("NFL_API_KEY", "secret"),
            ("PARLAY_PULSE_ADDR", "0.0.0.0:9000"),
            ("SCORING_RECENT_WEIGHT", "0.5"),
            ("SCORING_H2H_WEIGHT", "0.5"),
            ("SCORING_ALTERNATIVE_THRESHOLD", "65"),
            ("SCORING_TIMEOUT_SECS", "2"),
            ("NFL_CURRENT_SEASON", "2024"),
        ])
        .unwrap();

        assert_eq!(config.require_api_key().unwrap(), "secret");
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.scoring.recent_weight, 0.5);
        assert_eq!(config.scoring.alternative_threshold, 65);
        assert_eq!(config.scoring.stats_timeout, Duration::from_secs(2));

        let client = config.stats_client().unwrap();
        assert_eq!(client.current_season(), 2024);
        assert_eq!(client.last_completed_season(), 2023);
    }

    #[test]
    fn test_seasons_default_to_calendar() {
        let today = chrono::Utc::now().date_naive();
        let client = config_from(&[("NFL_API_KEY", "secret")])
            .unwrap()
            .stats_client()
            .unwrap();
        assert_eq!(client.current_season(), nfl_season_for(today));
        assert_eq!(client.last_completed_season(), last_completed_season_for(today));

        let client = config_from(&[("NFL_API_KEY", "secret"), ("NFL_LAST_SEASON", "2021")])
            .unwrap()
            .stats_client()
            .unwrap();
        assert_eq!(client.current_season(), nfl_season_for(today));
        assert_eq!(client.last_completed_season(), 2021);
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = config_from(&[("NFL_API_KEY", "  "), ("SCORING_TIMEOUT_SECS", "")]).unwrap();
        assert!(config.nfl_api_key.is_none());
        assert_eq!(config.scoring.stats_timeout, ScoringPolicy::default().stats_timeout);
    }

    #[test]
    fn test_invalid_values() {
        let err = config_from(&[("SCORING_ALTERNATIVE_THRESHOLD", "high")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "SCORING_ALTERNATIVE_THRESHOLD", .. }
        ));

        let err = config_from(&[("SCORING_RECENT_WEIGHT", "1.5")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "SCORING_RECENT_WEIGHT", .. }));

        let err = config_from(&[("PARLAY_PULSE_ADDR", "localhost")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "PARLAY_PULSE_ADDR", .. }));
    }
}
