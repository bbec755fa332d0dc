//! Application-level configuration loading: the blind schedule, the operator
//! token and the payout rules.

use std::{env, fs, io::ErrorKind, path::PathBuf, sync::Arc};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    dto::clock::{LevelDto, schedule_from_dtos},
    state::{
        payouts::{
            DEFAULT_FALLBACK_LEVEL_INDEX, DEFAULT_SECOND_BREAK_LABELS, PayoutBracket, PayoutPolicy,
            PayoutTable,
        },
        schedule::{Blinds, Level, LevelSchedule, ScheduleError, SpecialAction},
    },
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BLIND_CLOCK_CONFIG_PATH";
/// Environment variable that overrides the operator token of the file.
pub const OPERATOR_TOKEN_ENV: &str = "BLIND_CLOCK_OPERATOR_TOKEN";

/// Reasons a configuration document is rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON for [`RawConfig`].
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// The `levels` list does not form a valid schedule.
    #[error("invalid level schedule: {0}")]
    Schedule(#[from] ScheduleError),
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    schedule: Arc<LevelSchedule>,
    operator_token: Option<String>,
    payout_policy: PayoutPolicy,
    payout_table: PayoutTable,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to the built-in
    /// tournament structure when the file is missing or unusable.
    ///
    /// `BLIND_CLOCK_OPERATOR_TOKEN` always wins over the token of the file.
    pub fn load() -> Result<Self, ConfigError> {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        levels = config.schedule.len(),
                        "loaded blind schedule from config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::builtin()?
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::builtin()?
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::builtin()?
            }
        };

        let config = match env::var(OPERATOR_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => config.with_operator_token(Some(token)),
            _ => config,
        };

        if config.operator_token.is_none() {
            warn!("no operator token configured; level changes are disabled for every caller");
        }

        Ok(config)
    }

    /// Parse a configuration document. Missing fields take their defaults.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let raw = serde_json::from_str::<RawConfig>(contents)?;
        Self::try_from(raw)
    }

    /// Built-in configuration: a standard 20 minute structure and no token.
    pub fn builtin() -> Result<Self, ConfigError> {
        Ok(Self {
            schedule: Arc::new(LevelSchedule::new(default_levels())?),
            operator_token: None,
            payout_policy: PayoutPolicy::default(),
            payout_table: PayoutTable::default(),
        })
    }

    /// Replace the operator token.
    pub fn with_operator_token(mut self, token: Option<String>) -> Self {
        self.operator_token = token.filter(|token| !token.trim().is_empty());
        self
    }

    /// Replace the payout visibility rules.
    pub fn with_payout_policy(mut self, policy: PayoutPolicy) -> Self {
        self.payout_policy = policy;
        self
    }

    /// Replace the schedule.
    pub fn with_schedule(mut self, schedule: LevelSchedule) -> Self {
        self.schedule = Arc::new(schedule);
        self
    }

    /// Shared handle on the blind schedule.
    pub fn schedule(&self) -> &Arc<LevelSchedule> {
        &self.schedule
    }

    /// Token granting operator privileges, if any is configured.
    pub fn operator_token(&self) -> Option<&str> {
        self.operator_token.as_deref()
    }

    /// Payout visibility rules.
    pub fn payout_policy(&self) -> &PayoutPolicy {
        &self.payout_policy
    }

    /// Payout tier table.
    pub fn payout_table(&self) -> &PayoutTable {
        &self.payout_table
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    levels: Option<Vec<LevelDto>>,
    operator_token: Option<String>,
    payout_fallback_level_index: Option<usize>,
    second_break_labels: Option<Vec<String>>,
    payout_tiers: Option<Vec<RawBracket>>,
}

#[derive(Debug, Deserialize)]
/// One entry-count bracket of the payout table.
struct RawBracket {
    min_entries: u32,
    percentages: Vec<f64>,
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = ConfigError;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        let schedule = match value.levels {
            Some(levels) => schedule_from_dtos(levels)?,
            None => LevelSchedule::new(default_levels())?,
        };

        let labels = value.second_break_labels.unwrap_or_else(|| {
            DEFAULT_SECOND_BREAK_LABELS
                .iter()
                .map(|label| label.to_string())
                .collect()
        });
        let payout_policy = PayoutPolicy::new(
            value
                .payout_fallback_level_index
                .unwrap_or(DEFAULT_FALLBACK_LEVEL_INDEX),
            labels,
        );

        let payout_table = value
            .payout_tiers
            .map(|tiers| {
                PayoutTable::new(
                    tiers
                        .into_iter()
                        .map(|tier| PayoutBracket {
                            min_entries: tier.min_entries,
                            percentages: tier.percentages,
                        })
                        .collect(),
                )
            })
            .unwrap_or_default();

        Ok(Self {
            schedule: Arc::new(schedule),
            operator_token: None,
            payout_policy,
            payout_table,
        }
        .with_operator_token(value.operator_token))
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in structure shipped with the binary.
fn default_levels() -> Vec<Level> {
    const PLAY: [(u64, u64); 12] = [
        (25, 0),
        (50, 0),
        (75, 0),
        (100, 100),
        (150, 150),
        (200, 200),
        (300, 300),
        (400, 400),
        (500, 500),
        (600, 600),
        (800, 800),
        (1000, 1000),
    ];

    let mut levels = Vec::with_capacity(PLAY.len() + 3);
    for (position, (small_blind, ante)) in PLAY.into_iter().enumerate() {
        match position {
            4 => levels.push(Level::break_level(
                levels.len(),
                10,
                "B1",
                SpecialAction::ChipUpTo1s,
            )),
            7 => levels.push(Level::break_level(
                levels.len(),
                15,
                "B2",
                SpecialAction::RegistrationClosesAndChipUpTo5s,
            )),
            10 => levels.push(Level::break_level(
                levels.len(),
                10,
                "B3",
                SpecialAction::None,
            )),
            _ => {}
        }
        levels.push(Level::regular(
            levels.len(),
            20,
            Blinds {
                small_blind,
                big_blind: small_blind * 2,
                ante,
            },
        ));
    }
    levels
}
