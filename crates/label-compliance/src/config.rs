use std::path::{Path, PathBuf};

use compliance_engine::{EmptyTextPolicy, ScoringPolicy};

use crate::error::AppError;

const DEFAULT_REPORT_CACHE_TTL_SECS: u64 = 3600;

/// Application configuration loaded explicitly from environment variables.
///
/// Every variable is optional. Without `LABEL_RULES_PATH` the built-in rule
/// catalog is served; without `REDIS_URL` reports are not cached.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL (e.g. "redis://127.0.0.1:6379"). `None` disables caching.
    pub redis_url: Option<String>,
    /// Directory of rule JSON files. `None` uses the built-in catalog.
    pub rules_path: Option<String>,
    /// TTL for cached reports.
    pub report_cache_ttl_secs: u64,
    pub scoring: ScoringPolicy,
    pub empty_text: EmptyTextPolicy,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `LABEL_RULES_PATH`: directory of rule files (must exist when set)
    /// - `REDIS_URL`: Redis connection string (omit to disable caching)
    /// - `REPORT_CACHE_TTL_SECS`: report cache TTL, default 3600
    /// - `SCORE_WEIGHT_HIGH`, `SCORE_WEIGHT_MEDIUM`, `SCORE_WEIGHT_LOW`: severity weights
    /// - `SCORE_FLOOR_ALL_CRITICAL`, `SCORE_FLOOR_SOME_CRITICAL`: score floors
    /// - `BASIC_REQUIREMENTS`: comma-separated element substrings presumed
    ///   compliant when the label text is empty
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let rules_path = var("LABEL_RULES_PATH");
        if let Some(path) = &rules_path {
            if !Path::new(path).is_dir() {
                return Err(AppError::Config(format!(
                    "LABEL_RULES_PATH is not a directory: {path}"
                )));
            }
        }

        let report_cache_ttl_secs = match var("REPORT_CACHE_TTL_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AppError::Config(format!("REPORT_CACHE_TTL_SECS must be an integer, got '{raw}'"))
            })?,
            None => DEFAULT_REPORT_CACHE_TTL_SECS,
        };

        let mut scoring = ScoringPolicy::default();
        for (name, slot) in [
            ("SCORE_WEIGHT_HIGH", &mut scoring.weights.high),
            ("SCORE_WEIGHT_MEDIUM", &mut scoring.weights.medium),
            ("SCORE_WEIGHT_LOW", &mut scoring.weights.low),
            ("SCORE_FLOOR_ALL_CRITICAL", &mut scoring.all_critical_passed_floor),
            ("SCORE_FLOOR_SOME_CRITICAL", &mut scoring.some_critical_passed_floor),
        ] {
            if let Some(raw) = var(name) {
                *slot = raw.trim().parse::<f64>().map_err(|_| {
                    AppError::Config(format!("{name} must be a number, got '{raw}'"))
                })?;
            }
        }
        scoring.validate()?;

        let empty_text = match var("BASIC_REQUIREMENTS") {
            Some(raw) => EmptyTextPolicy::new(raw.split(',')),
            None => EmptyTextPolicy::default(),
        };

        Ok(Self {
            redis_url: var("REDIS_URL"),
            rules_path,
            report_cache_ttl_secs,
            scoring,
            empty_text,
        })
    }

    /// Directory of rule files, if one was configured.
    pub fn rules_dir(&self) -> Option<PathBuf> {
        self.rules_path.as_ref().map(PathBuf::from)
    }
}
