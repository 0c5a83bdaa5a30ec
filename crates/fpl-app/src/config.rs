// Configuration loading and validation (config/fpl.toml).

use fpl_core::recommend::RecommendOptions;
use fpl_core::SEASON_GAMEWEEKS;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the configuration file inside `config/`.
pub const CONFIG_FILE: &str = "fpl.toml";

/// `defaults/fpl.toml`, compiled in so first-run setup works from any
/// directory.
const DEFAULT_CONFIG: &str = include_str!("../defaults/fpl.toml");

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// fpl.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub analysis: AnalysisConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_concurrent_requests: usize,
    pub request_delay_ms: u64,
    pub user_agent: String,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub horizons: Vec<u32>,
    pub min_minutes: u32,
    pub tie_threshold: f64,
    pub top_n: usize,
    pub min_history_coverage: f64,
    pub recent_gameweeks: usize,
    pub differentials: DifferentialsConfig,
}

impl AnalysisConfig {
    pub fn recommend_options(&self) -> RecommendOptions {
        RecommendOptions {
            horizons: self.horizons.clone(),
            min_minutes: self.min_minutes,
            tie_threshold: self.tie_threshold,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DifferentialsConfig {
    /// Ownership percentage at or below which a player counts as a differential.
    pub max_ownership: f64,
    pub min_points: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub enabled: bool,
    pub directory: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/fpl.toml` relative to `base_dir`.
///
/// This does not copy defaults; prefer `load_config()` which does.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

/// Write `config/fpl.toml` under `base_dir` from the bundled defaults when it
/// does not exist yet. Returns the path written, or `None` when a config was
/// already there. Never overwrites.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let config_dir = base_dir.join("config");
    let target = config_dir.join(CONFIG_FILE);

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create {}: {e}", config_dir.display()),
    })?;

    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut dest) => {
            std::io::Write::write_all(&mut dest, DEFAULT_CONFIG.as_bytes()).map_err(|e| {
                ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                }
            })?;
            Ok(Some(target))
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

/// The bundled defaults, parsed and validated.
pub fn default_config() -> Result<Config, ConfigError> {
    let config: Config =
        toml::from_str(DEFAULT_CONFIG).map_err(|source| ConfigError::ParseError {
            path: PathBuf::from("defaults").join(CONFIG_FILE),
            source,
        })?;
    validate(&config)?;
    Ok(config)
}

/// Load config relative to the current working directory, writing the
/// defaults there first if needed.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    if let Some(path) = ensure_config_file(&cwd)? {
        tracing::info!(path = %path.display(), "wrote default config");
    }
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let api = &config.api;
    if api.base_url.trim().is_empty() {
        return Err(invalid("api.base_url", "must not be empty".into()));
    }
    if api.timeout_secs == 0 {
        return Err(invalid("api.timeout_secs", "must be > 0".into()));
    }
    if api.max_concurrent_requests == 0 {
        return Err(invalid("api.max_concurrent_requests", "must be > 0".into()));
    }

    let analysis = &config.analysis;
    if analysis.horizons.is_empty() {
        return Err(invalid("analysis.horizons", "must list at least one horizon".into()));
    }
    if let Some(h) = analysis
        .horizons
        .iter()
        .find(|&&h| h == 0 || h > SEASON_GAMEWEEKS)
    {
        return Err(invalid(
            "analysis.horizons",
            format!("each horizon must be between 1 and {SEASON_GAMEWEEKS}, got {h}"),
        ));
    }
    if analysis.tie_threshold.is_nan() || analysis.tie_threshold < 0.0 {
        return Err(invalid(
            "analysis.tie_threshold",
            format!("must be >= 0, got {}", analysis.tie_threshold),
        ));
    }
    if analysis.top_n == 0 {
        return Err(invalid("analysis.top_n", "must be > 0".into()));
    }
    let coverage = analysis.min_history_coverage;
    if !(0.0..=1.0).contains(&coverage) {
        return Err(invalid(
            "analysis.min_history_coverage",
            format!("must be between 0.0 and 1.0 inclusive, got {coverage}"),
        ));
    }
    let ownership = analysis.differentials.max_ownership;
    if !(0.0..=100.0).contains(&ownership) {
        return Err(invalid(
            "analysis.differentials.max_ownership",
            format!("must be between 0 and 100 inclusive, got {ownership}"),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
