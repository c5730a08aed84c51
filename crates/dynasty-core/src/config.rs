// Configuration loading and parsing (config/dynasty.toml).

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::history::champion::StrategyKind;
use crate::source::sleeper::DEFAULT_BASE_URL;

const CONFIG_FILE: &str = "dynasty.toml";

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

    #[error("no config at {} and no default at {}", config.display(), default.display())]
    NoConfig { config: PathBuf, default: PathBuf },

    #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
    CopyDefault {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// dynasty.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub league: LeagueSection,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub playoffs: PlayoffConfig,
    #[serde(default)]
    pub champion: ChampionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueSection {
    /// Any league id in the lineage; the chain is resolved from here.
    pub seed_league_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Playoff length per league. The provider does not report how many weeks
/// the playoffs span, so the count is configured rather than inferred.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayoffConfig {
    pub default_rounds: u32,
    /// Per-league overrides keyed by league id.
    #[serde(default)]
    pub rounds_by_league: HashMap<String, u32>,
}

impl PlayoffConfig {
    pub fn rounds_for(&self, league_id: &str) -> u32 {
        self.rounds_by_league
            .get(league_id)
            .copied()
            .unwrap_or(self.default_rounds)
    }
}

impl Default for PlayoffConfig {
    fn default() -> Self {
        Self {
            default_rounds: 3,
            rounds_by_league: HashMap::new(),
        }
    }
}

/// Champion resolution strategies, tried in the listed order.
#[derive(Debug, Clone, Deserialize)]
pub struct ChampionConfig {
    pub strategies: Vec<String>,
}

impl ChampionConfig {
    /// Parsed strategy list. Unknown names are rejected by validation, so
    /// they are simply dropped here.
    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies
            .iter()
            .filter_map(|name| StrategyKind::from_name(name))
            .collect()
    }
}

impl Default for ChampionConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyKind::ALL
                .iter()
                .map(|k| k.name().to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub report_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_path: "dynasty-report.json".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/dynasty.toml` relative to
/// `base_dir`. Does not copy defaults; see `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config = parse_config(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Parse a config document without validating it.
pub fn parse_config(text: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(text)
}

/// Seed `config/dynasty.toml` from `defaults/dynasty.toml` when it is
/// missing. Returns the path written, or `None` if a config was already there.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let config = base_dir.join("config").join(CONFIG_FILE);
    if config.exists() {
        return Ok(None);
    }
    let default = base_dir.join("defaults").join(CONFIG_FILE);
    if !default.exists() {
        return Err(ConfigError::NoConfig { config, default });
    }

    let copy = |from: &Path, to: &Path| -> std::io::Result<()> {
        if let Some(dir) = to.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::copy(from, to).map(|_| ())
    };
    copy(&default, &config).map_err(|source| ConfigError::CopyDefault {
        from: default.clone(),
        to: config.clone(),
        source,
    })?;
    Ok(Some(config))
}

/// Loads config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
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

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.seed_league_id.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.seed_league_id".into(),
            message: "must not be empty".into(),
        });
    }

    if config.source.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "source.base_url".into(),
            message: "must not be empty".into(),
        });
    }

    if config.playoffs.default_rounds == 0 {
        return Err(ConfigError::ValidationError {
            field: "playoffs.default_rounds".into(),
            message: "must be greater than 0".into(),
        });
    }
    for (league_id, rounds) in &config.playoffs.rounds_by_league {
        if *rounds == 0 {
            return Err(ConfigError::ValidationError {
                field: format!("playoffs.rounds_by_league.{league_id}"),
                message: "must be greater than 0".into(),
            });
        }
    }

    let strategies = &config.champion.strategies;
    if strategies.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "champion.strategies".into(),
            message: "must list at least one strategy".into(),
        });
    }
    let mut seen = HashSet::new();
    for name in strategies {
        if StrategyKind::from_name(name).is_none() {
            return Err(ConfigError::ValidationError {
                field: "champion.strategies".into(),
                message: format!("unknown strategy `{name}`"),
            });
        }
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::ValidationError {
                field: "champion.strategies".into(),
                message: format!("strategy `{name}` listed twice"),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
