//! Serializable run configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tickflow_core::execution::{DEFAULT_COMMISSION_PER_SHARE, DEFAULT_SLIPPAGE_BPS};
use tickflow_core::order::DEFAULT_QUANTITY;
use tickflow_core::portfolio::DEFAULT_STARTING_CASH;
use tickflow_core::risk::{DEFAULT_MAX_DRAWDOWN_PCT, DEFAULT_MAX_POSITION};
use tickflow_core::strategy::StrategySpec;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("simulation.source is \"csv\" but simulation.csv_path is not set")]
    MissingCsvPath,

    #[error("simulation.bars must be greater than 0")]
    ZeroBars,
}

/// Where market data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Synthetic,
    Csv,
}

/// Serializable configuration for a single backtest run.
///
/// Every field has a default, so an empty TOML file (or no file at all)
/// yields a runnable configuration. Two identical configs hash to the
/// same [`RunId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub simulation: SimulationConfig,
    pub strategy: StrategySpec,
    pub orders: OrderConfig,
    pub execution: ExecutionConfig,
    pub risk: RiskConfig,
    pub portfolio: PortfolioConfig,
    pub journal: JournalConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            strategy: StrategySpec::default(),
            orders: OrderConfig::default(),
            execution: ExecutionConfig::default(),
            risk: RiskConfig::default(),
            portfolio: PortfolioConfig::default(),
            journal: JournalConfig::default(),
        }
    }
}

impl RunConfig {
    /// Loads and validates a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.bars == 0 {
            return Err(ConfigError::ZeroBars);
        }
        if self.simulation.source == DataSource::Csv && self.simulation.csv_path.is_none() {
            return Err(ConfigError::MissingCsvPath);
        }
        Ok(())
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs get the same [`RunId`], so
    /// artifacts from equivalent runs land in the same place.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        let hash = blake3::hash(json.as_bytes());
        hash.to_hex().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub symbol: String,
    pub bars: usize,
    pub seed: u64,
    pub source: DataSource,
    /// Required when `source` is `csv`.
    pub csv_path: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            symbol: "AAPL".into(),
            bars: 250,
            seed: 42,
            source: DataSource::Synthetic,
            csv_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    pub quantity: u32,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            quantity: DEFAULT_QUANTITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub slippage_bps: f64,
    pub commission_per_share: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
            commission_per_share: DEFAULT_COMMISSION_PER_SHARE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub max_position: i64,
    pub max_drawdown_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position: DEFAULT_MAX_POSITION,
            max_drawdown_pct: DEFAULT_MAX_DRAWDOWN_PCT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioConfig {
    pub starting_cash: f64,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            starting_cash: DEFAULT_STARTING_CASH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("journal"),
        }
    }
}
