use crate::forecast::seasonal::z_score;
use crate::forecast::{DEFAULT_HORIZON_PERIODS, MAX_HORIZON_PERIODS, SeasonalitySettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8080;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub calibration: Option<CalibrationSettings>,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub forecast: Option<ForecastSection>,
    #[serde(default)]
    pub imputation: Option<ImputationSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationSettings {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8080)
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecastSection {
    /// Month-end periods appended after the last observation (default: 3)
    pub horizon_periods: Option<usize>,
    /// Coverage of the uncertainty bounds (default: 0.80)
    pub interval_width: Option<f64>,
    pub yearly_fourier_order: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImputationSection {
    /// Fixed shuffle seed; unset means a fresh seed per request.
    pub seed: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

impl Config {
    pub fn calibration_path(&self) -> Option<&Path> {
        let path = self.calibration.as_ref()?.path.as_deref()?;
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    }

    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Returns the forecast horizon in periods (default: 3, at most 120)
    pub fn horizon_periods(&self) -> usize {
        let periods = self
            .forecast
            .as_ref()
            .and_then(|f| f.horizon_periods)
            .unwrap_or(DEFAULT_HORIZON_PERIODS);
        if periods > MAX_HORIZON_PERIODS {
            tracing::warn!(
                configured = periods,
                max = MAX_HORIZON_PERIODS,
                "Configured horizon too long, capping"
            );
            return MAX_HORIZON_PERIODS;
        }
        periods
    }

    /// Seasonality settings with any configured overrides applied.
    pub fn seasonality_settings(&self) -> SeasonalitySettings {
        let mut settings = SeasonalitySettings::default();
        if let Some(section) = &self.forecast {
            match section.interval_width {
                Some(width) if z_score(width).is_some() => settings.interval_width = width,
                Some(width) => tracing::warn!(
                    interval_width = width,
                    default = settings.interval_width,
                    "Unsupported interval width, keeping default"
                ),
                None => {}
            }
            if let Some(order) = section.yearly_fourier_order {
                settings.yearly_fourier_order = order;
            }
        }
        settings
    }

    pub fn imputation_seed(&self) -> Option<u64> {
        self.imputation.as_ref()?.seed
    }

    /// Parsed `[logging].level`, falling back to INFO when unrecognised.
    pub fn log_level(&self) -> tracing::Level {
        self.logging.level.parse().unwrap_or(tracing::Level::INFO)
    }
}
