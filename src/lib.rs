//! Motorsport race-form features and season insights
//!
//! Turns a chronologically ordered history of race results into per-entrant
//! recent-form features, ranked finishing predictions and season statistics.

pub mod data;
pub mod features;
pub mod insights;
pub mod predict;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Driver identifier (the three-letter abbreviation in the source data)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DriverId(pub String);

impl DriverId {
    pub fn new(id: impl Into<String>) -> Self {
        DriverId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Constructor (team) identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstructorId(pub String);

impl ConstructorId {
    pub fn new(id: impl Into<String>) -> Self {
        ConstructorId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConstructorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Grouping key for form computation: a driver or a constructor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKey {
    Driver(DriverId),
    Constructor(ConstructorId),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Driver(id) => write!(f, "driver {}", id),
            EntityKey::Constructor(id) => write!(f, "constructor {}", id),
        }
    }
}

/// Unique identity of a stored entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub year: u16,
    pub round: u32,
    pub driver: DriverId,
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} round {} ({})", self.year, self.round, self.driver)
    }
}

/// Weather observation attached to an entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    /// Air temperature (°C)
    pub air_temp: Option<f64>,
    /// Track temperature (°C)
    pub track_temp: Option<f64>,
    /// Relative humidity (%)
    pub humidity: Option<f64>,
    pub rainfall: bool,
}

impl Weather {
    /// True when every numeric reading is present
    pub fn is_complete(&self) -> bool {
        self.air_temp.is_some() && self.track_temp.is_some() && self.humidity.is_some()
    }
}

/// A single entrant's result in one race, after coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceEntry {
    pub year: u16,
    /// 1-based round within the season
    pub round: u32,
    pub driver: DriverId,
    pub constructor: ConstructorId,
    /// Starting grid slot; None for pit-lane or unrecorded starts
    pub grid_position: Option<u32>,
    /// Classified finishing position; None for a non-finish
    pub finish_position: Option<u32>,
    pub points: Option<f64>,
    pub weather: Weather,
    pub race_name: Option<String>,
    pub driver_name: Option<String>,
}

impl RaceEntry {
    pub fn key(&self) -> EntryKey {
        EntryKey {
            year: self.year,
            round: self.round,
            driver: self.driver.clone(),
        }
    }

    pub fn driver_key(&self) -> EntityKey {
        EntityKey::Driver(self.driver.clone())
    }

    pub fn constructor_key(&self) -> EntityKey {
        EntityKey::Constructor(self.constructor.clone())
    }

    /// Did this entrant record a classified finish?
    pub fn is_classified(&self) -> bool {
        self.finish_position.is_some()
    }

    pub fn is_winner(&self) -> bool {
        self.finish_position == Some(1)
    }

    /// Points for aggregation; missing points count as zero
    pub fn points_or_zero(&self) -> f64 {
        self.points.unwrap_or(0.0)
    }

    /// Positions gained from grid to flag (negative = lost), classified starters only
    pub fn positions_gained(&self) -> Option<i64> {
        match (self.grid_position, self.finish_position) {
            (Some(grid), Some(finish)) => Some(grid as i64 - finish as i64),
            _ => None,
        }
    }

    /// Usable as a supervised training sample
    pub fn is_training_eligible(&self) -> bool {
        self.finish_position.is_some()
            && self.grid_position.is_some()
            && self.points.is_some()
            && self.weather.is_complete()
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum RaceformError {
    #[error("No data for season {year}{}", .round.map(|r| format!(" round {}", r)).unwrap_or_default())]
    MissingData { year: u16, round: Option<u32> },

    #[error("Predictor unavailable: {0}")]
    PredictorUnavailable(String),

    #[error("Cannot assemble features for {year} round {round}: {reason}")]
    Assembly { year: u16, round: u32, reason: String },

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RaceformError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub form: FormConfig,
    pub features: FeatureConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub dataset_path: String,
    pub model_path: String,
}

/// Rolling-window parameters for form
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormConfig {
    /// Number of most recent prior entries averaged
    pub window: usize,
    /// Minimum valid points values required, else form is 0
    pub min_periods: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        FormConfig {
            window: 5,
            min_periods: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Grid slot assumed for pit-lane or unrecorded starts
    pub grid_imputation: u32,
    /// Relative humidity (%) assumed when a race records none
    #[serde(default = "default_humidity_imputation")]
    pub humidity_imputation: f64,
}

fn default_humidity_imputation() -> f64 {
    50.0
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            grid_imputation: 20,
            humidity_imputation: default_humidity_imputation(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Season held out for testing
    pub test_season: u16,
    /// Below this many test rows a seeded random split is used instead
    pub min_test_rows: usize,
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            test_season: 2024,
            min_test_rows: 10,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                dataset_path: "data/f1_race_data.csv".to_string(),
                model_path: "model/position_model.json".to_string(),
            },
            form: FormConfig::default(),
            features: FeatureConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RaceformError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| RaceformError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RaceformError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.form.window == 0 {
            return Err(RaceformError::Config("form.window must be at least 1".into()));
        }
        if self.form.min_periods == 0 || self.form.min_periods > self.form.window {
            return Err(RaceformError::Config(format!(
                "form.min_periods must be between 1 and {}",
                self.form.window
            )));
        }
        if self.features.grid_imputation == 0 {
            return Err(RaceformError::Config(
                "features.grid_imputation must be a real grid slot (>= 1)".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.features.humidity_imputation) {
            return Err(RaceformError::Config(
                "features.humidity_imputation must be in [0, 100]".into(),
            ));
        }
        if !(self.training.test_fraction > 0.0 && self.training.test_fraction < 1.0) {
            return Err(RaceformError::Config(
                "training.test_fraction must be in (0, 1)".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.form.window, 5);
        assert_eq!(config.form.min_periods, 1);
        assert_eq!(config.features.grid_imputation, 20);
        assert_eq!(config.features.humidity_imputation, 50.0);
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.form.window = 3;
        config.save(path).unwrap();

        let loaded = Config::load(path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_humidity_imputation_defaults_when_absent() {
        let content = toml::to_string_pretty(&Config::default())
            .unwrap()
            .replace("humidity_imputation = 50.0\n", "");
        assert!(!content.contains("humidity_imputation"));
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.features.humidity_imputation, 50.0);

        let mut config = Config::default();
        config.features.humidity_imputation = 140.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_min_periods_rejected() {
        let mut config = Config::default();
        config.form.min_periods = 6;
        assert!(matches!(config.validate(), Err(RaceformError::Config(_))));
    }

    #[test]
    fn test_missing_data_message() {
        let season = RaceformError::MissingData { year: 2023, round: None };
        assert_eq!(season.to_string(), "No data for season 2023");

        let race = RaceformError::MissingData { year: 2023, round: Some(5) };
        assert_eq!(race.to_string(), "No data for season 2023 round 5");
    }

    #[test]
    fn test_positions_gained() {
        let entry = RaceEntry {
            year: 2023,
            round: 1,
            driver: DriverId::new("VER"),
            constructor: ConstructorId::new("Red Bull Racing"),
            grid_position: Some(15),
            finish_position: Some(2),
            points: Some(18.0),
            weather: Weather::default(),
            race_name: None,
            driver_name: None,
        };
        assert_eq!(entry.positions_gained(), Some(13));
        assert!(!entry.is_training_eligible());
    }
}
