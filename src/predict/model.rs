//! Position models: the external predictor behind a trait
//!
//! Models are trained and persisted by offline tooling. This crate only loads
//! them and calls `predict`; it never fits or mutates one.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;
use crate::{RaceformError, Result};

/// A trained predictor of finishing position (lower = better)
pub trait PositionModel: Send + Sync {
    fn name(&self) -> &str;

    /// One score per input vector, in input order
    fn predict(&self, features: &[FeatureVector]) -> Result<Vec<f64>>;
}

/// Linear regression exported by the offline trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPositionModel {
    /// Feature order the weights were fitted on
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl LinearPositionModel {
    pub fn new(weights: Vec<f64>, intercept: f64) -> Result<Self> {
        let model = LinearPositionModel {
            feature_names: FeatureVector::NAMES.iter().map(|s| s.to_string()).collect(),
            weights,
            intercept,
        };
        model.validate()?;
        Ok(model)
    }

    /// Load from the JSON file written by the trainer
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let model: LinearPositionModel = serde_json::from_str(&content)?;
        model.validate()?;
        log::info!("Loaded linear position model from {}", path.display());
        Ok(model)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.feature_names.len() != FeatureVector::DIM
            || self
                .feature_names
                .iter()
                .zip(FeatureVector::NAMES)
                .any(|(a, b)| a != b)
        {
            return Err(RaceformError::PredictorUnavailable(format!(
                "model features {:?} do not match {:?}",
                self.feature_names,
                FeatureVector::NAMES
            )));
        }
        if self.weights.len() != FeatureVector::DIM {
            return Err(RaceformError::PredictorUnavailable(format!(
                "expected {} weights, model has {}",
                FeatureVector::DIM,
                self.weights.len()
            )));
        }
        Ok(())
    }
}

impl PositionModel for LinearPositionModel {
    fn name(&self) -> &str {
        "linear"
    }

    fn predict(&self, features: &[FeatureVector]) -> Result<Vec<f64>> {
        Ok(features
            .iter()
            .map(|f| {
                f.to_vec()
                    .iter()
                    .zip(&self.weights)
                    .map(|(x, w)| x * w)
                    .sum::<f64>()
                    + self.intercept
            })
            .collect())
    }
}

/// Baseline: finish where you start
#[derive(Debug, Clone, Copy, Default)]
pub struct GridOrderModel;

impl PositionModel for GridOrderModel {
    fn name(&self) -> &str {
        "grid-order"
    }

    fn predict(&self, features: &[FeatureVector]) -> Result<Vec<f64>> {
        Ok(features.iter().map(|f| f.grid_position).collect())
    }
}

/// Load the configured model; a missing file means no predictor
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<LinearPositionModel> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RaceformError::PredictorUnavailable(format!(
            "no model at {}",
            path.display()
        )));
    }
    LinearPositionModel::load(path)
}
