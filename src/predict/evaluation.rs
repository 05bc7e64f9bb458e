//! Prediction quality against recorded results

use std::fmt;

use serde::Serialize;

use crate::predict::inference::RacePrediction;

/// Accuracy of ranked predictions over classified finishers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PredictionQuality {
    /// Classified entrants compared
    pub samples: usize,
    /// Mean absolute error between predicted score and finishing position
    pub mae: Option<f64>,
    /// Coefficient of determination of score against position
    pub r2: Option<f64>,
    /// Mean absolute difference between predicted rank and finishing position
    pub rank_mae: Option<f64>,
    /// Entrants whose predicted rank equals their finishing position
    pub exact_hits: usize,
}

impl PredictionQuality {
    /// Score a set of race predictions; unclassified entrants are ignored
    pub fn from_races(races: &[RacePrediction]) -> Self {
        let pairs: Vec<(f64, usize, f64)> = races
            .iter()
            .flat_map(|race| race.predictions.iter())
            .filter_map(|p| {
                p.actual_position
                    .map(|actual| (p.predicted_score, p.rank, actual as f64))
            })
            .collect();

        if pairs.is_empty() {
            return Self::default();
        }

        let n = pairs.len() as f64;
        let mae = pairs.iter().map(|(s, _, a)| (s - a).abs()).sum::<f64>() / n;
        let rank_mae = pairs
            .iter()
            .map(|(_, r, a)| (*r as f64 - a).abs())
            .sum::<f64>()
            / n;
        let exact_hits = pairs.iter().filter(|(_, r, a)| *r as f64 == *a).count();

        let mean_actual = pairs.iter().map(|(_, _, a)| a).sum::<f64>() / n;
        let ss_tot: f64 = pairs.iter().map(|(_, _, a)| (a - mean_actual).powi(2)).sum();
        let ss_res: f64 = pairs.iter().map(|(s, _, a)| (a - s).powi(2)).sum();
        let r2 = if ss_tot > 0.0 {
            Some(1.0 - ss_res / ss_tot)
        } else {
            None
        };

        PredictionQuality {
            samples: pairs.len(),
            mae: Some(mae),
            r2,
            rank_mae: Some(rank_mae),
            exact_hits,
        }
    }
}

impl fmt::Display for PredictionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<f64>| v.map_or("n/a".to_string(), |v| format!("{:.4}", v));
        write!(
            f,
            "samples={} mae={} r2={} rank_mae={} exact={}",
            self.samples,
            show(self.mae),
            show(self.r2),
            show(self.rank_mae),
            self.exact_hits
        )
    }
}
