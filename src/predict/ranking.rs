//! Ranking Engine: predicted scores to a dense finishing order
//!
//! Lower score means a better predicted finish. Equal scores keep entrant
//! order (first listed ranks higher), so ranks are always exactly 1..=N.

use std::cmp::Ordering;

use serde::Serialize;

use crate::{ConstructorId, DriverId, RaceEntry, RaceformError, Result};

/// One entrant's predicted rank next to its recorded result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPrediction {
    /// Dense rank, 1 = predicted winner
    pub rank: usize,
    pub driver: DriverId,
    pub driver_name: Option<String>,
    pub constructor: ConstructorId,
    pub predicted_score: f64,
    pub grid_position: Option<u32>,
    /// Recorded finish; None if unclassified
    pub actual_position: Option<u32>,
}

fn compare_scores(a: f64, b: f64) -> Ordering {
    // NaN sorts after every real score
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => Ordering::Equal,
    }
}

/// Dense 1-based rank for each score, in input order
pub fn dense_ranks(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    // sort_by is stable: ties keep input order
    order.sort_by(|&a, &b| compare_scores(scores[a], scores[b]));

    let mut ranks = vec![0; scores.len()];
    for (position, &idx) in order.iter().enumerate() {
        ranks[idx] = position + 1;
    }
    ranks
}

/// Rank a race's entrants by predicted score, best first
pub fn rank_entrants(entrants: &[&RaceEntry], scores: &[f64]) -> Result<Vec<RankedPrediction>> {
    if entrants.len() != scores.len() {
        return Err(RaceformError::Prediction(format!(
            "{} scores for {} entrants",
            scores.len(),
            entrants.len()
        )));
    }

    let ranks = dense_ranks(scores);
    let mut ranked: Vec<RankedPrediction> = entrants
        .iter()
        .zip(scores)
        .zip(ranks)
        .map(|((entry, &score), rank)| RankedPrediction {
            rank,
            driver: entry.driver.clone(),
            driver_name: entry.driver_name.clone(),
            constructor: entry.constructor.clone(),
            predicted_score: score,
            grid_position: entry.grid_position,
            actual_position: entry.finish_position,
        })
        .collect();

    ranked.sort_by_key(|p| p.rank);
    Ok(ranked)
}
