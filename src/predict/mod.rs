//! Prediction and ranking
//!
//! Load position models, rank race entrants and measure prediction quality.

pub mod evaluation;
pub mod inference;
pub mod model;
pub mod ranking;

pub use evaluation::PredictionQuality;
pub use inference::{format_prediction, RaceContext, RacePrediction, RacePredictor};
pub use model::{load_model, GridOrderModel, LinearPositionModel, PositionModel};
pub use ranking::{dense_ranks, rank_entrants, RankedPrediction};
