//! Feature extraction
//!
//! Rolling form per entity and the per-entrant race feature vectors built on it.

pub mod form;
pub mod race_features;

pub use form::{FormIndex, FormValue};
pub use race_features::{FeatureAssembler, FeatureVector, RaceWeather};
