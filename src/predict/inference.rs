//! Race prediction over a loaded history
//!
//! The history snapshot and the model are loaded once and shared read-only;
//! predictions never mutate either.

use std::sync::Arc;

use serde::Serialize;

use crate::data::{EntrySource, EntryStore, IngestReport};
use crate::features::{FeatureAssembler, FormIndex};
use crate::predict::evaluation::PredictionQuality;
use crate::predict::model::PositionModel;
use crate::predict::ranking::{rank_entrants, RankedPrediction};
use crate::{Config, FeatureConfig, RaceformError, Result};

/// Immutable history context shared by prediction and insight requests
#[derive(Debug, Clone)]
pub struct RaceContext {
    pub store: Arc<EntryStore>,
    pub form: Arc<FormIndex>,
    pub features: FeatureConfig,
}

impl RaceContext {
    pub fn new(store: EntryStore, config: &Config) -> Self {
        let form = FormIndex::build(&store, config.form);
        RaceContext {
            store: Arc::new(store),
            form: Arc::new(form),
            features: config.features,
        }
    }

    /// Load rows from a source, ingest them and build the form index
    pub fn load(source: &dyn EntrySource, config: &Config) -> Result<(Self, IngestReport)> {
        log::info!("Loading history from {}", source.describe());
        let batch = source.load()?;
        let (store, mut report) = EntryStore::from_raw(batch.rows);
        if !batch.malformed.is_empty() {
            report.malformed.extend(batch.malformed);
            report.malformed.sort_by_key(|m| m.line);
        }
        Ok((Self::new(store, config), report))
    }
}

/// Ranked predictions for one race
#[derive(Debug, Clone, Serialize)]
pub struct RacePrediction {
    pub year: u16,
    pub round: u32,
    pub race_name: Option<String>,
    pub model: String,
    pub predictions: Vec<RankedPrediction>,
}

impl RacePrediction {
    /// Display label, e.g. "2023 Bahrain Grand Prix"
    pub fn label(&self) -> String {
        match &self.race_name {
            Some(name) => format!("{} {}", self.year, name),
            None => format!("{} round {}", self.year, self.round),
        }
    }
}

/// Predictor for ranking the entrants of stored races
pub struct RacePredictor {
    context: RaceContext,
    model: Option<Arc<dyn PositionModel>>,
}

impl RacePredictor {
    pub fn new(context: RaceContext, model: Arc<dyn PositionModel>) -> Self {
        RacePredictor {
            context,
            model: Some(model),
        }
    }

    /// A predictor with no model; prediction calls fail, lookups still work
    pub fn without_model(context: RaceContext) -> Self {
        RacePredictor {
            context,
            model: None,
        }
    }

    pub fn context(&self) -> &RaceContext {
        &self.context
    }

    fn model(&self) -> Result<&Arc<dyn PositionModel>> {
        self.model
            .as_ref()
            .ok_or_else(|| RaceformError::PredictorUnavailable("no model loaded".to_string()))
    }

    /// Rank the entrants of a stored race
    pub fn predict_race(&self, year: u16, round: u32) -> Result<RacePrediction> {
        let model = self.model()?;
        let entrants = self.context.store.race(year, round);
        if entrants.is_empty() {
            return Err(RaceformError::MissingData {
                year,
                round: Some(round),
            });
        }

        let assembler = FeatureAssembler::new(&self.context.form, self.context.features);
        let features = assembler.assemble(&entrants)?;
        let scores = model.predict(&features)?;
        let predictions = rank_entrants(&entrants, &scores)?;

        log::debug!(
            "Predicted {} entrants for {} round {} with {}",
            predictions.len(),
            year,
            round,
            model.name()
        );

        Ok(RacePrediction {
            year,
            round,
            race_name: entrants.iter().find_map(|e| e.race_name.clone()),
            model: model.name().to_string(),
            predictions,
        })
    }

    /// Rank the most recent stored race of a season
    pub fn predict_latest(&self, year: u16) -> Result<RacePrediction> {
        let round = self
            .context
            .store
            .latest_round(year)
            .ok_or(RaceformError::MissingData { year, round: None })?;
        self.predict_race(year, round)
    }

    /// Rank every stored race of a season, skipping races that cannot be assembled
    pub fn predict_season(&self, year: u16) -> Result<Vec<RacePrediction>> {
        let rounds = self.context.store.rounds(year);
        if rounds.is_empty() {
            return Err(RaceformError::MissingData { year, round: None });
        }

        let mut races = Vec::with_capacity(rounds.len());
        for round in rounds {
            match self.predict_race(year, round) {
                Ok(race) => races.push(race),
                Err(e @ RaceformError::Assembly { .. }) => {
                    log::warn!("Skipping {} round {}: {}", year, round, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(races)
    }

    /// Prediction quality over every assemblable race of a season
    pub fn evaluate_season(&self, year: u16) -> Result<PredictionQuality> {
        let races = self.predict_season(year)?;
        let quality = PredictionQuality::from_races(&races);
        log::info!("{} evaluated over {} races: {}", year, races.len(), quality);
        Ok(quality)
    }
}

/// Format a race prediction for display
pub fn format_prediction(race: &RacePrediction) -> String {
    let mut out = format!("\n{} ({})\n", race.label(), race.model);
    out.push_str(&format!(
        "{:>4}  {:<6} {:<24} {:>6} {:>6} {:>7}\n",
        "Rank", "Driver", "Team", "Grid", "Score", "Actual"
    ));
    out.push_str(&"─".repeat(58));
    out.push('\n');

    let slot = |v: Option<u32>| v.map_or("-".to_string(), |v| v.to_string());
    for p in &race.predictions {
        out.push_str(&format!(
            "{:>4}  {:<6} {:<24} {:>6} {:>6.2} {:>7}\n",
            p.rank,
            p.driver.as_str(),
            p.constructor.as_str(),
            slot(p.grid_position),
            p.predicted_score,
            slot(p.actual_position)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MalformedRow, MemorySource, RawEntry, SourceRows};
    use crate::predict::model::GridOrderModel;

    fn raw(round: u32, driver: &str, team: &str, grid: &str, pos: &str, points: &str) -> RawEntry {
        RawEntry {
            year: Some("2023".into()),
            round: Some(round.to_string()),
            race_name: Some(format!("Race {}", round)),
            driver: Some(driver.into()),
            constructor: Some(team.into()),
            grid_position: Some(grid.into()),
            position: Some(pos.into()),
            points: Some(points.into()),
            air_temp: Some("22.0".into()),
            track_temp: Some("35.0".into()),
            humidity: Some("40.0".into()),
            rainfall: Some("False".into()),
            ..Default::default()
        }
    }

    fn context() -> RaceContext {
        let source = MemorySource::new(vec![
            raw(1, "VER", "Red Bull", "1", "1", "25"),
            raw(1, "HAM", "Mercedes", "2", "2", "18"),
            raw(1, "LEC", "Ferrari", "3", "", "0"),
            raw(2, "VER", "Red Bull", "0", "1", "25"),
            raw(2, "HAM", "Mercedes", "1", "", "0"),
            raw(2, "LEC", "Ferrari", "2", "2", "18"),
        ]);
        let (context, report) = RaceContext::load(&source, &Config::default()).unwrap();
        assert_eq!(report.admitted, 6);
        context
    }

    #[test]
    fn test_predict_race_ranks_by_score() {
        let predictor = RacePredictor::new(context(), Arc::new(GridOrderModel));
        let race = predictor.predict_race(2023, 2).unwrap();

        assert_eq!(race.label(), "2023 Race 2");
        assert_eq!(race.model, "grid-order");
        let order: Vec<_> = race.predictions.iter().map(|p| p.driver.as_str()).collect();
        // VER started from the pit lane, imputed to 20
        assert_eq!(order, vec!["HAM", "LEC", "VER"]);
        assert_eq!(race.predictions[0].actual_position, None);
        assert_eq!(race.predictions[2].actual_position, Some(1));
    }

    struct PartlyReadable;

    impl EntrySource for PartlyReadable {
        fn describe(&self) -> String {
            "partly readable rows".to_string()
        }

        fn load(&self) -> Result<SourceRows> {
            let mut good = raw(1, "VER", "Red Bull", "1", "1", "25");
            good.line = 2;
            let mut bad_id = raw(1, "", "Ferrari", "3", "3", "15");
            bad_id.line = 4;
            Ok(SourceRows {
                rows: vec![good, bad_id],
                malformed: vec![MalformedRow {
                    line: 3,
                    reason: "unreadable record".to_string(),
                }],
            })
        }
    }

    #[test]
    fn test_load_reports_unreadable_records() {
        let (context, report) = RaceContext::load(&PartlyReadable, &Config::default()).unwrap();
        assert_eq!(context.store.len(), 1);
        assert_eq!(report.admitted, 1);
        let lines: Vec<usize> = report.malformed.iter().map(|m| m.line).collect();
        assert_eq!(lines, vec![3, 4]);
    }

    #[test]
    fn test_predict_latest_uses_last_round() {
        let predictor = RacePredictor::new(context(), Arc::new(GridOrderModel));
        assert_eq!(predictor.predict_latest(2023).unwrap().round, 2);
    }

    #[test]
    fn test_missing_race_is_not_found() {
        let predictor = RacePredictor::new(context(), Arc::new(GridOrderModel));
        assert!(matches!(
            predictor.predict_race(2023, 9),
            Err(RaceformError::MissingData { round: Some(9), .. })
        ));
        assert!(matches!(
            predictor.predict_latest(1999),
            Err(RaceformError::MissingData { round: None, .. })
        ));
    }

    #[test]
    fn test_no_model_is_unavailable() {
        let predictor = RacePredictor::without_model(context());
        assert!(matches!(
            predictor.predict_race(2023, 1),
            Err(RaceformError::PredictorUnavailable(_))
        ));
    }

    #[test]
    fn test_predict_season() {
        let predictor = RacePredictor::new(context(), Arc::new(GridOrderModel));
        let races = predictor.predict_season(2023).unwrap();
        assert_eq!(races.len(), 2);
    }

    #[test]
    fn test_evaluate_season() {
        let predictor = RacePredictor::new(context(), Arc::new(GridOrderModel));
        let quality = predictor.evaluate_season(2023).unwrap();
        // Classified (rank/actual): VER 1/1, HAM 2/2, LEC 2/2, VER 3/1
        assert_eq!(quality.samples, 4);
        assert_eq!(quality.exact_hits, 3);
        assert!(matches!(
            predictor.evaluate_season(2020),
            Err(RaceformError::MissingData { .. })
        ));
    }

    #[test]
    fn test_format_prediction() {
        let predictor = RacePredictor::new(context(), Arc::new(GridOrderModel));
        let table = format_prediction(&predictor.predict_race(2023, 1).unwrap());
        assert!(table.contains("2023 Race 1 (grid-order)"));
        let rows: Vec<&str> = table.lines().filter(|l| l.contains("Mercedes")).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].trim_start().starts_with("2  HAM"));
    }
}
