//! Race-day feature vectors for position prediction
//!
//! Joins an entrant's static race attributes (grid slot, weather) with its
//! current driver and constructor form.

use serde::Serialize;

use crate::features::form::FormIndex;
use crate::{FeatureConfig, RaceEntry, RaceformError, Result, Weather};

/// Model input for one entrant, in fixed order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    /// Grid slot, imputed for pit-lane or unrecorded starts
    pub grid_position: f64,
    pub driver_form: f64,
    pub constructor_form: f64,
    pub air_temp: f64,
    pub track_temp: f64,
    pub humidity: f64,
    /// 1.0 if wet, 0.0 otherwise
    pub rainfall: f64,
}

impl FeatureVector {
    /// Number of features
    pub const DIM: usize = 7;

    /// Column names, matching `to_vec` order
    pub const NAMES: [&'static str; Self::DIM] = [
        "GridPosition",
        "driver_form",
        "constructor_form",
        "AirTemp",
        "TrackTemp",
        "Humidity",
        "Rainfall",
    ];

    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.grid_position,
            self.driver_form,
            self.constructor_form,
            self.air_temp,
            self.track_temp,
            self.humidity,
            self.rainfall,
        ]
    }
}

/// The single weather reading shared by every entrant of a race
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RaceWeather {
    pub air_temp: f64,
    pub track_temp: f64,
    pub humidity: f64,
    pub rainfall: bool,
}

impl RaceWeather {
    /// A complete reading, or None if any value is missing
    pub fn from_observation(weather: &Weather) -> Option<Self> {
        Some(RaceWeather {
            air_temp: weather.air_temp?,
            track_temp: weather.track_temp?,
            humidity: weather.humidity?,
            rainfall: weather.rainfall,
        })
    }

    /// First observation in entrant order with air and track temperature.
    ///
    /// Humidity comes from that observation, else from the first entrant
    /// reporting it, else `fallback_humidity`.
    pub fn representative(entrants: &[&RaceEntry], fallback_humidity: f64) -> Option<Self> {
        let weather = &entrants
            .iter()
            .find(|e| e.weather.air_temp.is_some() && e.weather.track_temp.is_some())?
            .weather;
        let humidity = weather
            .humidity
            .or_else(|| entrants.iter().find_map(|e| e.weather.humidity))
            .unwrap_or(fallback_humidity);

        Some(RaceWeather {
            air_temp: weather.air_temp?,
            track_temp: weather.track_temp?,
            humidity,
            rainfall: weather.rainfall,
        })
    }
}

/// Grid slot used as a feature; pit-lane and unknown starts take the
/// configured back-of-field slot
pub fn imputed_grid(entry: &RaceEntry, config: &FeatureConfig) -> f64 {
    match entry.grid_position {
        Some(grid) => grid as f64,
        None => config.grid_imputation as f64,
    }
}

/// Builds feature vectors for the entrants of one race
pub struct FeatureAssembler<'a> {
    form: &'a FormIndex,
    config: FeatureConfig,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(form: &'a FormIndex, config: FeatureConfig) -> Self {
        FeatureAssembler { form, config }
    }

    /// One vector per entrant, in entrant order.
    ///
    /// Fails when no entrant has both air and track temperature or no entrant
    /// has a recorded grid slot; individual gaps are imputed.
    pub fn assemble(&self, entrants: &[&RaceEntry]) -> Result<Vec<FeatureVector>> {
        let Some(first) = entrants.first() else {
            return Ok(Vec::new());
        };
        let (year, round) = (first.year, first.round);

        if entrants.iter().all(|e| e.weather.humidity.is_none()) {
            log::debug!(
                "{} round {}: no humidity recorded, imputed to {}",
                year,
                round,
                self.config.humidity_imputation
            );
        }
        let weather = RaceWeather::representative(entrants, self.config.humidity_imputation)
            .ok_or_else(|| RaceformError::Assembly {
                year,
                round,
                reason: "no air and track temperature recorded".to_string(),
            })?;

        if entrants.iter().all(|e| e.grid_position.is_none()) {
            return Err(RaceformError::Assembly {
                year,
                round,
                reason: "no grid positions recorded".to_string(),
            });
        }

        let vectors = entrants
            .iter()
            .map(|entry| self.vector_for(entry, &weather))
            .collect();
        Ok(vectors)
    }

    /// Vector for one entrant with a given race weather
    pub fn vector_for(&self, entry: &RaceEntry, weather: &RaceWeather) -> FeatureVector {
        if entry.grid_position.is_none() {
            log::debug!(
                "{} {} round {}: grid imputed to {}",
                entry.driver,
                entry.year,
                entry.round,
                self.config.grid_imputation
            );
        }

        let (driver_form, constructor_form) = self.form.form_for_entry(entry);
        if !driver_form.has_history() {
            log::debug!(
                "{} has no prior races in {} before round {}; form 0",
                entry.driver,
                entry.year,
                entry.round
            );
        }

        FeatureVector {
            grid_position: imputed_grid(entry, &self.config),
            driver_form: driver_form.value,
            constructor_form: constructor_form.value,
            air_temp: weather.air_temp,
            track_temp: weather.track_temp,
            humidity: weather.humidity,
            rainfall: if weather.rainfall { 1.0 } else { 0.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EntryStore;
    use crate::{ConstructorId, DriverId, FormConfig};

    fn make_entry(
        round: u32,
        driver: &str,
        grid: Option<u32>,
        points: f64,
        weather: Weather,
    ) -> RaceEntry {
        RaceEntry {
            year: 2023,
            round,
            driver: DriverId::new(driver),
            constructor: ConstructorId::new("Team"),
            grid_position: grid,
            finish_position: Some(1),
            points: Some(points),
            weather,
            race_name: None,
            driver_name: None,
        }
    }

    fn dry() -> Weather {
        Weather {
            air_temp: Some(25.0),
            track_temp: Some(40.0),
            humidity: Some(50.0),
            rainfall: false,
        }
    }

    fn store_of(entries: Vec<RaceEntry>) -> EntryStore {
        let mut store = EntryStore::new();
        for e in entries {
            store.upsert(e);
        }
        store
    }

    #[test]
    fn test_vector_layout() {
        assert_eq!(FeatureVector::NAMES.len(), FeatureVector::DIM);
        let v = FeatureVector {
            grid_position: 3.0,
            driver_form: 12.0,
            constructor_form: 9.5,
            air_temp: 25.0,
            track_temp: 40.0,
            humidity: 50.0,
            rainfall: 1.0,
        };
        let flat = v.to_vec();
        assert_eq!(flat.len(), FeatureVector::DIM);
        assert_eq!(flat[0], 3.0);
        assert_eq!(flat[6], 1.0);
    }

    #[test]
    fn test_assemble_with_form_and_imputation() {
        let store = store_of(vec![
            make_entry(1, "A", Some(1), 25.0, dry()),
            make_entry(1, "B", Some(2), 18.0, dry()),
            make_entry(2, "A", None, 0.0, Weather::default()),
            make_entry(2, "B", Some(1), 25.0, dry()),
        ]);
        let form = FormIndex::build(&store, FormConfig::default());
        let assembler = FeatureAssembler::new(&form, FeatureConfig::default());

        let race = store.race(2023, 2);
        let vectors = assembler.assemble(&race).unwrap();
        assert_eq!(vectors.len(), 2);

        // A: pit-lane start imputed, weather broadcast from B's observation
        assert_eq!(vectors[0].grid_position, 20.0);
        assert_eq!(vectors[0].driver_form, 25.0);
        assert_eq!(vectors[0].constructor_form, 21.5);
        assert_eq!(vectors[0].air_temp, 25.0);
        assert_eq!(vectors[0].track_temp, vectors[1].track_temp);

        assert_eq!(vectors[1].grid_position, 1.0);
        assert_eq!(vectors[1].driver_form, 18.0);
    }

    #[test]
    fn test_weather_is_first_observation() {
        let mut wet = dry();
        wet.rainfall = true;
        wet.air_temp = Some(14.0);
        let store = store_of(vec![
            make_entry(1, "A", Some(1), 0.0, wet),
            make_entry(1, "B", Some(2), 0.0, dry()),
        ]);
        let form = FormIndex::build(&store, FormConfig::default());
        let assembler = FeatureAssembler::new(&form, FeatureConfig::default());

        let vectors = assembler.assemble(&store.race(2023, 1)).unwrap();
        assert!(vectors.iter().all(|v| v.rainfall == 1.0 && v.air_temp == 14.0));
    }

    #[test]
    fn test_missing_weather_fails() {
        let store = store_of(vec![make_entry(1, "A", Some(1), 0.0, Weather::default())]);
        let form = FormIndex::build(&store, FormConfig::default());
        let assembler = FeatureAssembler::new(&form, FeatureConfig::default());

        let err = assembler.assemble(&store.race(2023, 1)).unwrap_err();
        assert!(matches!(err, RaceformError::Assembly { round: 1, .. }));
    }

    #[test]
    fn test_missing_humidity_is_imputed() {
        let mut no_humidity = dry();
        no_humidity.humidity = None;
        let store = store_of(vec![
            make_entry(1, "A", Some(1), 0.0, no_humidity),
            make_entry(1, "B", Some(2), 0.0, no_humidity),
        ]);
        let form = FormIndex::build(&store, FormConfig::default());
        let config = FeatureConfig::default();
        let assembler = FeatureAssembler::new(&form, config);

        let vectors = assembler.assemble(&store.race(2023, 1)).unwrap();
        assert!(vectors.iter().all(|v| v.humidity == config.humidity_imputation));
        assert!(vectors.iter().all(|v| v.air_temp == 25.0 && v.track_temp == 40.0));
    }

    #[test]
    fn test_humidity_from_later_entrant() {
        let mut no_humidity = dry();
        no_humidity.humidity = None;
        let mut humid = dry();
        humid.air_temp = None;
        humid.humidity = Some(80.0);
        let store = store_of(vec![
            make_entry(1, "A", Some(1), 0.0, no_humidity),
            make_entry(1, "B", Some(2), 0.0, humid),
        ]);
        let race = store.race(2023, 1);
        let weather = RaceWeather::representative(&race, 50.0).unwrap();
        assert_eq!(weather.humidity, 80.0);
        assert_eq!(weather.air_temp, 25.0);
    }

    #[test]
    fn test_missing_all_grid_fails() {
        let store = store_of(vec![
            make_entry(1, "A", None, 0.0, dry()),
            make_entry(1, "B", None, 0.0, dry()),
        ]);
        let form = FormIndex::build(&store, FormConfig::default());
        let assembler = FeatureAssembler::new(&form, FeatureConfig::default());
        assert!(assembler.assemble(&store.race(2023, 1)).is_err());
    }
}
