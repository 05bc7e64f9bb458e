//! Supervised samples for the offline position trainer
//!
//! Each training-eligible entry becomes one sample: its feature vector
//! (form computed from strictly earlier races) and its finishing position.

use std::path::Path;

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::EntryStore;
use crate::features::{FeatureAssembler, FeatureVector, FormIndex, RaceWeather};
use crate::{DriverId, FeatureConfig, Result, TrainingConfig};

/// One labelled entry
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub year: u16,
    pub round: u32,
    pub driver: DriverId,
    pub features: FeatureVector,
    pub target_position: u32,
}

/// How a train/test split was made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    /// Test set is one held-out season
    HeldOutSeason(u16),
    /// Held-out season too small; seeded shuffle
    Random { seed: u64 },
}

#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    samples: Vec<TrainingSample>,
}

impl TrainingSet {
    /// Samples from every eligible entry, in store order
    pub fn from_store(store: &EntryStore, form: &FormIndex, config: FeatureConfig) -> Self {
        let assembler = FeatureAssembler::new(form, config);
        let mut skipped = 0;

        let samples: Vec<TrainingSample> = store
            .entries()
            .iter()
            .filter_map(|entry| {
                let weather = RaceWeather::from_observation(&entry.weather);
                match (entry.is_training_eligible(), entry.finish_position, weather) {
                    (true, Some(target_position), Some(weather)) => Some(TrainingSample {
                        year: entry.year,
                        round: entry.round,
                        driver: entry.driver.clone(),
                        features: assembler.vector_for(entry, &weather),
                        target_position,
                    }),
                    _ => {
                        skipped += 1;
                        None
                    }
                }
            })
            .collect();

        log::info!(
            "Built {} training samples ({} entries not eligible)",
            samples.len(),
            skipped
        );
        TrainingSet { samples }
    }

    pub fn from_samples(samples: Vec<TrainingSample>) -> Self {
        TrainingSet { samples }
    }

    pub fn samples(&self) -> &[TrainingSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Train on seasons before the held-out season and test on it.
    ///
    /// Falls back to a seeded random split when the held-out season has
    /// fewer than `min_test_rows` samples.
    pub fn split(&self, config: &TrainingConfig) -> (TrainingSet, TrainingSet, SplitKind) {
        let (train, test): (Vec<_>, Vec<_>) = self
            .samples
            .iter()
            .filter(|s| s.year <= config.test_season)
            .cloned()
            .partition(|s| s.year < config.test_season);

        if test.len() >= config.min_test_rows {
            log::info!(
                "Split on season {}: train={}, test={}",
                config.test_season,
                train.len(),
                test.len()
            );
            return (
                TrainingSet::from_samples(train),
                TrainingSet::from_samples(test),
                SplitKind::HeldOutSeason(config.test_season),
            );
        }

        log::warn!(
            "Season {} has {} samples (< {}); using random split",
            config.test_season,
            test.len(),
            config.min_test_rows
        );

        let mut samples = self.samples.clone();
        let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed);
        samples.shuffle(&mut rng);

        let n_test = ((samples.len() as f64) * config.test_fraction).ceil() as usize;
        let train = samples.split_off(n_test.min(samples.len()));

        log::info!("Random split: train={}, test={}", train.len(), samples.len());
        (
            TrainingSet::from_samples(train),
            TrainingSet::from_samples(samples),
            SplitKind::Random { seed: config.seed },
        )
    }

    /// Write samples as CSV for the offline trainer
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec!["Year", "RoundNumber", "Abbreviation"];
        header.extend(FeatureVector::NAMES);
        header.push("Position");
        writer.write_record(&header)?;

        for sample in &self.samples {
            let mut record = vec![
                sample.year.to_string(),
                sample.round.to_string(),
                sample.driver.to_string(),
            ];
            record.extend(sample.features.to_vec().iter().map(|v| v.to_string()));
            record.push(sample.target_position.to_string());
            writer.write_record(&record)?;
        }
        writer.flush()?;

        log::info!("Wrote {} samples to {}", self.samples.len(), path.display());
        Ok(())
    }
}
