//! Form Index: trailing rolling points average per entity
//!
//! For an entity `e` and race `(year, round)`, form is the mean points of
//! `e`'s most recent prior entries in the same season (window 5 by default).
//! Only entries with `round < r` are visible, so a value never depends on the
//! race it is used to predict or on anything after it.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::data::EntryStore;
use crate::{EntityKey, FormConfig, RaceEntry};

/// A form value together with the number of points values behind it
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FormValue {
    pub value: f64,
    /// Valid points values averaged; 0 means no usable history
    pub observations: usize,
}

impl FormValue {
    pub fn has_history(&self) -> bool {
        self.observations > 0
    }
}

/// One entity's season, sorted by round
///
/// Two entries in the same round (a constructor's two cars) keep their
/// arrival order, and both enter the window from the next round on.
#[derive(Debug, Clone, Default)]
struct Series {
    rounds: Vec<u32>,
    points: Vec<Option<f64>>,
}

impl Series {
    fn from_pairs(mut pairs: Vec<(u32, Option<f64>)>) -> Self {
        // Stable: same-round entries stay in arrival order
        pairs.sort_by_key(|(round, _)| *round);
        let (rounds, points) = pairs.into_iter().unzip();
        Series { rounds, points }
    }

    fn form_before(&self, round: u32, config: &FormConfig) -> FormValue {
        let end = self.rounds.partition_point(|r| *r < round);
        let start = end.saturating_sub(config.window);

        let (sum, count) = self.points[start..end]
            .iter()
            .flatten()
            .fold((0.0, 0usize), |(sum, count), p| (sum + p, count + 1));

        if count < config.min_periods {
            FormValue {
                value: 0.0,
                observations: count,
            }
        } else {
            FormValue {
                value: sum / count as f64,
                observations: count,
            }
        }
    }
}

/// Rolling form for every (entity, season) in a store snapshot
#[derive(Debug, Clone)]
pub struct FormIndex {
    config: FormConfig,
    series: HashMap<(EntityKey, u16), Series>,
}

impl FormIndex {
    /// Build from a store snapshot; seasons are independent and built in parallel
    pub fn build(store: &EntryStore, config: FormConfig) -> Self {
        let seasons = store.seasons();
        let series: HashMap<(EntityKey, u16), Series> = seasons
            .par_iter()
            .flat_map_iter(|&year| Self::build_season(year, &store.season(year)))
            .collect();

        log::info!(
            "Built form index: {} entity-seasons over {} seasons (window {}, min {})",
            series.len(),
            seasons.len(),
            config.window,
            config.min_periods
        );

        FormIndex { config, series }
    }

    fn build_season(year: u16, entries: &[&RaceEntry]) -> Vec<((EntityKey, u16), Series)> {
        // Group in first-seen order so same-round ties keep arrival order
        let mut order: Vec<EntityKey> = Vec::new();
        let mut groups: HashMap<EntityKey, Vec<(u32, Option<f64>)>> = HashMap::new();

        for entry in entries {
            for key in [entry.driver_key(), entry.constructor_key()] {
                let group = groups.entry(key.clone()).or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                });
                group.push((entry.round, entry.points));
            }
        }

        order
            .into_iter()
            .filter_map(|key| {
                let pairs = groups.remove(&key)?;
                Some(((key, year), Series::from_pairs(pairs)))
            })
            .collect()
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Form for an entity going into `round` of `year`; 0 without prior races
    pub fn form(&self, key: &EntityKey, year: u16, round: u32) -> f64 {
        self.form_value(key, year, round).value
    }

    pub fn form_value(&self, key: &EntityKey, year: u16, round: u32) -> FormValue {
        self.series
            .get(&(key.clone(), year))
            .map(|s| s.form_before(round, &self.config))
            .unwrap_or_default()
    }

    /// Driver and constructor form for the race an entry belongs to
    pub fn form_for_entry(&self, entry: &RaceEntry) -> (FormValue, FormValue) {
        (
            self.form_value(&entry.driver_key(), entry.year, entry.round),
            self.form_value(&entry.constructor_key(), entry.year, entry.round),
        )
    }

    /// Number of (entity, season) series held
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
