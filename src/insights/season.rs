//! Season Insights Aggregator
//!
//! Descriptive statistics for one season of entries. Every figure is defined
//! for any non-empty season; empty sub-populations resolve to 0 or None.
//! Ties go to whichever entity was seen first in arrival order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

use rayon::prelude::*;
use serde::Serialize;

use crate::data::EntryStore;
use crate::{ConstructorId, DriverId, RaceEntry, RaceformError, Result};

/// Running totals keyed by entity, remembering first-seen order
#[derive(Debug, Clone)]
struct Tally<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
    index: HashMap<K, usize>,
}

impl<K, V> Tally<K, V>
where
    K: Clone + Eq + Hash,
    V: Copy + Default + PartialOrd + std::ops::AddAssign,
{
    fn new() -> Self {
        Tally {
            keys: Vec::new(),
            values: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn add(&mut self, key: &K, amount: V) {
        let pos = match self.index.get(key) {
            Some(&pos) => pos,
            None => {
                self.index.insert(key.clone(), self.keys.len());
                self.keys.push(key.clone());
                self.values.push(V::default());
                self.keys.len() - 1
            }
        };
        self.values[pos] += amount;
    }

    /// Highest total; the first-seen key wins a tie
    fn leader(&self) -> Option<(K, V)> {
        let mut best: Option<usize> = None;
        for (i, value) in self.values.iter().enumerate() {
            if best.map_or(true, |b| *value > self.values[b]) {
                best = Some(i);
            }
        }
        best.map(|i| (self.keys[i].clone(), self.values[i]))
    }

    /// All totals, descending; ties keep first-seen order
    fn ranked(&self) -> Vec<(K, V)> {
        let mut rows: Vec<(K, V)> = self
            .keys
            .iter()
            .cloned()
            .zip(self.values.iter().copied())
            .collect();
        rows.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        rows
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverStanding {
    pub driver: DriverId,
    /// Team of the driver's latest entry in the season
    pub constructor: ConstructorId,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstructorStanding {
    pub constructor: ConstructorId,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OvertakingLeader {
    pub driver: DriverId,
    /// Sum of (grid - finish) over classified finishes
    pub positions_gained: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyLeader {
    pub driver: DriverId,
    pub top_ten_finishes: usize,
}

/// Wins from one starting slot; `grid_position` None = unclassified start
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridWins {
    pub grid_position: Option<u32>,
    pub wins: usize,
}

/// Non-finish rate split by conditions, in percent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RainImpact {
    pub dry_dnf_rate: Option<f64>,
    pub wet_dnf_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSummary {
    /// Mean over entries with a reading; None if no entry has one
    pub average_track_temp: Option<f64>,
    /// Distinct races with at least one entry flagged wet
    pub rainy_races: usize,
}

/// Season-wide descriptive statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonInsights {
    pub year: u16,
    pub entries: usize,
    pub races: usize,
    pub champion: DriverStanding,
    pub constructor_champion: ConstructorStanding,
    /// Percentage of won races won from pole, 1 decimal
    pub pole_to_win_rate: f64,
    pub races_with_winner: usize,
    /// Percentage of entries without a classified finish
    pub dnf_rate: f64,
    pub overtaking_leader: Option<OvertakingLeader>,
    pub consistency_leader: Option<ConsistencyLeader>,
    pub weather: WeatherSummary,
    pub rain_impact: RainImpact,
    pub winning_grid_positions: Vec<GridWins>,
    pub driver_standings: Vec<DriverStanding>,
    pub constructor_standings: Vec<ConstructorStanding>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn percentage(part: usize, whole: usize) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(100.0 * part as f64 / whole as f64)
    }
}

impl SeasonInsights {
    /// Insights for one season of the store
    pub fn for_season(store: &EntryStore, year: u16) -> Result<Self> {
        Self::from_entries(year, &store.season(year))
    }

    /// Insights from a season's entries in arrival order
    pub fn from_entries(year: u16, entries: &[&RaceEntry]) -> Result<Self> {
        if entries.is_empty() {
            return Err(RaceformError::MissingData { year, round: None });
        }

        let mut driver_points: Tally<DriverId, f64> = Tally::new();
        let mut constructor_points: Tally<ConstructorId, f64> = Tally::new();
        let mut gains: Tally<DriverId, i64> = Tally::new();
        let mut top_tens: Tally<DriverId, usize> = Tally::new();
        let mut latest_team: HashMap<&DriverId, (u32, &ConstructorId)> = HashMap::new();

        let mut winners: BTreeMap<u32, &RaceEntry> = BTreeMap::new();
        let mut rounds = BTreeSet::new();
        let mut rainy_rounds = BTreeSet::new();
        let mut dnfs = 0;
        let (mut wet, mut wet_dnfs, mut dry, mut dry_dnfs) = (0, 0, 0, 0);
        let (mut track_sum, mut track_count) = (0.0, 0usize);

        for entry in entries {
            rounds.insert(entry.round);
            driver_points.add(&entry.driver, entry.points_or_zero());
            constructor_points.add(&entry.constructor, entry.points_or_zero());

            let team = latest_team
                .entry(&entry.driver)
                .or_insert((entry.round, &entry.constructor));
            if entry.round >= team.0 {
                *team = (entry.round, &entry.constructor);
            }

            if let Some(gain) = entry.positions_gained() {
                gains.add(&entry.driver, gain);
            }
            if entry.finish_position.map_or(false, |p| p <= 10) {
                top_tens.add(&entry.driver, 1);
            }
            if entry.is_winner() {
                winners.entry(entry.round).or_insert(*entry);
            }

            let dnf = !entry.is_classified();
            if dnf {
                dnfs += 1;
            }
            if entry.weather.rainfall {
                rainy_rounds.insert(entry.round);
                wet += 1;
                wet_dnfs += dnf as usize;
            } else {
                dry += 1;
                dry_dnfs += dnf as usize;
            }
            if let Some(t) = entry.weather.track_temp {
                track_sum += t;
                track_count += 1;
            }
        }

        let driver_standings: Vec<DriverStanding> = driver_points
            .ranked()
            .into_iter()
            .map(|(driver, points)| {
                let constructor = latest_team
                    .get(&driver)
                    .map(|(_, c)| (*c).clone())
                    .unwrap_or_else(|| ConstructorId::new(""));
                DriverStanding {
                    driver,
                    constructor,
                    points,
                }
            })
            .collect();
        let constructor_standings: Vec<ConstructorStanding> = constructor_points
            .ranked()
            .into_iter()
            .map(|(constructor, points)| ConstructorStanding {
                constructor,
                points,
            })
            .collect();

        // Non-empty season: both tallies hold at least one key
        let champion = driver_points
            .leader()
            .and_then(|(driver, _)| driver_standings.iter().find(|s| s.driver == driver))
            .cloned()
            .ok_or(RaceformError::MissingData { year, round: None })?;
        let constructor_champion = constructor_points
            .leader()
            .map(|(constructor, points)| ConstructorStanding {
                constructor,
                points,
            })
            .ok_or(RaceformError::MissingData { year, round: None })?;

        let races_with_winner = winners.len();
        let wins_from_pole = winners
            .values()
            .filter(|w| w.grid_position == Some(1))
            .count();
        let pole_to_win_rate = percentage(wins_from_pole, races_with_winner)
            .map(round1)
            .unwrap_or(0.0);

        let mut grid_wins: BTreeMap<Option<u32>, usize> = BTreeMap::new();
        for winner in winners.values() {
            *grid_wins.entry(winner.grid_position).or_default() += 1;
        }
        let mut winning_grid_positions: Vec<GridWins> = grid_wins
            .into_iter()
            .map(|(grid_position, wins)| GridWins {
                grid_position,
                wins,
            })
            .collect();
        // Real grid slots first, unclassified starts last
        winning_grid_positions.sort_by_key(|g| (g.grid_position.is_none(), g.grid_position));

        let overtaking_leader = gains
            .leader()
            .map(|(driver, positions_gained)| OvertakingLeader {
                driver,
                positions_gained,
            });
        let consistency_leader = top_tens
            .leader()
            .map(|(driver, top_ten_finishes)| ConsistencyLeader {
                driver,
                top_ten_finishes,
            });

        let insights = SeasonInsights {
            year,
            entries: entries.len(),
            races: rounds.len(),
            champion,
            constructor_champion,
            pole_to_win_rate,
            races_with_winner,
            dnf_rate: percentage(dnfs, entries.len()).unwrap_or(0.0),
            overtaking_leader,
            consistency_leader,
            weather: WeatherSummary {
                average_track_temp: if track_count > 0 {
                    Some(track_sum / track_count as f64)
                } else {
                    None
                },
                rainy_races: rainy_rounds.len(),
            },
            rain_impact: RainImpact {
                dry_dnf_rate: percentage(dry_dnfs, dry),
                wet_dnf_rate: percentage(wet_dnfs, wet),
            },
            winning_grid_positions,
            driver_standings,
            constructor_standings,
        };

        log::debug!(
            "{} insights: {} entries, {} races, champion {}",
            year,
            insights.entries,
            insights.races,
            insights.champion.driver
        );
        Ok(insights)
    }
}

/// Insights for every stored season, computed in parallel, ascending by year
pub fn all_seasons(store: &EntryStore) -> Vec<SeasonInsights> {
    store
        .seasons()
        .par_iter()
        .filter_map(|&year| match SeasonInsights::for_season(store, year) {
            Ok(insights) => Some(insights),
            Err(e) => {
                log::warn!("Skipping season {}: {}", year, e);
                None
            }
        })
        .collect()
}
