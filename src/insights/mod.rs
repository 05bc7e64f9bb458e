//! Season insights
//!
//! Descriptive statistics over the stored history, independent of any model.

pub mod season;

pub use season::{
    all_seasons, ConsistencyLeader, ConstructorStanding, DriverStanding, GridWins,
    OvertakingLeader, RainImpact, SeasonInsights, WeatherSummary,
};
