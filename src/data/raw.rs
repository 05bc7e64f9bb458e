//! Raw entrant rows as delivered by the data source, and numeric coercion
//!
//! Every field is kept as optional text; nothing is interpreted until the
//! Entry Store admits the row.

use serde::Deserialize;

use crate::{ConstructorId, DriverId, RaceEntry, Weather};

/// One entrant row before coercion
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawEntry {
    /// 1-based data line in the source, for reporting
    #[serde(skip)]
    pub line: usize,
    #[serde(rename = "Year", default)]
    pub year: Option<String>,
    #[serde(rename = "RoundNumber", default)]
    pub round: Option<String>,
    #[serde(rename = "RaceName", default)]
    pub race_name: Option<String>,
    #[serde(rename = "Abbreviation", default)]
    pub driver: Option<String>,
    #[serde(rename = "FullName", default)]
    pub driver_name: Option<String>,
    #[serde(rename = "TeamName", default)]
    pub constructor: Option<String>,
    #[serde(rename = "GridPosition", default)]
    pub grid_position: Option<String>,
    #[serde(rename = "Position", default)]
    pub position: Option<String>,
    #[serde(rename = "Points", default)]
    pub points: Option<String>,
    #[serde(rename = "AirTemp", default)]
    pub air_temp: Option<String>,
    #[serde(rename = "TrackTemp", default)]
    pub track_temp: Option<String>,
    #[serde(rename = "Humidity", default)]
    pub humidity: Option<String>,
    #[serde(rename = "Rainfall", default)]
    pub rainfall: Option<String>,
}

/// Why a row could not be admitted
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedRow {
    pub line: usize,
    pub reason: String,
}

/// Parse a real number; empty, non-numeric and non-finite text is missing
pub fn coerce_number(value: Option<&str>) -> Option<f64> {
    let text = value?.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a non-negative integer, accepting integral reals such as "3.0"
pub fn coerce_count(value: Option<&str>) -> Option<u32> {
    let v = coerce_number(value)?;
    if v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
        return None;
    }
    Some(v as u32)
}

/// Parse a positional field; zero means no classified position
pub fn coerce_position(value: Option<&str>) -> Option<u32> {
    coerce_count(value).filter(|p| *p > 0)
}

/// Rain flag: true for boolean-true text or any positive magnitude
pub fn coerce_rainfall(value: Option<&str>) -> bool {
    let Some(text) = value.map(str::trim) else {
        return false;
    };
    match text.to_lowercase().as_str() {
        "true" | "yes" => true,
        _ => coerce_number(Some(text)).map_or(false, |v| v > 0.0),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl RawEntry {
    /// Coerce into a typed entry, or report why the row is unusable
    pub fn normalize(&self) -> std::result::Result<RaceEntry, MalformedRow> {
        let malformed = |reason: &str| MalformedRow {
            line: self.line,
            reason: reason.to_string(),
        };

        let year = coerce_count(self.year.as_deref())
            .filter(|y| *y <= u16::MAX as u32)
            .ok_or_else(|| malformed("missing or invalid Year"))? as u16;
        let round = coerce_position(self.round.as_deref())
            .ok_or_else(|| malformed("missing or invalid RoundNumber"))?;
        let driver = non_empty(self.driver.as_deref())
            .ok_or_else(|| malformed("missing driver Abbreviation"))?;
        let constructor = non_empty(self.constructor.as_deref())
            .ok_or_else(|| malformed("missing TeamName"))?;

        Ok(RaceEntry {
            year,
            round,
            driver: DriverId(driver),
            constructor: ConstructorId(constructor),
            grid_position: coerce_position(self.grid_position.as_deref()),
            finish_position: coerce_position(self.position.as_deref()),
            points: coerce_number(self.points.as_deref()).filter(|p| *p >= 0.0),
            weather: Weather {
                air_temp: coerce_number(self.air_temp.as_deref()),
                track_temp: coerce_number(self.track_temp.as_deref()),
                humidity: coerce_number(self.humidity.as_deref()),
                rainfall: coerce_rainfall(self.rainfall.as_deref()),
            },
            race_name: non_empty(self.race_name.as_deref()),
            driver_name: non_empty(self.driver_name.as_deref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(driver: &str, team: &str) -> RawEntry {
        RawEntry {
            line: 2,
            year: Some("2023".into()),
            round: Some("5".into()),
            driver: Some(driver.into()),
            constructor: Some(team.into()),
            grid_position: Some("3.0".into()),
            position: Some("1.0".into()),
            points: Some("25.0".into()),
            air_temp: Some("24.1".into()),
            track_temp: Some("38.6".into()),
            humidity: Some("51.0".into()),
            rainfall: Some("False".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(Some(" 12.5 ")), Some(12.5));
        assert_eq!(coerce_number(Some("")), None);
        assert_eq!(coerce_number(Some("DNF")), None);
        assert_eq!(coerce_number(Some("NaN")), None);
        assert_eq!(coerce_number(None), None);
    }

    #[test]
    fn test_coerce_position() {
        assert_eq!(coerce_position(Some("3.0")), Some(3));
        assert_eq!(coerce_position(Some("0")), None);
        assert_eq!(coerce_position(Some("2.5")), None);
        assert_eq!(coerce_position(Some("-1")), None);
        assert_eq!(coerce_position(Some("R")), None);
    }

    #[test]
    fn test_coerce_rainfall() {
        assert!(coerce_rainfall(Some("True")));
        assert!(coerce_rainfall(Some("true")));
        assert!(coerce_rainfall(Some("0.4")));
        assert!(!coerce_rainfall(Some("False")));
        assert!(!coerce_rainfall(Some("0")));
        assert!(!coerce_rainfall(Some("")));
        assert!(!coerce_rainfall(None));
    }

    #[test]
    fn test_normalize_full_row() {
        let entry = raw("VER", "Red Bull Racing").normalize().unwrap();
        assert_eq!(entry.year, 2023);
        assert_eq!(entry.round, 5);
        assert_eq!(entry.driver, DriverId::new("VER"));
        assert_eq!(entry.grid_position, Some(3));
        assert_eq!(entry.finish_position, Some(1));
        assert_eq!(entry.points, Some(25.0));
        assert!(!entry.weather.rainfall);
        assert!(entry.is_training_eligible());
    }

    #[test]
    fn test_non_finish_is_kept_as_missing() {
        let mut row = raw("SAR", "Williams");
        row.position = Some("".into());
        row.points = Some("0.0".into());
        let entry = row.normalize().unwrap();
        assert_eq!(entry.finish_position, None);
        assert_eq!(entry.points, Some(0.0));
        assert!(!entry.is_classified());
    }

    #[test]
    fn test_missing_keys_are_malformed() {
        let mut row = raw("HAM", "Mercedes");
        row.driver = Some("  ".into());
        let err = row.normalize().unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.reason.contains("Abbreviation"));

        let mut row = raw("HAM", "Mercedes");
        row.round = Some("0".into());
        assert!(row.normalize().is_err());

        let mut row = raw("HAM", "Mercedes");
        row.year = None;
        assert!(row.normalize().is_err());
    }
}
