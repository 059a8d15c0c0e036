use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Number of forecast points the dashboard shows.
pub const DISPLAY_POINTS: usize = 7;

/// A named geographic position. Replaced wholesale whenever the selection changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    /// Name used when reverse geocoding finds nothing for a coordinate pair.
    pub fn unnamed(latitude: f64, longitude: f64) -> Self {
        Self::new(
            format!("Location at {latitude:.2}, {longitude:.2}"),
            latitude,
            longitude,
        )
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new("Jalandhar, Punjab, India", 31.326, 75.576)
    }
}

/// Normalized current conditions, independent of upstream field naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CurrentConditions {
    pub location: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub description: String,
    pub icon_code: String,
    pub observed_at_epoch_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct ForecastSeries {
    pub points: Vec<CurrentConditions>,
}

impl ForecastSeries {
    /// The leading points shown on the dashboard.
    pub fn display_points(&self) -> &[CurrentConditions] {
        let end = self.points.len().min(DISPLAY_POINTS);
        &self.points[..end]
    }

    pub fn truncated(mut self, limit: usize) -> Self {
        self.points.truncate(limit);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    #[default]
    Moderate,
    Severe,
    Extreme,
}

impl FromStr for Severity {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minor" => Ok(Self::Minor),
            "moderate" => Ok(Self::Moderate),
            "severe" => Ok(Self::Severe),
            "extreme" => Ok(Self::Extreme),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

/// Broad category of an alert, derived from its event text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Precipitation,
    Frost,
    Wind,
    General,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    pub event: String,
    pub description: String,
    pub start_epoch_seconds: i64,
    pub end_epoch_seconds: i64,
    pub severity: Severity,
}

impl Alert {
    /// Upstream does not guarantee `start <= end`.
    pub fn is_well_formed(&self) -> bool {
        self.start_epoch_seconds <= self.end_epoch_seconds
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self.severity, Severity::Severe | Severity::Extreme)
    }

    pub fn kind(&self) -> AlertKind {
        let event = self.event.to_lowercase();
        if ["rain", "storm", "flood"].iter().any(|k| event.contains(k)) {
            AlertKind::Precipitation
        } else if ["snow", "ice", "frost"].iter().any(|k| event.contains(k)) {
            AlertKind::Frost
        } else if event.contains("wind") {
            AlertKind::Wind
        } else {
            AlertKind::General
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Suitability {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CropRecommendation {
    pub crop_name: String,
    pub suitability: Suitability,
    pub reason: String,
}

/// Interface language, persisted alongside the selected location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Fr,
    De,
    Zh,
    Ar,
    Ru,
    Ja,
    Hi,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Language::En,
        Language::Es,
        Language::Fr,
        Language::De,
        Language::Zh,
        Language::Ar,
        Language::Ru,
        Language::Ja,
        Language::Hi,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::De => "de",
            Language::Zh => "zh",
            Language::Ar => "ar",
            Language::Ru => "ru",
            Language::Ja => "ja",
            Language::Hi => "hi",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or(UnknownValue(code))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized value: {0}")]
pub struct UnknownValue(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions(temp: f64) -> CurrentConditions {
        CurrentConditions {
            location: "Test".to_string(),
            temperature_c: temp,
            feels_like_c: temp,
            humidity_pct: 50,
            wind_speed_mps: 1.0,
            description: "clear sky".to_string(),
            icon_code: "01d".to_string(),
            observed_at_epoch_seconds: 1_700_000_000,
        }
    }

    fn alert(event: &str, severity: Severity) -> Alert {
        Alert {
            event: event.to_string(),
            description: String::new(),
            start_epoch_seconds: 100,
            end_epoch_seconds: 200,
            severity,
        }
    }

    #[test]
    fn test_language_parse_all_codes() {
        for lang in Language::ALL {
            assert_eq!(lang.code().parse::<Language>().unwrap(), lang);
        }
        assert_eq!(" FR ".parse::<Language>().unwrap(), Language::Fr);
        assert!("pt".parse::<Language>().is_err());
    }

    #[test]
    fn test_language_serializes_as_code() {
        assert_eq!(serde_json::to_string(&Language::Hi).unwrap(), "\"hi\"");
        assert_eq!(Language::default(), Language::En);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("Severe".parse::<Severity>().unwrap(), Severity::Severe);
        assert!("unknown".parse::<Severity>().is_err());
        assert_eq!(Severity::default(), Severity::Moderate);
    }

    #[test]
    fn test_alert_kind_from_event() {
        assert_eq!(alert("Heavy Rain", Severity::Minor).kind(), AlertKind::Precipitation);
        assert_eq!(alert("Flood Watch", Severity::Minor).kind(), AlertKind::Precipitation);
        assert_eq!(alert("Frost Advisory", Severity::Minor).kind(), AlertKind::Frost);
        assert_eq!(alert("Strong Winds", Severity::Minor).kind(), AlertKind::Wind);
        assert_eq!(alert("Heat", Severity::Minor).kind(), AlertKind::General);
    }

    #[test]
    fn test_alert_destructive_and_well_formed() {
        assert!(alert("x", Severity::Extreme).is_destructive());
        assert!(!alert("x", Severity::Moderate).is_destructive());

        let mut inverted = alert("x", Severity::Minor);
        inverted.start_epoch_seconds = 300;
        assert!(!inverted.is_well_formed());
    }

    #[test]
    fn test_forecast_display_points() {
        let series = ForecastSeries {
            points: (0..40).map(|i| conditions(i as f64)).collect(),
        };
        assert_eq!(series.display_points().len(), DISPLAY_POINTS);
        assert_eq!(series.display_points()[6].temperature_c, 6.0);

        let short = ForecastSeries {
            points: vec![conditions(1.0)],
        };
        assert_eq!(short.display_points().len(), 1);
        assert_eq!(series.truncated(3).points.len(), 3);
    }

    #[test]
    fn test_unnamed_location() {
        let loc = Location::unnamed(31.32612, -75.5);
        assert_eq!(loc.name, "Location at 31.33, -75.50");
    }
}
