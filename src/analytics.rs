//! Synthetic climate series.
//!
//! These are not physical models: monthly values come from fixed offsets
//! around a latitude/longitude-derived base plus uniform jitter. Randomness
//! is injected so callers (and tests) control reproducibility.

use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{CurrentConditions, ForecastSeries, Location, DISPLAY_POINTS};

pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// (avg, min, max) offsets from the base temperature, January first.
const TEMPERATURE_OFFSETS: [(f64, f64, f64); 12] = [
    (-15.0, -20.0, -10.0),
    (-13.0, -18.0, -8.0),
    (-10.0, -15.0, -5.0),
    (-5.0, -10.0, 0.0),
    (0.0, -5.0, 5.0),
    (5.0, 0.0, 10.0),
    (8.0, 3.0, 13.0),
    (7.0, 2.0, 12.0),
    (2.0, -3.0, 7.0),
    (-3.0, -8.0, 2.0),
    (-8.0, -13.0, -3.0),
    (-13.0, -18.0, -8.0),
];

const PRECIPITATION_OFFSETS: [f64; 12] = [
    0.0, -5.0, 10.0, 15.0, -10.0, -15.0, -20.0, -15.0, 0.0, 5.0, 20.0, 15.0,
];

const MAX_BASE_TEMPERATURE_C: f64 = 30.0;
const TEMPERATURE_JITTER_C: f64 = 3.0;
const BASE_PRECIPITATION_MM: f64 = 40.0;
const PRECIPITATION_SPAN_MM: f64 = 60.0;
const PRECIPITATION_JITTER_MM: f64 = 30.0;

const PLACEHOLDER_SKIES: [(&str, &str); 5] = [
    ("clear sky", "01d"),
    ("few clouds", "02d"),
    ("scattered clouds", "03d"),
    ("broken clouds", "04d"),
    ("light rain", "10d"),
];
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyTemperature {
    pub month: String,
    pub avg_c: f64,
    pub min_c: f64,
    pub max_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyPrecipitation {
    pub month: String,
    pub value_mm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClimateProfile {
    pub location: Location,
    pub year: i32,
    pub temperature: Vec<MonthlyTemperature>,
    pub precipitation: Vec<MonthlyPrecipitation>,
}

/// Base temperature: 30°C at the equator falling linearly to 0 at the poles.
pub fn base_temperature_c(latitude: f64) -> f64 {
    let latitude_factor = ((90.0 - latitude.abs()) / 90.0).max(0.0);
    latitude_factor * MAX_BASE_TEMPERATURE_C
}

/// Base precipitation: 40mm at the prime meridian up to 100mm at ±180°.
pub fn base_precipitation_mm(longitude: f64) -> f64 {
    let longitude_factor = longitude.abs() / 180.0;
    BASE_PRECIPITATION_MM + longitude_factor * PRECIPITATION_SPAN_MM
}

/// Twelve months of synthetic temperature and precipitation for a location.
/// `year` is carried as a label only.
pub fn climate_profile<R: Rng + ?Sized>(location: &Location, year: i32, rng: &mut R) -> ClimateProfile {
    let base_temp = base_temperature_c(location.latitude);
    let base_precip = base_precipitation_mm(location.longitude);

    let temperature = MONTHS
        .iter()
        .zip(TEMPERATURE_OFFSETS)
        .map(|(month, (avg, min, max))| MonthlyTemperature {
            month: month.to_string(),
            avg_c: base_temp + avg + rng.gen_range(0.0..TEMPERATURE_JITTER_C),
            min_c: base_temp + min + rng.gen_range(0.0..TEMPERATURE_JITTER_C),
            max_c: base_temp + max + rng.gen_range(0.0..TEMPERATURE_JITTER_C),
        })
        .collect();

    let precipitation = MONTHS
        .iter()
        .zip(PRECIPITATION_OFFSETS)
        .map(|(month, offset)| MonthlyPrecipitation {
            month: month.to_string(),
            value_mm: base_precip + offset + rng.gen_range(0.0..PRECIPITATION_JITTER_MM),
        })
        .collect();

    ClimateProfile {
        location: location.clone(),
        year,
        temperature,
        precipitation,
    }
}

/// Daily stand-in forecast used when the provider is unavailable and
/// placeholders are enabled.
pub fn placeholder_forecast<R: Rng + ?Sized>(
    location_name: &str,
    now_epoch_seconds: i64,
    rng: &mut R,
) -> ForecastSeries {
    let points = (0..DISPLAY_POINTS as i64)
        .map(|day| {
            let (description, icon) = PLACEHOLDER_SKIES[rng.gen_range(0..PLACEHOLDER_SKIES.len())];
            CurrentConditions {
                location: location_name.to_string(),
                temperature_c: rng.gen_range(20.0..30.0),
                feels_like_c: rng.gen_range(18.0..28.0),
                humidity_pct: rng.gen_range(50..80),
                wind_speed_mps: rng.gen_range(2.0..7.0),
                description: description.to_string(),
                icon_code: icon.to_string(),
                observed_at_epoch_seconds: now_epoch_seconds + day * SECONDS_PER_DAY,
            }
        })
        .collect();

    ForecastSeries { points }
}
