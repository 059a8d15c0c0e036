use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::UpstreamPolicy;
use crate::fetch_error::{FetchError, Operation};
use crate::models::{Alert, CurrentConditions, ForecastSeries, Severity};
use crate::upstream::{endpoint, UpstreamClient};

const CURRENT_PATH: &str = "/data/2.5/weather";
const FORECAST_PATH: &str = "/data/2.5/forecast";
const ONECALL_PATH: &str = "/data/2.5/onecall";
const ALERTS_EXCLUDE: &str = "current,minutely,hourly,daily";

// Upstream response schemas. Only the fields the normalized records need.

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    name: String,
    #[serde(flatten)]
    entry: ObservationEntry,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ObservationEntry>,
    city: City,
}

#[derive(Debug, Deserialize)]
struct City {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObservationEntry {
    main: MainBlock,
    wind: WindBlock,
    weather: Vec<WeatherBlock>,
    dt: i64,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherBlock {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OneCallResponse {
    #[serde(default)]
    alerts: Option<Vec<AlertEntry>>,
}

#[derive(Debug, Deserialize)]
struct AlertEntry {
    event: String,
    description: String,
    start: i64,
    end: i64,
    #[serde(default)]
    severity: Option<String>,
}

impl ObservationEntry {
    fn normalize(self, location: &str, operation: Operation) -> Result<CurrentConditions, FetchError> {
        let weather = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::schema(operation, "empty `weather` array"))?;

        Ok(CurrentConditions {
            location: location.to_string(),
            temperature_c: self.main.temp,
            feels_like_c: self.main.feels_like,
            humidity_pct: self.main.humidity,
            wind_speed_mps: self.wind.speed,
            description: weather.description,
            icon_code: weather.icon,
            observed_at_epoch_seconds: self.dt,
        })
    }
}

impl AlertEntry {
    fn normalize(self) -> Alert {
        let severity = match self.severity.as_deref() {
            None => Severity::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Unrecognized alert severity '{}', treating as moderate", raw);
                Severity::default()
            }),
        };

        Alert {
            event: self.event,
            description: self.description,
            start_epoch_seconds: self.start,
            end_epoch_seconds: self.end,
            severity,
        }
    }
}

/// Gateway to the weather provider. Each call is one logical request with no
/// caching or coalescing; the timeout and retry policy come from [`UpstreamPolicy`].
#[derive(Clone)]
pub struct WeatherFetcher {
    client: UpstreamClient,
    base_url: String,
    api_key: String,
}

impl WeatherFetcher {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        policy: UpstreamPolicy,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: UpstreamClient::new(policy)?,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn metric_query(&self, lat: f64, lon: f64) -> [(&'static str, String); 4] {
        [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("units", "metric".to_string()),
            ("appid", self.api_key.clone()),
        ]
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn fetch_current_conditions(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<CurrentConditions, FetchError> {
        let operation = Operation::CurrentConditions;
        let response: CurrentResponse = self
            .client
            .get_json(
                operation,
                &endpoint(&self.base_url, CURRENT_PATH),
                &self.metric_query(lat, lon),
            )
            .await?;

        let conditions = response.entry.normalize(&response.name, operation)?;
        debug!(
            "Current conditions for {}: {:.1}°C, {}% humidity",
            conditions.location, conditions.temperature_c, conditions.humidity_pct
        );
        Ok(conditions)
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<ForecastSeries, FetchError> {
        let operation = Operation::Forecast;
        let response: ForecastResponse = self
            .client
            .get_json(
                operation,
                &endpoint(&self.base_url, FORECAST_PATH),
                &self.metric_query(lat, lon),
            )
            .await?;

        let city = response.city.name;
        let points = response
            .list
            .into_iter()
            .map(|entry| entry.normalize(&city, operation))
            .collect::<Result<Vec<_>, _>>()?;

        info!("Fetched {} forecast points for {}", points.len(), city);
        Ok(ForecastSeries { points })
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn fetch_alerts(&self, lat: f64, lon: f64) -> Result<Vec<Alert>, FetchError> {
        let query = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("exclude", ALERTS_EXCLUDE.to_string()),
            ("appid", self.api_key.clone()),
        ];
        let response: OneCallResponse = self
            .client
            .get_json(
                Operation::Alerts,
                &endpoint(&self.base_url, ONECALL_PATH),
                &query,
            )
            .await?;

        let Some(entries) = response.alerts else {
            debug!("No alerts field in response");
            return Ok(Vec::new());
        };

        let alerts: Vec<Alert> = entries.into_iter().map(AlertEntry::normalize).collect();
        let malformed = alerts.iter().filter(|a| !a.is_well_formed()).count();
        if malformed > 0 {
            warn!("{} alerts end before they start", malformed);
        }
        info!("Fetched {} alerts", alerts.len());
        Ok(alerts)
    }
}
