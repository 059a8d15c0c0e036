use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::analytics::placeholder_forecast;
use crate::fetch_error::FetchError;
use crate::generation::GenerationTracker;
use crate::models::{
    Alert, CropRecommendation, CurrentConditions, ForecastSeries, Language, Location,
    DISPLAY_POINTS,
};
use crate::recommendations;
use crate::services::SelectionService;
use crate::weather_fetcher::WeatherFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKey {
    Current,
    Forecast,
    Alerts,
}

/// Committed state of one dashboard view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Panel<T> {
    Loading,
    Ready {
        data: T,
        generation: u64,
        refreshed_at: DateTime<Utc>,
        /// True when `data` is a stand-in rather than provider output.
        synthetic: bool,
    },
    Failed {
        message: String,
        generation: u64,
    },
}

impl<T> Panel<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Panel::Ready { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn status(&self) -> PanelStatus {
        match self {
            Panel::Loading => PanelStatus::Loading,
            Panel::Ready { .. } => PanelStatus::Ready,
            Panel::Failed { .. } => PanelStatus::Failed,
        }
    }

    fn ready(data: T, generation: u64, synthetic: bool) -> Self {
        Panel::Ready {
            data,
            generation,
            refreshed_at: Utc::now(),
            synthetic,
        }
    }

    fn failed(error: &FetchError, generation: u64) -> Self {
        Panel::Failed {
            message: error.to_string(),
            generation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PanelStatus {
    Loading,
    Ready,
    Failed,
}

/// OpenAPI shape of a serialized [`Panel`].
///
/// `data`, `refreshed_at` and `synthetic` are present when ready, `message`
/// when failed, `generation` in both.
#[derive(ToSchema)]
#[aliases(
    CurrentPanel = PanelSchema<CurrentConditions>,
    ForecastPanel = PanelSchema<ForecastSeries>,
    AlertsPanel = PanelSchema<Vec<Alert>>
)]
pub struct PanelSchema<T> {
    pub status: PanelStatus,
    pub data: Option<T>,
    pub generation: Option<u64>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub synthetic: Option<bool>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DashboardSnapshot {
    pub location: Option<Location>,
    pub language: Language,
    #[schema(value_type = CurrentPanel)]
    pub current: Panel<CurrentConditions>,
    pub recommendations: Vec<CropRecommendation>,
    #[schema(value_type = ForecastPanel)]
    pub forecast: Panel<ForecastSeries>,
    #[schema(value_type = AlertsPanel)]
    pub alerts: Panel<Vec<Alert>>,
}

#[derive(Debug)]
struct DashboardState {
    location: Option<Location>,
    current: Panel<CurrentConditions>,
    recommendations: Vec<CropRecommendation>,
    forecast: Panel<ForecastSeries>,
    alerts: Panel<Vec<Alert>>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            location: None,
            current: Panel::Loading,
            recommendations: Vec::new(),
            forecast: Panel::Loading,
            alerts: Panel::Loading,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PanelGenerations {
    current: u64,
    forecast: u64,
    alerts: u64,
}

/// Panels committed by one refresh. Superseded panels are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub committed: usize,
    pub discarded: usize,
}

/// Latest committed weather views for the selected location.
///
/// Each panel is refreshed independently. A response is committed only if
/// no newer request for the same panel has started since it was issued.
#[derive(Clone)]
pub struct DashboardService {
    weather: WeatherFetcher,
    selection: SelectionService,
    generations: GenerationTracker<PanelKey>,
    state: Arc<RwLock<DashboardState>>,
    forecast_placeholder_on_error: bool,
}

impl DashboardService {
    pub fn new(
        weather: WeatherFetcher,
        selection: SelectionService,
        forecast_placeholder_on_error: bool,
    ) -> Self {
        Self {
            weather,
            selection,
            generations: GenerationTracker::new(),
            state: Arc::new(RwLock::new(DashboardState::default())),
            forecast_placeholder_on_error,
        }
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let language = self.selection.language().await;
        let state = self.state.read().await;

        let forecast = match &state.forecast {
            Panel::Ready {
                data,
                generation,
                refreshed_at,
                synthetic,
            } => Panel::Ready {
                data: data.clone().truncated(DISPLAY_POINTS),
                generation: *generation,
                refreshed_at: *refreshed_at,
                synthetic: *synthetic,
            },
            other => other.clone(),
        };

        DashboardSnapshot {
            location: state.location.clone(),
            language,
            current: state.current.clone(),
            recommendations: state.recommendations.clone(),
            forecast,
            alerts: state.alerts.clone(),
        }
    }

    /// Refreshes every panel for the location selected when the refresh starts.
    ///
    /// The selection is read, the panels reset and their generations taken
    /// under one state lock, so a refresh that starts later always supersedes
    /// this one regardless of which location either of them targets.
    #[instrument(skip(self))]
    pub async fn refresh_selected(&self) -> RefreshOutcome {
        let (location, generations) = {
            let mut state = self.state.write().await;
            let location = self.selection.location().await;
            if state.location.as_ref() != Some(&location) {
                debug!("Location changed to {}, resetting panels to loading", location.name);
                state.current = Panel::Loading;
                state.recommendations.clear();
                state.forecast = Panel::Loading;
                state.alerts = Panel::Loading;
                state.location = Some(location.clone());
            }

            let generations = PanelGenerations {
                current: self.generations.begin(&PanelKey::Current).await,
                forecast: self.generations.begin(&PanelKey::Forecast).await,
                alerts: self.generations.begin(&PanelKey::Alerts).await,
            };
            (location, generations)
        };

        let (current, forecast, alerts) = futures::join!(
            self.refresh_current(&location, generations.current),
            self.refresh_forecast(&location, generations.forecast),
            self.refresh_alerts(&location, generations.alerts),
        );
        let results = [current, forecast, alerts];
        let committed = results.iter().filter(|c| **c).count();
        let outcome = RefreshOutcome {
            committed,
            discarded: results.len() - committed,
        };

        info!(
            "Dashboard refresh for {}: {} panels committed, {} superseded",
            location.name, outcome.committed, outcome.discarded
        );
        outcome
    }

    async fn refresh_current(&self, location: &Location, generation: u64) -> bool {
        let result = self
            .weather
            .fetch_current_conditions(location.latitude, location.longitude)
            .await;

        let mut state = self.state.write().await;
        if !self.generations.is_latest(&PanelKey::Current, generation).await {
            debug!("Discarding superseded current conditions (generation {})", generation);
            return false;
        }

        match result {
            Ok(conditions) => {
                state.recommendations = recommendations::evaluate(&conditions);
                state.current = Panel::ready(conditions, generation, false);
            }
            Err(e) => {
                warn!("Current conditions panel failed: {}", e);
                state.recommendations.clear();
                state.current = Panel::failed(&e, generation);
            }
        }
        true
    }

    async fn refresh_forecast(&self, location: &Location, generation: u64) -> bool {
        let result = self
            .weather
            .fetch_forecast(location.latitude, location.longitude)
            .await;

        let mut state = self.state.write().await;
        if !self.generations.is_latest(&PanelKey::Forecast, generation).await {
            debug!("Discarding superseded forecast (generation {})", generation);
            return false;
        }

        state.forecast = match result {
            Ok(series) => Panel::ready(series, generation, false),
            Err(e) if self.forecast_placeholder_on_error => {
                warn!("Forecast panel failed, substituting placeholder: {}", e);
                Panel::ready(placeholder_for(location), generation, true)
            }
            Err(e) => {
                warn!("Forecast panel failed: {}", e);
                Panel::failed(&e, generation)
            }
        };
        true
    }

    async fn refresh_alerts(&self, location: &Location, generation: u64) -> bool {
        let result = self
            .weather
            .fetch_alerts(location.latitude, location.longitude)
            .await;

        let mut state = self.state.write().await;
        if !self.generations.is_latest(&PanelKey::Alerts, generation).await {
            debug!("Discarding superseded alerts (generation {})", generation);
            return false;
        }

        state.alerts = match result {
            Ok(alerts) => Panel::ready(alerts, generation, false),
            Err(e) => {
                warn!("Alerts panel failed: {}", e);
                Panel::failed(&e, generation)
            }
        };
        true
    }
}

fn placeholder_for(location: &Location) -> ForecastSeries {
    placeholder_forecast(&location.name, Utc::now().timestamp(), &mut rand::thread_rng())
}
