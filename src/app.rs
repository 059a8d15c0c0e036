use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::{create_router, AppState};
use crate::assistant::AssistantClient;
use crate::config::Config;
use crate::geocode_fetcher::GeocodeFetcher;
use crate::preferences::PreferenceStore;
use crate::scheduler;
use crate::services::{DashboardService, SelectionService};
use crate::weather_fetcher::WeatherFetcher;

/// Application with its spawned background task and server.
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
    pub refresh_scheduler_handle: JoinHandle<()>,
}

impl Application {
    /// Builds the shared state and spawns:
    /// - HTTP API server (Axum)
    /// - Dashboard refresh scheduler
    pub async fn build(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        // Selection state, restored from disk
        let store = PreferenceStore::new(config.preferences_path.clone());
        let store_path = store.path().display().to_string();
        let selection = SelectionService::load(store).await?;
        let restored = selection.preferences().await;
        info!(
            "Restored selection {} ({}, {}), language {} from {}",
            restored.location.name,
            restored.location.latitude,
            restored.location.longitude,
            restored.language,
            store_path
        );

        // Upstream clients
        let weather = WeatherFetcher::new(
            config.openweather_base_url.clone(),
            config.openweather_api_key.clone(),
            config.upstream.clone(),
        )?;
        let geocoder = GeocodeFetcher::new(
            config.openweather_base_url.clone(),
            config.openweather_api_key.clone(),
            config.upstream.clone(),
        )?;
        let assistant = match &config.gemini_api_key {
            Some(key) => Some(AssistantClient::new(
                config.gemini_base_url.clone(),
                config.gemini_model.clone(),
                key.clone(),
                config.upstream.clone(),
            )?),
            None => {
                warn!("GEMINI_API_KEY not set, assistant endpoint disabled");
                None
            }
        };

        let dashboard = DashboardService::new(
            weather.clone(),
            selection.clone(),
            config.forecast_placeholder_on_error,
        );

        // The first tick fires immediately, which performs the initial refresh.
        let refresh_scheduler_handle = {
            let dashboard = dashboard.clone();
            let interval = config.refresh_interval_minutes;
            tokio::spawn(async move {
                scheduler::start_refresh_scheduler(dashboard, interval).await;
            })
        };

        let app_state = AppState {
            weather,
            geocoder,
            assistant,
            selection,
            dashboard,
        };
        let app = create_router(app_state).layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);

        let server_handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await
        });

        info!("Application initialized successfully");

        Ok(Self {
            server_handle,
            refresh_scheduler_handle,
        })
    }

    /// Runs until the server stops. The scheduler runs in the background.
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        self.refresh_scheduler_handle.abort();
        Ok(())
    }
}
