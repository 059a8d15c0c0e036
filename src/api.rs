use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::analytics::{self, ClimateProfile, MonthlyPrecipitation, MonthlyTemperature};
use crate::assistant::{AssistantClient, AssistantError, ChatMessage};
use crate::fetch_error::FetchError;
use crate::geocode_fetcher::{GeocodeFetcher, LocationMatch};
use crate::models::{
    Alert, AlertKind, CropRecommendation, CurrentConditions, ForecastSeries, Language, Location,
    Severity, Suitability,
};
use crate::preferences::PreferenceError;
use crate::recommendations;
use crate::services::dashboard_service::{
    AlertsPanel, CurrentPanel, DashboardSnapshot, ForecastPanel, PanelStatus,
};
use crate::services::{DashboardService, SelectionService};
use crate::weather_fetcher::WeatherFetcher;

#[derive(Clone)]
pub struct AppState {
    pub weather: WeatherFetcher,
    pub geocoder: GeocodeFetcher,
    /// `None` when no generative-language key is configured.
    pub assistant: Option<AssistantClient>,
    pub selection: SelectionService,
    pub dashboard: DashboardService,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error rendered as a status code with a JSON `{error}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        let status = match e {
            FetchError::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FetchError::Upstream { .. } | FetchError::Schema { .. } => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, e.to_string())
    }
}

impl From<PreferenceError> for ApiError {
    fn from(_: PreferenceError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "failed to persist preferences")
    }
}

impl From<AssistantError> for ApiError {
    fn from(e: AssistantError) -> Self {
        match e {
            AssistantError::EmptyConversation => Self::bad_request(e.to_string()),
            AssistantError::Fetch(fetch) => fetch.into(),
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Optional coordinates; both or neither. Omitted means "the selected location".
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CoordinateParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ForecastParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Maximum number of points to return.
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    pub q: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReverseParams {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsParams {
    pub year: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecommendationResponse {
    pub conditions: CurrentConditions,
    pub recommendations: Vec<CropRecommendation>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LanguageBody {
    pub language: Language,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub text: String,
}

fn validate_coordinates(lat: f64, lon: f64) -> Result<(), ApiError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(ApiError::bad_request(format!(
            "coordinates out of range: lat={lat}, lon={lon}"
        )));
    }
    Ok(())
}

async fn resolve_coordinates(
    selection: &SelectionService,
    lat: Option<f64>,
    lon: Option<f64>,
) -> Result<(f64, f64), ApiError> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            validate_coordinates(lat, lon)?;
            Ok((lat, lon))
        }
        (None, None) => {
            let location = selection.location().await;
            debug!("Using selected location {}", location.name);
            Ok((location.latitude, location.longitude))
        }
        _ => Err(ApiError::bad_request("lat and lon must be given together")),
    }
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/weather/current", get(get_current))
        .route("/weather/forecast", get(get_forecast))
        .route("/weather/alerts", get(get_alerts))
        .route("/recommendations", get(get_recommendations))
        .route("/analytics", get(get_analytics))
        .route("/locations/search", get(search_locations))
        .route("/locations/reverse", get(reverse_geocode))
        .route("/selection", get(get_selection).put(put_selection))
        .route(
            "/preferences/language",
            get(get_language).put(put_language),
        )
        .route("/dashboard", get(get_dashboard))
        .route("/assistant/chat", post(chat))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/weather/current",
    params(CoordinateParams),
    responses(
        (status = 200, description = "Current conditions", body = CurrentConditions),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse),
        (status = 502, description = "Upstream failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn get_current(
    State(state): State<AppState>,
    Query(params): Query<CoordinateParams>,
) -> ApiResult<CurrentConditions> {
    let (lat, lon) = resolve_coordinates(&state.selection, params.lat, params.lon).await?;
    let conditions = state
        .weather
        .fetch_current_conditions(lat, lon)
        .await
        .map_err(|e| {
            error!("Failed to fetch current conditions for ({}, {}): {}", lat, lon, e);
            ApiError::from(e)
        })?;

    info!(
        "Retrieved current conditions for {}: {:.1}°C",
        conditions.location, conditions.temperature_c
    );
    Ok(Json(conditions))
}

#[utoipa::path(
    get,
    path = "/api/v1/weather/forecast",
    params(ForecastParams),
    responses(
        (status = 200, description = "Forecast points", body = ForecastSeries),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse),
        (status = 502, description = "Upstream failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn get_forecast(
    State(state): State<AppState>,
    Query(params): Query<ForecastParams>,
) -> ApiResult<ForecastSeries> {
    let (lat, lon) = resolve_coordinates(&state.selection, params.lat, params.lon).await?;
    let series = state.weather.fetch_forecast(lat, lon).await.map_err(|e| {
        error!("Failed to fetch forecast for ({}, {}): {}", lat, lon, e);
        ApiError::from(e)
    })?;

    let series = match params.limit {
        Some(limit) => series.truncated(limit),
        None => series,
    };
    info!("Returning {} forecast points", series.points.len());
    Ok(Json(series))
}

#[utoipa::path(
    get,
    path = "/api/v1/weather/alerts",
    params(CoordinateParams),
    responses(
        (status = 200, description = "Active alerts, possibly empty", body = [Alert]),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse),
        (status = 502, description = "Upstream failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn get_alerts(
    State(state): State<AppState>,
    Query(params): Query<CoordinateParams>,
) -> ApiResult<Vec<Alert>> {
    let (lat, lon) = resolve_coordinates(&state.selection, params.lat, params.lon).await?;
    let alerts = state.weather.fetch_alerts(lat, lon).await.map_err(|e| {
        error!("Failed to fetch alerts for ({}, {}): {}", lat, lon, e);
        ApiError::from(e)
    })?;

    info!("Returning {} alerts", alerts.len());
    Ok(Json(alerts))
}

#[utoipa::path(
    get,
    path = "/api/v1/recommendations",
    params(CoordinateParams),
    responses(
        (status = 200, description = "Conditions and crop recommendations", body = RecommendationResponse),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse),
        (status = 502, description = "Upstream failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn get_recommendations(
    State(state): State<AppState>,
    Query(params): Query<CoordinateParams>,
) -> ApiResult<RecommendationResponse> {
    let (lat, lon) = resolve_coordinates(&state.selection, params.lat, params.lon).await?;
    let conditions = state
        .weather
        .fetch_current_conditions(lat, lon)
        .await
        .map_err(|e| {
            error!("Failed to fetch conditions for recommendations at ({}, {}): {}", lat, lon, e);
            ApiError::from(e)
        })?;

    let recommendations = recommendations::evaluate(&conditions);
    info!(
        "Derived {} recommendations for {}",
        recommendations.len(),
        conditions.location
    );
    Ok(Json(RecommendationResponse {
        conditions,
        recommendations,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics",
    params(AnalyticsParams),
    responses((status = 200, description = "Synthetic climate profile for the selected location", body = ClimateProfile))
)]
#[instrument(skip(state))]
async fn get_analytics(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> ApiResult<ClimateProfile> {
    let location = state.selection.location().await;
    let year = params.year.unwrap_or_else(|| Utc::now().year());
    let profile = analytics::climate_profile(&location, year, &mut rand::thread_rng());

    debug!("Generated climate profile for {} ({})", location.name, year);
    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/api/v1/locations/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching locations", body = [LocationMatch]),
        (status = 502, description = "Upstream failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn search_locations(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<LocationMatch>> {
    let matches = state.geocoder.search(&params.q).await.map_err(|e| {
        error!("Location search for '{}' failed: {}", params.q, e);
        ApiError::from(e)
    })?;
    Ok(Json(matches))
}

#[utoipa::path(
    get,
    path = "/api/v1/locations/reverse",
    params(ReverseParams),
    responses(
        (status = 200, description = "Named location for the coordinates", body = Location),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse),
        (status = 502, description = "Upstream failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn reverse_geocode(
    State(state): State<AppState>,
    Query(params): Query<ReverseParams>,
) -> ApiResult<Location> {
    validate_coordinates(params.lat, params.lon)?;
    let location = state
        .geocoder
        .reverse(params.lat, params.lon)
        .await
        .map_err(|e| {
            error!("Reverse geocoding ({}, {}) failed: {}", params.lat, params.lon, e);
            ApiError::from(e)
        })?;
    Ok(Json(location))
}

#[utoipa::path(
    get,
    path = "/api/v1/selection",
    responses((status = 200, description = "Currently selected location", body = Location))
)]
#[instrument(skip(state))]
async fn get_selection(State(state): State<AppState>) -> ApiResult<Location> {
    Ok(Json(state.selection.location().await))
}

#[utoipa::path(
    put,
    path = "/api/v1/selection",
    request_body = Location,
    responses(
        (status = 200, description = "Selection replaced", body = Location),
        (status = 400, description = "Invalid location", body = ErrorResponse),
        (status = 500, description = "Could not persist selection", body = ErrorResponse)
    )
)]
#[instrument(skip(state, location), fields(name = %location.name))]
async fn put_selection(
    State(state): State<AppState>,
    Json(location): Json<Location>,
) -> ApiResult<Location> {
    if location.name.trim().is_empty() {
        return Err(ApiError::bad_request("location name must not be empty"));
    }
    validate_coordinates(location.latitude, location.longitude)?;

    let location = state
        .selection
        .set_location(location)
        .await
        .map_err(|e| {
            error!("Failed to persist selected location: {}", e);
            ApiError::from(e)
        })?;

    let dashboard = state.dashboard.clone();
    tokio::spawn(async move {
        dashboard.refresh_selected().await;
    });

    Ok(Json(location))
}

#[utoipa::path(
    get,
    path = "/api/v1/preferences/language",
    responses((status = 200, description = "Current language", body = LanguageBody))
)]
#[instrument(skip(state))]
async fn get_language(State(state): State<AppState>) -> ApiResult<LanguageBody> {
    let language = state.selection.language().await;
    Ok(Json(LanguageBody { language }))
}

#[utoipa::path(
    put,
    path = "/api/v1/preferences/language",
    request_body = LanguageBody,
    responses(
        (status = 200, description = "Language replaced", body = LanguageBody),
        (status = 500, description = "Could not persist language", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn put_language(
    State(state): State<AppState>,
    Json(body): Json<LanguageBody>,
) -> ApiResult<LanguageBody> {
    let language = state
        .selection
        .set_language(body.language)
        .await
        .map_err(|e| {
            error!("Failed to persist language: {}", e);
            ApiError::from(e)
        })?;
    Ok(Json(LanguageBody { language }))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses((status = 200, description = "Latest committed dashboard panels", body = DashboardSnapshot))
)]
#[instrument(skip(state))]
async fn get_dashboard(State(state): State<AppState>) -> ApiResult<DashboardSnapshot> {
    let snapshot = state.dashboard.snapshot().await;
    debug!(
        "Dashboard panels: current={:?}, forecast={:?}, alerts={:?}",
        snapshot.current.status(),
        snapshot.forecast.status(),
        snapshot.alerts.status()
    );
    Ok(Json(snapshot))
}

#[utoipa::path(
    post,
    path = "/api/v1/assistant/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "No messages", body = ErrorResponse),
        (status = 502, description = "Upstream failure", body = ErrorResponse),
        (status = 503, description = "Assistant not configured", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(message_count = request.messages.len()))]
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    let assistant = state.assistant.as_ref().ok_or_else(|| {
        warn!("Chat requested but no assistant key is configured");
        ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "assistant is not configured")
    })?;

    let text = assistant.reply(&request.messages).await.map_err(|e| {
        error!("Failed to process chat request: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(ChatResponse { text }))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        get_current,
        get_forecast,
        get_alerts,
        get_recommendations,
        get_analytics,
        search_locations,
        reverse_geocode,
        get_selection,
        put_selection,
        get_language,
        put_language,
        get_dashboard,
        chat
    ),
    components(schemas(
        HealthResponse,
        ErrorResponse,
        RecommendationResponse,
        LanguageBody,
        ChatRequest,
        ChatResponse,
        ChatMessage,
        Location,
        LocationMatch,
        CurrentConditions,
        ForecastSeries,
        Alert,
        AlertKind,
        Severity,
        CropRecommendation,
        Suitability,
        Language,
        ClimateProfile,
        MonthlyTemperature,
        MonthlyPrecipitation,
        DashboardSnapshot,
        PanelStatus,
        CurrentPanel,
        ForecastPanel,
        AlertsPanel
    )),
    tags((name = "farm-weather-service", description = "Weather, crop recommendation and assistant API"))
)]
pub struct ApiDoc;

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dashboard_service::Panel;
    use serde_json::Value;

    fn schema(doc: &Value, name: &str) -> Value {
        doc["components"]["schemas"][name].clone()
    }

    #[test]
    fn test_dashboard_panels_are_documented() {
        let doc = serde_json::to_value(generate_openapi_spec()).unwrap();

        let snapshot = schema(&doc, "DashboardSnapshot");
        assert_eq!(
            snapshot["properties"]["current"]["$ref"],
            "#/components/schemas/CurrentPanel"
        );
        assert_eq!(
            snapshot["properties"]["forecast"]["$ref"],
            "#/components/schemas/ForecastPanel"
        );
        assert_eq!(
            snapshot["properties"]["alerts"]["$ref"],
            "#/components/schemas/AlertsPanel"
        );

        let status = schema(&doc, "PanelStatus");
        assert_eq!(status["enum"], serde_json::json!(["loading", "ready", "failed"]));
    }

    #[test]
    fn test_serialized_panels_match_documented_properties() {
        let doc = serde_json::to_value(generate_openapi_spec()).unwrap();
        let properties = schema(&doc, "AlertsPanel")["properties"].clone();

        let panels: [Panel<Vec<Alert>>; 3] = [
            Panel::Loading,
            Panel::Ready {
                data: Vec::new(),
                generation: 1,
                refreshed_at: Utc::now(),
                synthetic: false,
            },
            Panel::Failed {
                message: "alerts fetch failed".to_string(),
                generation: 2,
            },
        ];

        for panel in panels {
            let value = serde_json::to_value(&panel).unwrap();
            for key in value.as_object().unwrap().keys() {
                assert!(
                    properties.get(key).is_some(),
                    "{key} is serialized but not documented"
                );
            }
        }
    }
}
