use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use farm_weather_service::assistant::{AssistantClient, ChatMessage};
use farm_weather_service::config::{
    UpstreamPolicy, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_OPENWEATHER_BASE_URL,
};
use farm_weather_service::geocode_fetcher::GeocodeFetcher;
use farm_weather_service::models::{Suitability, DISPLAY_POINTS};
use farm_weather_service::recommendations;
use farm_weather_service::weather_fetcher::WeatherFetcher;

#[derive(Parser)]
#[command(name = "farm-weather")]
#[command(about = "Query weather, alerts and crop recommendations for a location", long_about = None)]
struct Cli {
    /// OpenWeatherMap API key
    #[arg(long, env = "OPENWEATHER_API_KEY")]
    openweather_api_key: String,

    /// OpenWeatherMap base URL
    #[arg(long, env = "OPENWEATHER_BASE_URL", default_value = DEFAULT_OPENWEATHER_BASE_URL)]
    openweather_base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout_secs: u64,

    /// Retries for transient upstream failures
    #[arg(long, default_value = "1")]
    retries: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Current conditions
    Current {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
    /// Forecast points (first 7 unless --all)
    Forecast {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long)]
        all: bool,
    },
    /// Active weather alerts
    Alerts {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
    /// Crop recommendations from current conditions
    Recommend {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
    /// Search locations by name
    Search { query: String },
    /// Ask the farming assistant a question
    Ask {
        question: String,
        #[arg(long, env = "GEMINI_API_KEY")]
        gemini_api_key: String,
        #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_GEMINI_BASE_URL)]
        gemini_base_url: String,
        #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
        gemini_model: String,
    },
}

fn suitability_label(suitability: Suitability) -> &'static str {
    match suitability {
        Suitability::High => "high",
        Suitability::Medium => "medium",
        Suitability::Low => "low",
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let policy = UpstreamPolicy {
        timeout: std::time::Duration::from_secs(cli.timeout_secs),
        max_retries: cli.retries,
        ..UpstreamPolicy::default()
    };

    match cli.command {
        Command::Current { lat, lon } => {
            let weather =
                WeatherFetcher::new(&cli.openweather_base_url, &cli.openweather_api_key, policy)?;
            let c = weather.fetch_current_conditions(lat, lon).await?;
            println!("{}", c.location);
            println!("  {:.1}°C (feels like {:.1}°C), {}", c.temperature_c, c.feels_like_c, c.description);
            println!("  Humidity {}%, wind {:.1} m/s", c.humidity_pct, c.wind_speed_mps);
        }
        Command::Forecast { lat, lon, all } => {
            let weather =
                WeatherFetcher::new(&cli.openweather_base_url, &cli.openweather_api_key, policy)?;
            let series = weather.fetch_forecast(lat, lon).await?;
            let points = if all {
                &series.points[..]
            } else {
                series.display_points()
            };
            println!("{} of {} forecast points:", points.len(), series.points.len());
            for p in points {
                let time = chrono::DateTime::from_timestamp(p.observed_at_epoch_seconds, 0)
                    .map(|t| t.format("%a %d %b %H:%M").to_string())
                    .unwrap_or_else(|| p.observed_at_epoch_seconds.to_string());
                println!("  {}  {:>5.1}°C  {:>3}%  {}", time, p.temperature_c, p.humidity_pct, p.description);
            }
            if !all && series.points.len() > DISPLAY_POINTS {
                println!("  (use --all for the full series)");
            }
        }
        Command::Alerts { lat, lon } => {
            let weather =
                WeatherFetcher::new(&cli.openweather_base_url, &cli.openweather_api_key, policy)?;
            let alerts = weather.fetch_alerts(lat, lon).await?;
            if alerts.is_empty() {
                println!("No active alerts");
            }
            for a in alerts {
                let marker = if a.is_destructive() { "!" } else { " " };
                println!("{} [{:?}] {} ({:?})", marker, a.severity, a.event, a.kind());
                println!("  {}", a.description);
            }
        }
        Command::Recommend { lat, lon } => {
            let weather =
                WeatherFetcher::new(&cli.openweather_base_url, &cli.openweather_api_key, policy)?;
            let conditions = weather.fetch_current_conditions(lat, lon).await?;
            println!(
                "{}: {:.1}°C, {}% humidity",
                conditions.location, conditions.temperature_c, conditions.humidity_pct
            );
            for r in recommendations::evaluate(&conditions) {
                println!("  {:<10} {:<7} {}", r.crop_name, suitability_label(r.suitability), r.reason);
            }
        }
        Command::Search { query } => {
            let geocoder =
                GeocodeFetcher::new(&cli.openweather_base_url, &cli.openweather_api_key, policy)?;
            let matches = geocoder.search(&query).await?;
            if matches.is_empty() {
                println!("No locations found for '{query}'");
            }
            for location in matches.into_iter().map(|m| m.into_location()) {
                println!(
                    "  {:<40} {:>9.4} {:>9.4}",
                    location.name, location.latitude, location.longitude
                );
            }
        }
        Command::Ask {
            question,
            gemini_api_key,
            gemini_base_url,
            gemini_model,
        } => {
            let assistant =
                AssistantClient::new(gemini_base_url, gemini_model, gemini_api_key, policy)?;
            let messages = [ChatMessage {
                role: "user".to_string(),
                content: question,
            }];
            println!("{}", assistant.reply(&messages).await?);
        }
    }

    Ok(())
}
