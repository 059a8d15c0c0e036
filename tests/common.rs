#![allow(dead_code)]

use std::time::Duration;

use farm_weather_service::config::UpstreamPolicy;
use farm_weather_service::weather_fetcher::WeatherFetcher;
use mockito::Matcher;

pub const TEST_API_KEY: &str = "test-key";
pub const JALANDHAR_LAT: &str = "31.326";
pub const JALANDHAR_LON: &str = "75.576";

/// No retries and a short delay so failing tests stay fast.
pub fn fast_policy() -> UpstreamPolicy {
    UpstreamPolicy {
        timeout: Duration::from_secs(5),
        max_retries: 0,
        retry_delay: Duration::from_millis(10),
    }
}

pub fn retrying_policy(max_retries: usize) -> UpstreamPolicy {
    UpstreamPolicy {
        max_retries,
        ..fast_policy()
    }
}

pub fn weather_fetcher(base_url: &str) -> WeatherFetcher {
    WeatherFetcher::new(base_url, TEST_API_KEY, fast_policy()).expect("client builds")
}

pub fn coordinate_query(lat: &str, lon: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("lat".into(), lat.into()),
        Matcher::UrlEncoded("lon".into(), lon.into()),
        Matcher::UrlEncoded("appid".into(), TEST_API_KEY.into()),
    ])
}

pub fn metric_query(lat: &str, lon: &str) -> Matcher {
    Matcher::AllOf(vec![
        coordinate_query(lat, lon),
        Matcher::UrlEncoded("units".into(), "metric".into()),
    ])
}

pub fn current_body(name: &str, temp: f64, humidity: u8) -> String {
    format!(
        r#"{{
            "coord": {{"lon": 75.576, "lat": 31.326}},
            "weather": [{{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}}],
            "main": {{"temp": {temp}, "feels_like": {feels}, "temp_min": 20.0, "temp_max": 33.0, "pressure": 1006, "humidity": {humidity}}},
            "wind": {{"speed": 3.6, "deg": 290}},
            "dt": 1718001234,
            "name": "{name}",
            "cod": 200
        }}"#,
        feels = temp + 1.5
    )
}

pub fn forecast_body(city: &str, points: usize) -> String {
    let entries: Vec<String> = (0..points)
        .map(|i| {
            format!(
                r#"{{
                    "dt": {dt},
                    "main": {{"temp": {temp}, "feels_like": {temp}, "humidity": 55}},
                    "weather": [{{"description": "few clouds", "icon": "02d"}}],
                    "wind": {{"speed": 2.1}},
                    "dt_txt": "ignored"
                }}"#,
                dt = 1718006400 + i as i64 * 10800,
                temp = 20.0 + i as f64
            )
        })
        .collect();

    format!(
        r#"{{"cod": "200", "cnt": {points}, "list": [{}], "city": {{"name": "{city}", "country": "IN"}}}}"#,
        entries.join(",")
    )
}

pub const ALERTS_BODY: &str = r#"{
    "lat": 31.326,
    "lon": 75.576,
    "timezone": "Asia/Kolkata",
    "alerts": [
        {
            "sender_name": "IMD",
            "event": "Heavy Rain",
            "start": 1718000000,
            "end": 1718086400,
            "description": "Heavy rainfall expected.",
            "tags": ["Rain"]
        },
        {
            "sender_name": "IMD",
            "event": "Strong Winds",
            "start": 1718000000,
            "end": 1718043200,
            "description": "Secure loose equipment.",
            "severity": "severe"
        }
    ]
}"#;

pub const NO_ALERTS_BODY: &str = r#"{"lat": 31.326, "lon": 75.576, "timezone": "Asia/Kolkata", "timezone_offset": 19800}"#;
