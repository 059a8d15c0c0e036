use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::config::UpstreamPolicy;
use crate::fetch_error::{FetchError, Operation};
use crate::models::Location;
use crate::upstream::{endpoint, UpstreamClient};

const DIRECT_PATH: &str = "/geo/1.0/direct";
const REVERSE_PATH: &str = "/geo/1.0/reverse";
const SEARCH_LIMIT: u8 = 10;
/// Shorter queries return nothing without contacting the provider.
pub const MIN_QUERY_LEN: usize = 2;

/// A candidate returned by location search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationMatch {
    pub name: String,
    #[serde(rename(deserialize = "lat"))]
    pub latitude: f64,
    #[serde(rename(deserialize = "lon"))]
    pub longitude: f64,
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
}

impl LocationMatch {
    pub fn display_name(&self) -> String {
        match &self.state {
            Some(state) => format!("{}, {}, {}", self.name, state, self.country),
            None => format!("{}, {}", self.name, self.country),
        }
    }

    pub fn into_location(self) -> Location {
        Location::new(self.display_name(), self.latitude, self.longitude)
    }
}

#[derive(Clone)]
pub struct GeocodeFetcher {
    client: UpstreamClient,
    base_url: String,
    api_key: String,
}

impl GeocodeFetcher {
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

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<LocationMatch>, FetchError> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            debug!("Search query too short, skipping request");
            return Ok(Vec::new());
        }

        let params = [
            ("q", query.to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
            ("appid", self.api_key.clone()),
        ];
        let matches: Vec<LocationMatch> = self
            .client
            .get_json(
                Operation::LocationSearch,
                &endpoint(&self.base_url, DIRECT_PATH),
                &params,
            )
            .await?;

        info!("Location search '{}' returned {} matches", query, matches.len());
        Ok(matches)
    }

    #[instrument(skip(self))]
    pub async fn reverse(&self, lat: f64, lon: f64) -> Result<Location, FetchError> {
        let params = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("limit", "1".to_string()),
            ("appid", self.api_key.clone()),
        ];
        let matches: Vec<LocationMatch> = self
            .client
            .get_json(
                Operation::ReverseGeocoding,
                &endpoint(&self.base_url, REVERSE_PATH),
                &params,
            )
            .await?;

        // The caller's coordinates are kept; only the name comes from the provider.
        let location = match matches.into_iter().next() {
            Some(found) => Location::new(found.display_name(), lat, lon),
            None => {
                debug!("No reverse geocoding match, using coordinate name");
                Location::unnamed(lat, lon)
            }
        };
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_with_state() {
        let m: LocationMatch = serde_json::from_str(
            r#"{"name": "Jalandhar", "lat": 31.326, "lon": 75.576, "country": "IN", "state": "Punjab"}"#,
        )
        .unwrap();
        assert_eq!(m.display_name(), "Jalandhar, Punjab, IN");

        let location = m.into_location();
        assert_eq!(location.latitude, 31.326);
        assert_eq!(location.longitude, 75.576);
    }

    #[test]
    fn test_display_name_without_state() {
        let m: LocationMatch = serde_json::from_str(
            r#"{"name": "Paris", "lat": 48.85, "lon": 2.35, "country": "FR", "local_names": {"fr": "Paris"}}"#,
        )
        .unwrap();
        assert_eq!(m.display_name(), "Paris, FR");
    }

    #[test]
    fn test_match_serializes_with_full_field_names() {
        let m = LocationMatch {
            name: "Paris".to_string(),
            latitude: 48.85,
            longitude: 2.35,
            country: "FR".to_string(),
            state: None,
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["latitude"], 48.85);
        assert!(json.get("lat").is_none());
    }
}
