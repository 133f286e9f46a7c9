use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;
use shared_database::models::HospitalCandidate;

const POI_CATEGORY: &str = "hospital";
const UNKNOWN: &str = "Unknown";

#[derive(Debug, Error)]
pub enum GeoSearchError {
    /// The provider answered with a non-success status.
    #[error("TomTom API returned {status}")]
    Status { status: u16 },

    #[error("TomTom API request failed: {0}")]
    Transport(String),

    #[error("Failed to parse TomTom response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GeoSearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GeoSearchError::Decode(err.to_string())
        } else {
            GeoSearchError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct PoiSearchResponse {
    #[serde(default)]
    results: Vec<PoiResult>,
}

#[derive(Debug, Deserialize)]
struct PoiResult {
    poi: Option<Poi>,
    address: Option<PoiAddress>,
    dist: Option<f64>,
    position: Option<PoiPosition>,
}

#[derive(Debug, Deserialize)]
struct Poi {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoiAddress {
    freeform_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PoiPosition {
    lat: f64,
    lon: f64,
}

impl PoiResult {
    fn into_candidate(self) -> Option<HospitalCandidate> {
        let position = self.position?;
        Some(HospitalCandidate {
            name: self
                .poi
                .and_then(|p| p.name)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            address: self
                .address
                .and_then(|a| a.freeform_address)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            lat: position.lat,
            lng: position.lon,
            distance: self.dist,
        })
    }
}

/// TomTom Search API client for point-of-interest lookups.
/// Based on: https://developer.tomtom.com/search-api/documentation/search-service/poi-search
pub struct TomTomClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TomTomClient {
    pub fn new(config: &AppConfig) -> Self {
        if config.tomtom_api_key.is_empty() {
            warn!("TOMTOM_API_KEY is empty, nearby hospital search will be rejected by TomTom");
        }

        Self {
            client: Client::new(),
            api_key: config.tomtom_api_key.clone(),
            base_url: config.tomtom_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// GET /search/2/poiSearch/hospital.json
    ///
    /// Results come back in provider order. Results without a position are
    /// skipped.
    pub async fn search_hospitals(
        &self,
        lat: f64,
        lon: f64,
        radius: u32,
        limit: u32,
    ) -> Result<Vec<HospitalCandidate>, GeoSearchError> {
        let url = format!("{}/search/2/poiSearch/{}.json", self.base_url, POI_CATEGORY);
        debug!(
            "Searching hospitals near ({}, {}) radius={} limit={}",
            lat, lon, radius, limit
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.clone()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("radius", radius.to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("TomTom search failed: {} - {}", status, body);
            return Err(GeoSearchError::Status {
                status: status.as_u16(),
            });
        }

        let body: PoiSearchResponse = response.json().await?;
        let total = body.results.len();
        let candidates: Vec<HospitalCandidate> = body
            .results
            .into_iter()
            .filter_map(PoiResult::into_candidate)
            .collect();

        if candidates.len() < total {
            warn!(
                "Skipped {} TomTom result(s) without a position",
                total - candidates.len()
            );
        }
        info!("TomTom returned {} hospital(s)", candidates.len());

        Ok(candidates)
    }
}
