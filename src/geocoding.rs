// ABOUTME: Reverse-geocoding collaborator for run start locations
// ABOUTME: Nominatim client with caching, request timeout, and the locality-first label rule
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reverse geocoding.
//!
//! The pipeline asks for a start-location label exactly once per run. The
//! label contract: a locality is required, a region alone is not enough.
//! Locality absent → `"Unknown"`; locality present without a region →
//! locality alone; both → `"{locality}, {region}"`. Lookup failures degrade
//! to `"Unknown"` at the call site, never aborting a run.

use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Fallback label when no locality can be resolved
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// A reverse-geocoding result: locality and region short code, either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Place {
    /// Town/city name
    pub locality: Option<String>,
    /// State/region short code
    pub region: Option<String>,
}

impl Place {
    /// Render the start-location label.
    ///
    /// A locality is required; a region alone is insufficient.
    #[must_use]
    pub fn label(&self) -> String {
        match (&self.locality, &self.region) {
            (Some(town), Some(region)) => format!("{town}, {region}"),
            (Some(town), None) => town.clone(),
            (None, _) => UNKNOWN_LOCATION.into(),
        }
    }
}

/// Seam for the reverse-geocoding collaborator
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Resolve the place at the given coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status, or an
    /// undecodable response; callers degrade to [`UNKNOWN_LOCATION`].
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> AppResult<Place>;
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    #[serde(default)]
    address: NominatimAddress,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    suburb: Option<String>,
    state: Option<String>,
    county: Option<String>,
    #[serde(rename = "ISO3166-2-lvl4")]
    state_code: Option<String>,
}

/// Nominatim-backed reverse geocoder with an in-memory coordinate cache.
///
/// The cache is keyed on coordinates rounded to six decimals so runs that
/// start from the same spot resolve without a second request. Entries live
/// for the pipeline's lifetime; a batch run is far shorter than any
/// reasonable expiry.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
    enabled: bool,
    cache: Mutex<HashMap<String, Place>>,
}

impl NominatimGeocoder {
    /// Create a geocoder against the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns a config error when the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, enabled: bool, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("runmap/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::config(format!("geocoding client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            enabled,
            cache: Mutex::new(HashMap::new()),
        })
    }

    #[instrument(skip(self), fields(service = "nominatim", lat = %latitude, lon = %longitude))]
    async fn fetch(&self, latitude: f64, longitude: f64) -> AppResult<NominatimResponse> {
        let url = format!(
            "{}/reverse?format=json&lat={latitude}&lon={longitude}&zoom=14&addressdetails=1",
            self.base_url
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            AppError::external_service("Nominatim", format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::external_service(
                "Nominatim",
                format!("status {status}"),
            ));
        }

        response.json().await.map_err(|e| {
            AppError::external_service("Nominatim", format!("undecodable response: {e}"))
        })
    }

    fn to_place(response: NominatimResponse) -> Place {
        let address = response.address;
        let locality = address
            .city
            .or(address.town)
            .or(address.village)
            .or(address.suburb);
        // Prefer the ISO 3166-2 short code ("US-MA" → "MA"); fall back to the
        // spelled-out state or county name.
        let region = address
            .state_code
            .as_deref()
            .and_then(|code| code.rsplit('-').next())
            .map(str::to_owned)
            .or(address.state)
            .or(address.county);
        Place { locality, region }
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> AppResult<Place> {
        if !self.enabled {
            return Ok(Place::default());
        }

        let cache_key = format!("{latitude:.6},{longitude:.6}");
        if let Ok(cache) = self.cache.lock() {
            if let Some(place) = cache.get(&cache_key) {
                debug!(%cache_key, "geocoding cache hit");
                return Ok(place.clone());
            }
        }

        let place = Self::to_place(self.fetch(latitude, longitude).await?);
        if place.locality.is_none() {
            warn!(lat = latitude, lon = longitude, "no locality in geocoding response");
        }

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(cache_key, place.clone());
        }
        Ok(place)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_with_locality_and_region() {
        let place = Place {
            locality: Some("Boston".into()),
            region: Some("MA".into()),
        };
        assert_eq!(place.label(), "Boston, MA");
    }

    #[test]
    fn test_label_locality_without_region_is_locality_alone() {
        let place = Place {
            locality: Some("Boston".into()),
            region: None,
        };
        assert_eq!(place.label(), "Boston");
    }

    #[test]
    fn test_label_region_alone_is_insufficient() {
        // A region without a locality must not leak into the label.
        let place = Place {
            locality: None,
            region: Some("MA".into()),
        };
        assert_eq!(place.label(), UNKNOWN_LOCATION);
    }

    #[test]
    fn test_label_nothing_resolved() {
        assert_eq!(Place::default().label(), UNKNOWN_LOCATION);
    }

    #[test]
    fn test_place_from_nominatim_prefers_city_and_short_region() {
        let response: NominatimResponse = serde_json::from_str(
            r#"{"address":{"city":"Boston","state":"Massachusetts","ISO3166-2-lvl4":"US-MA"}}"#,
        )
        .unwrap();
        let place = NominatimGeocoder::to_place(response);
        assert_eq!(place.locality.as_deref(), Some("Boston"));
        assert_eq!(place.region.as_deref(), Some("MA"));
    }

    #[test]
    fn test_place_from_nominatim_town_fallback() {
        let response: NominatimResponse =
            serde_json::from_str(r#"{"address":{"town":"Brookline","state":"Massachusetts"}}"#)
                .unwrap();
        let place = NominatimGeocoder::to_place(response);
        assert_eq!(place.locality.as_deref(), Some("Brookline"));
        assert_eq!(place.region.as_deref(), Some("Massachusetts"));
    }

    #[test]
    fn test_place_from_empty_address() {
        let response: NominatimResponse = serde_json::from_str(r#"{"address":{}}"#).unwrap();
        let place = NominatimGeocoder::to_place(response);
        assert_eq!(place, Place::default());
    }

    #[tokio::test]
    async fn test_disabled_geocoder_short_circuits() {
        let geocoder =
            NominatimGeocoder::new("http://127.0.0.1:1", false, Duration::from_secs(1)).unwrap();
        let place = geocoder.reverse_geocode(42.36, -71.05).await.unwrap();
        assert_eq!(place.label(), UNKNOWN_LOCATION);
    }
}
