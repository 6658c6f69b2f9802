//! # Geotag Writer
//!
//! Risolve un indirizzo in coordinate e scrive i dati GPS negli asset JPEG.
//!
//! ## Responsabilità:
//! - `Geocoder`: lookup di un indirizzo testuale (servizio esterno)
//! - `NominatimGeocoder`: implementazione HTTP compatibile con Nominatim/OSM
//! - `resolve_address`: `None` se il servizio non restituisce entrambe le coordinate
//! - `GeoTagger`: scrittura GPS per JPEG, no-op documentato per PNG e GIF

use crate::asset::Asset;
use crate::config::{Config, Limits};
use crate::error::{Result, WaoError};
use crate::exif_writer;
use crate::media_type::ImageKind;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Default altitude written with the GPS block, in meters
pub const DEFAULT_ALTITUDE: f64 = 1.0;

/// A WGS84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(WaoError::Validation(format!(
                "Coordinates out of range: {}, {}",
                latitude, longitude
            )));
        }
        Ok(Self { latitude, longitude })
    }

    pub fn from_limits(limits: &Limits) -> Self {
        Self {
            latitude: limits.latitude,
            longitude: limits.longitude,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Raw answer of a geocoding lookup; either coordinate may be missing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Place {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub display_name: Option<String>,
}

/// Address lookup service
#[allow(async_fn_in_trait)]
pub trait Geocoder {
    async fn lookup(&self, address: &str) -> Result<Option<Place>>;
}

/// Resolves free text to coordinates, `None` when the answer is incomplete
pub async fn resolve_address<G: Geocoder>(geocoder: &G, address: &str) -> Result<Option<Coordinates>> {
    let address = address.trim();
    if address.is_empty() {
        return Ok(None);
    }

    match geocoder.lookup(address).await? {
        Some(Place {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..
        }) => {
            let coords = Coordinates::new(latitude, longitude)?;
            debug!("Resolved '{}' to {}", address, coords);
            Ok(Some(coords))
        }
        _ => {
            debug!("No coordinates for '{}'", address);
            Ok(None)
        }
    }
}

#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: Option<String>,
    lon: Option<String>,
    display_name: Option<String>,
}

/// Geocoder backed by a Nominatim-compatible `/search` endpoint
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| WaoError::Geocoding(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.geocoder_url,
            Duration::from_secs(config.geocoder_timeout_secs),
            &config.geocoder_user_agent,
        )
    }

    fn map_error(&self, err: reqwest::Error) -> WaoError {
        if err.is_timeout() {
            WaoError::Timeout {
                tool: "geocoder".to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            WaoError::Geocoding(err.to_string())
        }
    }
}

impl Geocoder for NominatimGeocoder {
    async fn lookup(&self, address: &str) -> Result<Option<Place>> {
        let url = format!("{}/search", self.base_url);
        debug!("Geocoding '{}' via {}", address, url);

        let hits: Vec<NominatimHit> = self
            .client
            .get(&url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| self.map_error(e))?
            .json()
            .await
            .map_err(|e| self.map_error(e))?;

        Ok(hits.into_iter().next().map(|hit| Place {
            latitude: hit.lat.and_then(|value| value.trim().parse().ok()),
            longitude: hit.lon.and_then(|value| value.trim().parse().ok()),
            display_name: hit.display_name,
        }))
    }
}

/// Result of a geotag call on one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeotagOutcome {
    Written,
    /// Nothing written for this encoding
    Unsupported(ImageKind),
}

/// Writes GPS data into the active file of an asset
pub struct GeoTagger;

impl GeoTagger {
    pub async fn tag(asset: &Asset, coords: Coordinates, altitude: f64) -> Result<GeotagOutcome> {
        let kind = asset.active_kind();
        if kind != ImageKind::Jpeg {
            info!("Cannot geotag {} ({:?}), skipping", asset.active_name(), kind);
            return Ok(GeotagOutcome::Unsupported(kind));
        }

        let path = asset.active_file();
        let timestamp = Utc::now();
        let failed = |reason: String| WaoError::TransformFailed {
            asset: asset.active_name().to_string(),
            reason,
        };

        tokio::task::spawn_blocking(move || {
            exif_writer::write_gps(&path, coords.latitude, coords.longitude, altitude, timestamp)
        })
        .await
        .map_err(|e| failed(e.to_string()))?
        .map_err(|e| failed(e.to_string()))?;

        debug!("Geotagged {} at {}", asset.active_name(), coords);
        Ok(GeotagOutcome::Written)
    }
}
