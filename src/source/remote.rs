use crate::error::AppError;
use crate::geo::LatLng;
use crate::source::{DataSource, ParkingLot, Place};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, SystemTime};
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Data source backed by the companion HTTP service.
///
/// The wire format uses `available`; it is normalised to the model's
/// `available_spots` on ingest. Proximity search is deliberately not offered
/// here, so callers can tell the capability gap apart from an empty result.
pub struct RemoteSource {
    client: Client,
    base_url: String,
}

impl RemoteSource {
    /// Builds a source pointed at `base_url`, e.g. `http://localhost:4000`.
    /// A trailing slash is tolerated.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

#[async_trait]
impl DataSource for RemoteSource {
    async fn geo_search(&self, query: &str) -> Result<Vec<Place>, AppError> {
        let response: WireGeoResponse = self
            .client
            .get(self.endpoint("api/v1/geo/search"))
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response
            .items
            .into_iter()
            .map(WirePlace::into_place)
            .collect())
    }

    async fn parking_near(
        &self,
        _center: LatLng,
        _radius_m: f64,
    ) -> Result<Vec<ParkingLot>, AppError> {
        Err(AppError::Unsupported("proximity search"))
    }

    async fn parking_by_name(&self, destination: &str) -> Result<Vec<ParkingLot>, AppError> {
        let lots: Vec<WireLot> = self
            .client
            .get(self.endpoint("api/v1/parking"))
            .query(&[("dest", destination)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(lots.into_iter().map(WireLot::into_lot).collect())
    }

    async fn push_updates(&self, ids: &[String]) -> Result<Vec<ParkingLot>, AppError> {
        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            let response = self
                .client
                .get(self.endpoint(&format!("api/v1/parking/{id}")))
                .send()
                .await?;
            if response.status() == StatusCode::NOT_FOUND {
                debug!(id, "lot no longer known upstream, skipping");
                continue;
            }
            let lot: WireLot = response.error_for_status()?.json().await?;
            updated.push(lot.into_lot());
        }
        Ok(updated)
    }

    fn supports_proximity(&self) -> bool {
        false
    }
}

#[derive(Debug, Deserialize)]
struct WireGeoResponse {
    items: Vec<WirePlace>,
}

#[derive(Debug, Deserialize)]
struct WirePlace {
    #[serde(default)]
    id: Option<String>,
    name: String,
    lat: f64,
    lng: f64,
}

impl WirePlace {
    fn into_place(self) -> Place {
        Place {
            id: self.id,
            name: self.name,
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// Lot record as the service serializes it. Field names and presence differ
/// from the model: availability arrives as `available_spots` or `available`,
/// and id/capacity may be missing entirely on older payloads.
#[derive(Debug, Deserialize)]
struct WireLot {
    #[serde(default)]
    id: Option<String>,
    name: String,
    lat: f64,
    lng: f64,
    #[serde(default)]
    capacity: u32,
    #[serde(default)]
    available_spots: Option<u32>,
    #[serde(default)]
    available: Option<u32>,
    #[serde(default)]
    price: Option<String>,
}

impl WireLot {
    fn into_lot(self) -> ParkingLot {
        let available = self.available_spots.or(self.available).unwrap_or(0);
        let id = self.id.unwrap_or_else(|| self.name.clone());
        let mut lot = ParkingLot {
            id,
            name: self.name,
            lat: self.lat,
            lng: self.lng,
            capacity: self.capacity,
            available_spots: available,
            price: self.price,
            updated_at: SystemTime::now(),
        };
        lot.clamp_available();
        lot
    }
}
