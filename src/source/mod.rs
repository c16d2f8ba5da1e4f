use crate::error::AppError;
use crate::geo::LatLng;
use async_trait::async_trait;
use std::time::SystemTime;

pub mod fixture;
pub mod remote;

/// Largest perturbation applied to a lot's availability per update cycle.
pub const MAX_AVAILABILITY_DELTA: i32 = 4;

/// A named location produced by geocoding search. `id` is kept when the
/// source provides a stable one.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub id: Option<String>,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Place {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            lat,
            lng,
        }
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// A parking facility with fixed capacity and a mutable availability count.
#[derive(Debug, Clone, PartialEq)]
pub struct ParkingLot {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub capacity: u32,
    pub available_spots: u32,
    pub price: Option<String>,
    pub updated_at: SystemTime,
}

impl ParkingLot {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// Restore the `available_spots <= capacity` invariant after a merge.
    pub fn clamp_available(&mut self) {
        if self.available_spots > self.capacity {
            self.available_spots = self.capacity;
        }
    }
}

/// Capability set shared by the fixture-backed and remote-backed variants.
/// The variant is chosen once at construction from configuration.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Case-insensitive substring search over the source's gazetteer.
    /// Callers must not pass an empty query; the pipeline guards this at
    /// the input boundary.
    async fn geo_search(&self, query: &str) -> Result<Vec<Place>, AppError>;

    /// Lots within `radius_m` of `center`. When no lot falls inside the
    /// radius the three nearest lots are returned instead, so the result
    /// is only empty when the source holds no lots at all.
    async fn parking_near(
        &self,
        center: LatLng,
        radius_m: f64,
    ) -> Result<Vec<ParkingLot>, AppError>;

    /// Lots whose name contains any whitespace-separated token of
    /// `destination`, case-insensitive. No radius filtering on this path.
    async fn parking_by_name(&self, destination: &str) -> Result<Vec<ParkingLot>, AppError>;

    /// Refreshed records for the ids that exist; unknown ids are silently
    /// skipped.
    async fn push_updates(&self, ids: &[String]) -> Result<Vec<ParkingLot>, AppError>;

    /// Whether `parking_near` is usable on this variant. Sources without
    /// proximity support are queried by destination name instead.
    fn supports_proximity(&self) -> bool;
}
