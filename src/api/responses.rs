use crate::metrics::occupancy_pct;
use crate::source::{ParkingLot, Place};
use serde::Serialize;

/// Wire shape of a parking lot. The model's `available_spots` travels as
/// `available`; both the service and the remote client agree on this name.
#[derive(Debug, Clone, Serialize)]
pub struct LotRecord {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub capacity: u32,
    pub available: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

impl From<&ParkingLot> for LotRecord {
    fn from(lot: &ParkingLot) -> Self {
        Self {
            id: lot.id.clone(),
            name: lot.name.clone(),
            lat: lot.lat,
            lng: lot.lng,
            capacity: lot.capacity,
            available: lot.available_spots,
            price: lot.price.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaceRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl From<&Place> for PlaceRecord {
    fn from(place: &Place) -> Self {
        Self {
            id: place.id.clone(),
            name: place.name.clone(),
            lat: place.lat,
            lng: place.lng,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GeoSearchSuccessResponse {
    pub items: Vec<PlaceRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentResponse {
    pub public_transport: Vec<String>,
    pub co2_saved_kg: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyEntry {
    pub car_park: String,
    pub percentage: u8,
}

impl From<&ParkingLot> for OccupancyEntry {
    fn from(lot: &ParkingLot) -> Self {
        Self {
            car_park: lot.name.clone(),
            percentage: occupancy_pct(lot.capacity, lot.available_spots),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BusyHourEntry {
    pub hour: u8,
    pub count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSuccessResponse {
    pub average_occupancy: Vec<OccupancyEntry>,
    pub busiest_hours: Vec<BusyHourEntry>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
