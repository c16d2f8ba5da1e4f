use crate::geo::{distance_m, LatLng};
use crate::source::ParkingLot;

/// Rough CO2 saving for each kilometre not driven, used for the advice card.
pub const CO2_SAVED_KG_PER_KM: f64 = 0.2;

const WALK_LIMIT_KM: f64 = 1.2;
const NEAR_LIMIT_KM: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelMode {
    Walk,
    Cycle,
    PublicTransport,
    ParkAndWalk,
    ParkAndRide,
    CarShare,
}

/// Suggestion derived from how far the nearest lot sits from the destination.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelAdvice {
    pub modes: Vec<TravelMode>,
    pub nearest_km: Option<f64>,
    pub co2_saved_kg: Option<f64>,
    pub message: String,
}

/// A lot annotated with the figures the result list displays.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedLotView {
    pub lot: ParkingLot,
    pub distance_m: f64,
    pub occupancy_pct: u8,
}

/// Share of capacity currently taken, rounded to whole percent. A lot with
/// zero capacity reads as 0% rather than dividing by zero.
pub fn occupancy_pct(capacity: u32, available_spots: u32) -> u8 {
    if capacity == 0 {
        return 0;
    }
    let taken = capacity.saturating_sub(available_spots);
    let pct = (f64::from(taken) / f64::from(capacity) * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Annotate `lots` with distance from `destination` and occupancy, keeping
/// the input order.
pub fn enrich(destination: LatLng, lots: &[ParkingLot]) -> Vec<DerivedLotView> {
    lots.iter()
        .map(|lot| DerivedLotView {
            distance_m: distance_m(destination, lot.position()),
            occupancy_pct: occupancy_pct(lot.capacity, lot.available_spots),
            lot: lot.clone(),
        })
        .collect()
}

/// Advice keyed on the nearest-lot distance. `None` means the search found
/// no lots at all.
pub fn travel_advice(nearest_distance_m: Option<f64>) -> TravelAdvice {
    let Some(nearest_m) = nearest_distance_m else {
        return TravelAdvice {
            modes: vec![TravelMode::PublicTransport],
            nearest_km: None,
            co2_saved_kg: None,
            message: "No parking found near this destination, public transport is the better bet."
                .to_string(),
        };
    };

    let nearest_km = nearest_m / 1000.0;
    let (modes, message) = if nearest_km <= WALK_LIMIT_KM {
        (
            vec![TravelMode::Walk, TravelMode::Cycle, TravelMode::PublicTransport],
            "Close enough to walk from the car park.",
        )
    } else if nearest_km <= NEAR_LIMIT_KM {
        (
            vec![
                TravelMode::Cycle,
                TravelMode::PublicTransport,
                TravelMode::ParkAndWalk,
            ],
            "A short ride or tram hop covers the last stretch.",
        )
    } else {
        (
            vec![
                TravelMode::PublicTransport,
                TravelMode::ParkAndRide,
                TravelMode::CarShare,
            ],
            "Long drive ahead, park and ride will likely be quicker.",
        )
    };

    TravelAdvice {
        modes,
        nearest_km: Some(round2(nearest_km)),
        co2_saved_kg: Some(round2(nearest_km * CO2_SAVED_KG_PER_KM)),
        message: message.to_string(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
