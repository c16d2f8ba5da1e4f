use crate::geo::{distance_m, LatLng};
use crate::source::{ParkingLot, Place, MAX_AVAILABILITY_DELTA};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::SystemTime;

/// How many lots the proximity query falls back to when nothing is in range.
pub const NEAREST_FALLBACK_COUNT: usize = 3;

/// Cap on gazetteer matches returned per search.
pub const MAX_GEO_MATCHES: usize = 8;

/// One row of the busiest-hours fixture table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyHour {
    pub hour: u8,
    pub count: u32,
}

/// In-memory dataset backing the fixture data source and the HTTP service.
///
/// Seeded at construction; there is no implicit shared global, so every test
/// can own an independent store.
#[derive(Debug)]
pub struct ParkingStore {
    places: Vec<Place>,
    lots: Vec<ParkingLot>,
    busiest_hours: Vec<BusyHour>,
    rng: StdRng,
}

impl ParkingStore {
    pub fn new(places: Vec<Place>, lots: Vec<ParkingLot>) -> Self {
        Self {
            places,
            lots,
            busiest_hours: default_busiest_hours(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic perturbation for tests.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// The client-side demo dataset: Melbourne gazetteer plus the CP-1xx lots.
    pub fn melbourne_demo() -> Self {
        Self::new(melbourne_gazetteer(), demo_lots())
    }

    /// The dataset the companion HTTP service serves (PARKxxx lots).
    pub fn service_dataset() -> Self {
        Self::new(melbourne_gazetteer(), service_lots())
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn lots(&self) -> &[ParkingLot] {
        &self.lots
    }

    pub fn busiest_hours(&self) -> &[BusyHour] {
        &self.busiest_hours
    }

    /// Case-insensitive substring match over the gazetteer, capped at
    /// [`MAX_GEO_MATCHES`], source order preserved.
    pub fn geo_search(&self, query: &str) -> Vec<Place> {
        let needle = query.to_lowercase();
        self.places
            .iter()
            .filter(|place| place.name.to_lowercase().contains(&needle))
            .take(MAX_GEO_MATCHES)
            .cloned()
            .collect()
    }

    /// First `n` gazetteer entries (the service's empty-query behavior).
    pub fn first_places(&self, n: usize) -> Vec<Place> {
        self.places.iter().take(n).cloned().collect()
    }

    /// Lots within `radius_m` of `center`, source order. When nothing is in
    /// range and the store is non-empty, the three nearest lots are returned
    /// nearest-first so a search never dead-ends on an empty list.
    pub fn lots_near(&self, center: LatLng, radius_m: f64) -> Vec<ParkingLot> {
        let in_range: Vec<ParkingLot> = self
            .lots
            .iter()
            .filter(|lot| distance_m(center, lot.position()) <= radius_m)
            .cloned()
            .collect();
        if !in_range.is_empty() || self.lots.is_empty() {
            return in_range;
        }

        let mut by_distance: Vec<(f64, &ParkingLot)> = self
            .lots
            .iter()
            .map(|lot| (distance_m(center, lot.position()), lot))
            .collect();
        by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));
        by_distance
            .into_iter()
            .take(NEAREST_FALLBACK_COUNT)
            .map(|(_, lot)| lot.clone())
            .collect()
    }

    /// Token match: a lot qualifies when any whitespace-separated token of
    /// `query` is a case-insensitive substring of its name.
    pub fn lots_matching(&self, query: &str) -> Vec<ParkingLot> {
        self.lots
            .iter()
            .filter(|lot| name_matches(&lot.name, query))
            .cloned()
            .collect()
    }

    pub fn lot_by_id(&self, id: &str) -> Option<ParkingLot> {
        self.lots.iter().find(|lot| lot.id == id).cloned()
    }

    /// Apply a pseudo-random availability delta to each known id, clamped to
    /// `[0, capacity]`, and return the refreshed records. Unknown ids are
    /// skipped, not an error.
    pub fn perturb(&mut self, ids: &[String]) -> Vec<ParkingLot> {
        let now = SystemTime::now();
        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(lot) = self.lots.iter_mut().find(|lot| &lot.id == id) else {
                continue;
            };
            let delta = self
                .rng
                .random_range(-MAX_AVAILABILITY_DELTA..=MAX_AVAILABILITY_DELTA);
            let next = i64::from(lot.available_spots) + i64::from(delta);
            lot.available_spots = next.clamp(0, i64::from(lot.capacity)) as u32;
            lot.updated_at = now;
            updated.push(lot.clone());
        }
        updated
    }
}

/// Whether any whitespace-separated token of `query` appears in `name`,
/// case-insensitive.
pub fn name_matches(name: &str, query: &str) -> bool {
    let name = name.to_lowercase();
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .any(|token| name.contains(&token))
}

fn melbourne_gazetteer() -> Vec<Place> {
    [
        ("Federation Square", -37.817979, 144.969093),
        ("Flinders Street Station", -37.818267, 144.967090),
        ("Southern Cross Station", -37.818409, 144.952417),
        ("Melbourne Central", -37.810113, 144.962448),
        ("Queen Victoria Market", -37.807554, 144.956764),
        ("State Library of Victoria", -37.809830, 144.965198),
        ("Docklands", -37.814710, 144.939640),
        ("Carlton Gardens", -37.805328, 144.971684),
        ("Royal Botanic Gardens", -37.830809, 144.979759),
        ("St Kilda Beach", -37.867824, 144.974004),
    ]
    .into_iter()
    .map(|(name, lat, lng)| Place::new(name, lat, lng))
    .collect()
}

fn lot(
    id: &str,
    name: &str,
    lat: f64,
    lng: f64,
    capacity: u32,
    available_spots: u32,
    price: Option<&str>,
) -> ParkingLot {
    ParkingLot {
        id: id.to_string(),
        name: name.to_string(),
        lat,
        lng,
        capacity,
        available_spots,
        price: price.map(str::to_string),
        updated_at: SystemTime::now(),
    }
}

fn demo_lots() -> Vec<ParkingLot> {
    vec![
        lot(
            "CP-101",
            "Federation Square Car Park",
            -37.819052,
            144.968693,
            400,
            132,
            Some("$8.50/hr"),
        ),
        lot(
            "CP-102",
            "Flinders Gate Car Park",
            -37.817154,
            144.966520,
            550,
            61,
            Some("$7.00/hr"),
        ),
        lot(
            "CP-103",
            "Russell Street Car Park",
            -37.813702,
            144.967650,
            320,
            12,
            Some("$6.20/hr"),
        ),
        lot(
            "CP-104",
            "Docklands Harbour Car Park",
            -37.815906,
            144.942583,
            700,
            534,
            Some("$4.00/hr"),
        ),
        lot(
            "CP-105",
            "Carlton Gardens Car Park",
            -37.804865,
            144.970839,
            260,
            98,
            Some("$5.50/hr"),
        ),
        lot(
            "CP-106",
            "St Kilda Esplanade Car Park",
            -37.867210,
            144.976002,
            180,
            121,
            Some("$3.00/hr"),
        ),
    ]
}

fn service_lots() -> Vec<ParkingLot> {
    vec![
        lot(
            "PARK001",
            "Flinders Street Car Park",
            -37.817500,
            144.965800,
            450,
            210,
            None,
        ),
        lot(
            "PARK002",
            "Collins Place Parking",
            -37.813900,
            144.972800,
            600,
            340,
            None,
        ),
        lot(
            "PARK003",
            "Queen Victoria Market Parking",
            -37.806600,
            144.957200,
            720,
            515,
            None,
        ),
        lot(
            "PARK004",
            "Southern Cross Station Car Park",
            -37.818600,
            144.951200,
            380,
            44,
            None,
        ),
        lot(
            "PARK005",
            "Crown Riverside Car Park",
            -37.822700,
            144.958300,
            900,
            655,
            None,
        ),
    ]
}

fn default_busiest_hours() -> Vec<BusyHour> {
    [
        (7, 120),
        (8, 310),
        (9, 290),
        (10, 180),
        (11, 150),
        (12, 210),
        (13, 200),
        (14, 160),
        (15, 170),
        (16, 240),
        (17, 330),
        (18, 260),
    ]
    .into_iter()
    .map(|(hour, count)| BusyHour { hour, count })
    .collect()
}
