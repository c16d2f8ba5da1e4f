use crate::api::responses::{
    BusyHourEntry, EnvironmentResponse, ErrorResponse, GeoSearchSuccessResponse, LotRecord,
    OccupancyEntry, PlaceRecord, StatsSuccessResponse,
};
use crate::geo::LatLng;
use crate::pipeline::DEFAULT_SEARCH_RADIUS_M;
use crate::store::{name_matches, ParkingStore};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use tracing::error;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
const NOT_FOUND_MESSAGE: &str = "Not found";

/// Gazetteer entries returned when the search query is empty.
const EMPTY_QUERY_LIMIT: usize = 5;

const PUBLIC_TRANSPORT_MODES: [&str; 3] = ["train", "tram", "bus"];
const ENVIRONMENT_CO2_SAVED_KG: f64 = 864.2;

#[derive(Debug, Default, Deserialize)]
pub struct ParkingQuery {
    pub dest: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GeoSearchQuery {
    pub q: Option<String>,
}

pub enum ParkingListResponse {
    Success(Vec<LotRecord>),
    Error {
        status: StatusCode,
        body: ErrorResponse,
    },
}

impl IntoResponse for ParkingListResponse {
    fn into_response(self) -> Response {
        match self {
            ParkingListResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            ParkingListResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_parking(
    State(store): State<Arc<RwLock<ParkingStore>>>,
    Query(query): Query<ParkingQuery>,
) -> impl IntoResponse {
    build_parking_response(store, query)
}

pub enum ParkingDetailResponse {
    Success(LotRecord),
    Error {
        status: StatusCode,
        body: ErrorResponse,
    },
}

impl IntoResponse for ParkingDetailResponse {
    fn into_response(self) -> Response {
        match self {
            ParkingDetailResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            ParkingDetailResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_parking_detail(
    State(store): State<Arc<RwLock<ParkingStore>>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    build_parking_detail_response(store, &id)
}

pub enum GeoSearchResponse {
    Success(GeoSearchSuccessResponse),
    Error {
        status: StatusCode,
        body: ErrorResponse,
    },
}

impl IntoResponse for GeoSearchResponse {
    fn into_response(self) -> Response {
        match self {
            GeoSearchResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            GeoSearchResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_geo_search(
    State(store): State<Arc<RwLock<ParkingStore>>>,
    Query(query): Query<GeoSearchQuery>,
) -> impl IntoResponse {
    build_geo_search_response(store, query)
}

pub async fn get_environment() -> impl IntoResponse {
    Json(build_environment_response())
}

pub enum StatsResponse {
    Success(StatsSuccessResponse),
    Error {
        status: StatusCode,
        body: ErrorResponse,
    },
}

impl IntoResponse for StatsResponse {
    fn into_response(self) -> Response {
        match self {
            StatsResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            StatsResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_parking_stats(
    State(store): State<Arc<RwLock<ParkingStore>>>,
) -> impl IntoResponse {
    build_stats_response(store)
}

fn build_parking_response(
    store: Arc<RwLock<ParkingStore>>,
    query: ParkingQuery,
) -> ParkingListResponse {
    let guard = match store.read() {
        Ok(guard) => guard,
        Err(_) => {
            return list_internal_error("store lock poisoned while listing parking");
        }
    };
    let mut lots = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => {
            let radius = query.radius.unwrap_or(DEFAULT_SEARCH_RADIUS_M);
            guard.lots_near(LatLng::new(lat, lng), radius)
        }
        _ => guard.lots().to_vec(),
    };
    drop(guard);

    if let Some(dest) = query.dest.as_deref().map(str::trim)
        && !dest.is_empty()
    {
        lots.retain(|lot| name_matches(&lot.name, dest));
    }

    ParkingListResponse::Success(lots.iter().map(LotRecord::from).collect())
}

fn build_parking_detail_response(
    store: Arc<RwLock<ParkingStore>>,
    id: &str,
) -> ParkingDetailResponse {
    let guard = match store.read() {
        Ok(guard) => guard,
        Err(_) => {
            return detail_internal_error("store lock poisoned while reading lot detail");
        }
    };

    match guard.lot_by_id(id) {
        Some(lot) => ParkingDetailResponse::Success(LotRecord::from(&lot)),
        None => ParkingDetailResponse::Error {
            status: StatusCode::NOT_FOUND,
            body: ErrorResponse {
                error: NOT_FOUND_MESSAGE.to_string(),
            },
        },
    }
}

fn build_geo_search_response(
    store: Arc<RwLock<ParkingStore>>,
    query: GeoSearchQuery,
) -> GeoSearchResponse {
    let guard = match store.read() {
        Ok(guard) => guard,
        Err(_) => {
            return geo_internal_error("store lock poisoned while searching places");
        }
    };

    let q = query.q.as_deref().map(str::trim).unwrap_or("");
    let places = if q.is_empty() {
        guard.first_places(EMPTY_QUERY_LIMIT)
    } else {
        guard.geo_search(q)
    };

    GeoSearchResponse::Success(GeoSearchSuccessResponse {
        items: places.iter().map(PlaceRecord::from).collect(),
    })
}

fn build_environment_response() -> EnvironmentResponse {
    EnvironmentResponse {
        public_transport: PUBLIC_TRANSPORT_MODES
            .iter()
            .map(ToString::to_string)
            .collect(),
        co2_saved_kg: ENVIRONMENT_CO2_SAVED_KG,
    }
}

fn build_stats_response(store: Arc<RwLock<ParkingStore>>) -> StatsResponse {
    let guard = match store.read() {
        Ok(guard) => guard,
        Err(_) => {
            return stats_internal_error("store lock poisoned while computing stats");
        }
    };

    let average_occupancy = guard.lots().iter().map(OccupancyEntry::from).collect();
    let busiest_hours = guard
        .busiest_hours()
        .iter()
        .map(|row| BusyHourEntry {
            hour: row.hour,
            count: row.count,
        })
        .collect();

    StatsResponse::Success(StatsSuccessResponse {
        average_occupancy,
        busiest_hours,
    })
}

fn list_internal_error(message: &str) -> ParkingListResponse {
    error!(message = message, "Internal error while handling /api/v1/parking");
    ParkingListResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error: INTERNAL_ERROR_MESSAGE.to_string(),
        },
    }
}

fn detail_internal_error(message: &str) -> ParkingDetailResponse {
    error!(
        message = message,
        "Internal error while handling /api/v1/parking/{{id}}"
    );
    ParkingDetailResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error: INTERNAL_ERROR_MESSAGE.to_string(),
        },
    }
}

fn geo_internal_error(message: &str) -> GeoSearchResponse {
    error!(
        message = message,
        "Internal error while handling /api/v1/geo/search"
    );
    GeoSearchResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error: INTERNAL_ERROR_MESSAGE.to_string(),
        },
    }
}

fn stats_internal_error(message: &str) -> StatsResponse {
    error!(
        message = message,
        "Internal error while handling /api/v1/stats/parking"
    );
    StatsResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error: INTERNAL_ERROR_MESSAGE.to_string(),
        },
    }
}
