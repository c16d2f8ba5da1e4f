use crate::store::ParkingStore;
use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use std::sync::{Arc, RwLock};
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod responses;

pub fn router(store: Arc<RwLock<ParkingStore>>) -> Router {
    Router::new()
        .route("/api/v1/parking", get(handlers::get_parking))
        .route("/api/v1/parking/{id}", get(handlers::get_parking_detail))
        .route("/api/v1/geo/search", get(handlers::get_geo_search))
        .route("/api/v1/environment", get(handlers::get_environment))
        .route("/api/v1/stats/parking", get(handlers::get_parking_stats))
        .layer(build_cors())
        .with_state(store)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE])
}
