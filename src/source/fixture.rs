use crate::error::AppError;
use crate::geo::LatLng;
use crate::source::{DataSource, ParkingLot, Place};
use crate::store::ParkingStore;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// Data source backed entirely by an in-process [`ParkingStore`]. This is the
/// default source, so the whole pipeline runs without any network.
pub struct FixtureSource {
    store: Arc<RwLock<ParkingStore>>,
}

impl FixtureSource {
    pub fn new(store: Arc<RwLock<ParkingStore>>) -> Self {
        Self { store }
    }

    pub fn melbourne_demo() -> Self {
        Self::new(Arc::new(RwLock::new(ParkingStore::melbourne_demo())))
    }
}

#[async_trait]
impl DataSource for FixtureSource {
    async fn geo_search(&self, query: &str) -> Result<Vec<Place>, AppError> {
        let store = self.store.read().map_err(|_| AppError::StateLock)?;
        Ok(store.geo_search(query))
    }

    async fn parking_near(
        &self,
        center: LatLng,
        radius_m: f64,
    ) -> Result<Vec<ParkingLot>, AppError> {
        let store = self.store.read().map_err(|_| AppError::StateLock)?;
        Ok(store.lots_near(center, radius_m))
    }

    async fn parking_by_name(&self, destination: &str) -> Result<Vec<ParkingLot>, AppError> {
        let store = self.store.read().map_err(|_| AppError::StateLock)?;
        Ok(store.lots_matching(destination))
    }

    async fn push_updates(&self, ids: &[String]) -> Result<Vec<ParkingLot>, AppError> {
        let mut store = self.store.write().map_err(|_| AppError::StateLock)?;
        Ok(store.perturb(ids))
    }

    fn supports_proximity(&self) -> bool {
        true
    }
}
