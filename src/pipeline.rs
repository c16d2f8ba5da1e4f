use crate::error::AppError;
use crate::feed::{spawn_update_feed, FeedHandle, FeedOptions};
use crate::geo::LatLng;
use crate::source::{DataSource, ParkingLot, Place};
use crate::state::{ResolvePhase, ResultSnapshot, SessionState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);
pub const DEFAULT_SEARCH_RADIUS_M: f64 = 900.0;
pub const MIN_QUERY_LEN: usize = 3;

/// Default map anchor, Melbourne CBD.
pub const DEFAULT_MAP_CENTER: LatLng = LatLng {
    lat: -37.8136,
    lng: 144.9631,
};

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub debounce: Duration,
    pub min_query_len: usize,
    pub radius_m: f64,
    pub map_center: LatLng,
    pub feed: FeedOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            min_query_len: MIN_QUERY_LEN,
            radius_m: DEFAULT_SEARCH_RADIUS_M,
            map_center: DEFAULT_MAP_CENTER,
            feed: FeedOptions::default(),
        }
    }
}

/// Drives a search session: debounced suggestion lookups, destination
/// resolution, and the availability feed for the published snapshot.
///
/// Every resolve draws a fresh generation from `seq`; only the holder of the
/// latest generation may publish, so overlapping resolves settle on the most
/// recent one without any queueing.
pub struct Pipeline {
    source: Arc<dyn DataSource>,
    fallback: Option<Arc<dyn DataSource>>,
    state: Arc<RwLock<SessionState>>,
    seq: AtomicU64,
    debounce_task: Mutex<Option<JoinHandle<()>>>,
    feed: Mutex<Option<FeedHandle>>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn DataSource>,
        fallback: Option<Arc<dyn DataSource>>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            source,
            fallback,
            state: Arc::new(RwLock::new(SessionState::new())),
            seq: AtomicU64::new(0),
            debounce_task: Mutex::new(None),
            feed: Mutex::new(None),
            options,
        }
    }

    pub fn state(&self) -> Arc<RwLock<SessionState>> {
        Arc::clone(&self.state)
    }

    /// React to a keystroke. Queries shorter than the minimum clear the
    /// candidate list; anything longer schedules a suggestion lookup after
    /// the debounce window, replacing any lookup still pending.
    pub fn search_input(self: &Arc<Self>, text: &str) -> Result<(), AppError> {
        let trimmed = text.trim().to_string();
        self.abort_debounce()?;

        if trimmed.chars().count() < self.options.min_query_len {
            let mut guard = self.state.write().map_err(|_| AppError::StateLock)?;
            guard.set_candidates(Vec::new());
            guard.set_phase(ResolvePhase::Idle);
            return Ok(());
        }

        {
            let mut guard = self.state.write().map_err(|_| AppError::StateLock)?;
            guard.set_phase(ResolvePhase::Searching);
        }

        let pipeline = Arc::clone(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(pipeline.options.debounce).await;
            if let Err(err) = pipeline.run_geo_search(&trimmed).await {
                warn!(error = %err, query = %trimmed, "suggestion lookup failed");
            }
        });
        *self.debounce_task.lock().map_err(|_| AppError::StateLock)? = Some(task);
        Ok(())
    }

    /// Resolve a chosen destination into a published result snapshot and
    /// start the availability feed for it. The previous feed is stopped
    /// before any fetch happens, so at most one feed is ever armed. A
    /// resolve that loses the race to a newer one returns without
    /// publishing. A fetch that fails on both sources publishes an empty
    /// snapshot rather than surfacing the error.
    pub async fn resolve(self: &Arc<Self>, destination: Place) -> Result<(), AppError> {
        let generation = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.abort_debounce()?;
        self.cancel_feed()?;
        {
            let mut guard = self.state.write().map_err(|_| AppError::StateLock)?;
            guard.set_phase(ResolvePhase::Resolving);
            guard.set_candidates(Vec::new());
        }

        let (lots, live) = match self.fetch_lots(&destination).await {
            Ok(found) => found,
            Err(err) if err.is_transient() => {
                warn!(
                    error = %err,
                    destination = %destination.name,
                    "lot fetch failed, rendering no results"
                );
                (Vec::new(), Arc::clone(&self.source))
            }
            Err(err) => {
                let mut guard = self.state.write().map_err(|_| AppError::StateLock)?;
                guard.set_phase(ResolvePhase::Idle);
                return Err(err);
            }
        };
        if self.seq.load(Ordering::SeqCst) != generation {
            debug!(generation, "resolve superseded before publishing");
            return Ok(());
        }

        let snapshot = ResultSnapshot {
            destination,
            lots,
            fetched_at: SystemTime::now(),
            generation,
        };

        {
            let mut guard = self.state.write().map_err(|_| AppError::StateLock)?;
            if self.seq.load(Ordering::SeqCst) != generation {
                debug!(generation, "resolve superseded before publishing");
                return Ok(());
            }
            guard.set_snapshot(snapshot);
            guard.set_phase(ResolvePhase::Ready);
        }

        let handle = spawn_update_feed(live, self.state(), generation, self.options.feed);
        *self.feed.lock().map_err(|_| AppError::StateLock)? = Some(handle);
        Ok(())
    }

    /// Enter-key path: resolve the first place the text geocodes to. Text
    /// with no geocoding hit resolves as a destination anchored at the map
    /// center instead of failing the search.
    pub async fn submit_text(self: &Arc<Self>, text: &str) -> Result<(), AppError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        self.abort_debounce()?;
        let destination = match self.search_places(trimmed).await {
            Ok(mut places) if !places.is_empty() => places.remove(0),
            Ok(_) => self.anchored_place(trimmed),
            Err(err) if err.is_transient() => {
                warn!(error = %err, query = trimmed, "submit lookup failed, anchoring raw text");
                self.anchored_place(trimmed)
            }
            Err(err) => return Err(err),
        };
        self.resolve(destination).await
    }

    /// Session teardown: abort the pending lookup, strand any in-flight
    /// resolve, stop the feed, and clear candidates and snapshot back to
    /// Idle.
    pub fn cancel(&self) -> Result<(), AppError> {
        self.abort_debounce()?;
        self.seq.fetch_add(1, Ordering::SeqCst);
        self.cancel_feed()?;
        let mut guard = self.state.write().map_err(|_| AppError::StateLock)?;
        guard.set_candidates(Vec::new());
        guard.clear_snapshot();
        guard.set_phase(ResolvePhase::Idle);
        Ok(())
    }

    fn abort_debounce(&self) -> Result<(), AppError> {
        if let Some(task) = self
            .debounce_task
            .lock()
            .map_err(|_| AppError::StateLock)?
            .take()
        {
            task.abort();
        }
        Ok(())
    }

    fn cancel_feed(&self) -> Result<(), AppError> {
        if let Some(feed) = self.feed.lock().map_err(|_| AppError::StateLock)?.take() {
            feed.cancel();
        }
        Ok(())
    }

    fn anchored_place(&self, name: &str) -> Place {
        Place::new(
            name,
            self.options.map_center.lat,
            self.options.map_center.lng,
        )
    }

    async fn run_geo_search(&self, query: &str) -> Result<(), AppError> {
        let candidates = self.search_places(query).await?;
        let mut guard = self.state.write().map_err(|_| AppError::StateLock)?;
        guard.set_candidates(candidates);
        Ok(())
    }

    async fn search_places(&self, query: &str) -> Result<Vec<Place>, AppError> {
        match self.source.geo_search(query).await {
            Ok(places) => Ok(places),
            Err(err) if err.is_transient() => {
                let Some(fallback) = &self.fallback else {
                    return Err(err);
                };
                warn!(error = %err, "live geocoding failed, serving fixture places");
                fallback.geo_search(query).await
            }
            Err(err) => Err(err),
        }
    }

    async fn fetch_lots(
        &self,
        destination: &Place,
    ) -> Result<(Vec<ParkingLot>, Arc<dyn DataSource>), AppError> {
        match self.query_source(&self.source, destination).await {
            Ok(lots) => Ok((lots, Arc::clone(&self.source))),
            Err(err) if err.is_transient() => {
                let Some(fallback) = &self.fallback else {
                    return Err(err);
                };
                warn!(error = %err, "live lot fetch failed, serving fixture data");
                let lots = self.query_source(fallback, destination).await?;
                Ok((lots, Arc::clone(fallback)))
            }
            Err(err) => Err(err),
        }
    }

    async fn query_source(
        &self,
        source: &Arc<dyn DataSource>,
        destination: &Place,
    ) -> Result<Vec<ParkingLot>, AppError> {
        if source.supports_proximity() {
            source
                .parking_near(destination.position(), self.options.radius_m)
                .await
        } else {
            source.parking_by_name(&destination.name).await
        }
    }
}
