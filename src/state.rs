use crate::geo::distance_m;
use crate::metrics::{enrich, travel_advice, DerivedLotView, TravelAdvice};
use crate::source::{ParkingLot, Place};
use std::time::SystemTime;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvePhase {
    Idle,
    Searching,
    Resolving,
    Ready,
}

/// One resolved search: the destination that was settled on and the lots
/// fetched for it, kept in source order. `generation` identifies the resolve
/// that produced it; later merges must carry the same generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSnapshot {
    pub destination: Place,
    pub lots: Vec<ParkingLot>,
    pub fetched_at: SystemTime,
    pub generation: u64,
}

impl ResultSnapshot {
    pub fn lot_ids(&self) -> Vec<String> {
        self.lots.iter().map(|lot| lot.id.clone()).collect()
    }

    /// Annotated rows for rendering. Derived from the current lot list on
    /// every call so feed merges are always reflected.
    pub fn views(&self) -> Vec<DerivedLotView> {
        enrich(self.destination.position(), &self.lots)
    }

    /// Travel guidance keyed on the nearest fetched lot.
    pub fn advice(&self) -> TravelAdvice {
        let nearest = self
            .lots
            .iter()
            .map(|lot| distance_m(self.destination.position(), lot.position()))
            .min_by(f64::total_cmp);
        travel_advice(nearest)
    }
}

/// Session values mirrored into watch channels. Any number of renderers may
/// subscribe; publishing works with none attached.
#[derive(Debug)]
pub struct SessionState {
    phase: ResolvePhase,
    phase_tx: watch::Sender<ResolvePhase>,
    candidates: Vec<Place>,
    candidates_tx: watch::Sender<Vec<Place>>,
    snapshot: Option<ResultSnapshot>,
    snapshot_tx: watch::Sender<Option<ResultSnapshot>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: ResolvePhase::Idle,
            phase_tx: watch::Sender::new(ResolvePhase::Idle),
            candidates: Vec::new(),
            candidates_tx: watch::Sender::new(Vec::new()),
            snapshot: None,
            snapshot_tx: watch::Sender::new(None),
        }
    }

    pub fn phase(&self) -> ResolvePhase {
        self.phase
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<ResolvePhase> {
        self.phase_tx.subscribe()
    }

    pub fn set_phase(&mut self, phase: ResolvePhase) {
        self.phase = phase;
        self.phase_tx.send_replace(phase);
    }

    pub fn candidates(&self) -> &[Place] {
        &self.candidates
    }

    pub fn subscribe_candidates(&self) -> watch::Receiver<Vec<Place>> {
        self.candidates_tx.subscribe()
    }

    pub fn set_candidates(&mut self, candidates: Vec<Place>) {
        self.candidates = candidates.clone();
        self.candidates_tx.send_replace(candidates);
    }

    pub fn snapshot(&self) -> Option<&ResultSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<Option<ResultSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub fn set_snapshot(&mut self, snapshot: ResultSnapshot) {
        self.snapshot = Some(snapshot.clone());
        self.snapshot_tx.send_replace(Some(snapshot));
    }

    pub fn clear_snapshot(&mut self) {
        self.snapshot = None;
        self.snapshot_tx.send_replace(None);
    }

    /// Merge refreshed lot records into the current snapshot. Updates carry
    /// the generation of the snapshot they were collected against; a mismatch
    /// means a newer resolve landed in between and the batch is discarded.
    /// Returns whether the merge was applied.
    pub fn apply_updates(&mut self, generation: u64, updates: &[ParkingLot]) -> bool {
        let Some(snapshot) = self.snapshot.as_mut() else {
            return false;
        };
        if snapshot.generation != generation {
            return false;
        }

        for update in updates {
            let Some(lot) = snapshot.lots.iter_mut().find(|lot| lot.id == update.id) else {
                continue;
            };
            lot.available_spots = update.available_spots;
            lot.updated_at = update.updated_at;
            lot.clamp_available();
        }

        self.snapshot_tx.send_replace(self.snapshot.clone());
        true
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::TravelMode;
    use std::time::{Duration, UNIX_EPOCH};

    fn lot(id: &str, capacity: u32, available: u32) -> ParkingLot {
        ParkingLot {
            id: id.to_string(),
            name: format!("{id} Car Park"),
            lat: -37.8190,
            lng: 144.9686,
            capacity,
            available_spots: available,
            price: None,
            updated_at: UNIX_EPOCH,
        }
    }

    fn snapshot(generation: u64) -> ResultSnapshot {
        ResultSnapshot {
            destination: Place::new("Federation Square", -37.817979, 144.969093),
            lots: vec![lot("CP-101", 400, 132), lot("CP-103", 320, 12)],
            fetched_at: UNIX_EPOCH,
            generation,
        }
    }

    #[test]
    fn set_candidates_updates_state_and_watch() {
        let mut state = SessionState::new();
        let receiver = state.subscribe_candidates();
        let candidates = vec![Place::new("Federation Square", -37.817979, 144.969093)];

        state.set_candidates(candidates.clone());

        assert_eq!(state.candidates(), candidates.as_slice());
        assert_eq!(receiver.borrow().as_slice(), candidates.as_slice());
    }

    #[test]
    fn set_snapshot_updates_state_and_watch() {
        let mut state = SessionState::new();
        let receiver = state.subscribe_snapshot();
        let snapshot = snapshot(1);

        state.set_snapshot(snapshot.clone());

        assert_eq!(state.snapshot(), Some(&snapshot));
        assert_eq!(*receiver.borrow(), Some(snapshot));
    }

    #[test]
    fn clear_snapshot_notifies_watchers() {
        let mut state = SessionState::new();
        let receiver = state.subscribe_snapshot();
        state.set_snapshot(snapshot(1));

        state.clear_snapshot();

        assert!(state.snapshot().is_none());
        assert_eq!(*receiver.borrow(), None);
    }

    #[test]
    fn phase_moves_through_the_resolve_cycle() {
        let mut state = SessionState::new();
        let receiver = state.subscribe_phase();

        assert_eq!(state.phase(), ResolvePhase::Idle);
        state.set_phase(ResolvePhase::Searching);
        state.set_phase(ResolvePhase::Resolving);
        state.set_phase(ResolvePhase::Ready);

        assert_eq!(state.phase(), ResolvePhase::Ready);
        assert_eq!(*receiver.borrow(), ResolvePhase::Ready);
    }

    #[test]
    fn late_subscribers_see_values_set_without_any_receiver() {
        let mut state = SessionState::new();

        state.set_phase(ResolvePhase::Ready);
        state.set_candidates(vec![Place::new(
            "Federation Square",
            -37.817979,
            144.969093,
        )]);
        state.set_snapshot(snapshot(2));

        assert_eq!(*state.subscribe_phase().borrow(), ResolvePhase::Ready);
        assert_eq!(state.subscribe_candidates().borrow().len(), 1);
        assert!(state.subscribe_snapshot().borrow().is_some());
    }

    #[test]
    fn apply_updates_merges_matching_generation() {
        let mut state = SessionState::new();
        state.set_snapshot(snapshot(3));
        let update = ParkingLot {
            available_spots: 200,
            updated_at: UNIX_EPOCH + Duration::from_secs(60),
            ..lot("CP-101", 400, 132)
        };

        let applied = state.apply_updates(3, &[update]);

        assert!(applied);
        let merged = state.snapshot().expect("snapshot present");
        assert_eq!(merged.lots[0].available_spots, 200);
        assert_eq!(merged.lots[0].updated_at, UNIX_EPOCH + Duration::from_secs(60));
        assert_eq!(merged.views()[0].occupancy_pct, 50);
    }

    #[test]
    fn apply_updates_discards_stale_generation() {
        let mut state = SessionState::new();
        state.set_snapshot(snapshot(4));
        let update = lot("CP-101", 400, 0);

        let applied = state.apply_updates(3, &[update]);

        assert!(!applied);
        let untouched = state.snapshot().expect("snapshot present");
        assert_eq!(untouched.lots[0].available_spots, 132);
    }

    #[test]
    fn apply_updates_clamps_out_of_range_counts() {
        let mut state = SessionState::new();
        state.set_snapshot(snapshot(5));
        let update = ParkingLot {
            available_spots: 999,
            ..lot("CP-103", 320, 12)
        };

        let applied = state.apply_updates(5, &[update]);

        assert!(applied);
        let merged = state.snapshot().expect("snapshot present");
        assert_eq!(merged.lots[1].available_spots, 320);
        assert_eq!(merged.views()[1].occupancy_pct, 0);
    }

    #[test]
    fn apply_updates_without_snapshot_is_a_no_op() {
        let mut state = SessionState::new();

        let applied = state.apply_updates(1, &[lot("CP-101", 400, 10)]);

        assert!(!applied);
        assert!(state.snapshot().is_none());
    }

    #[test]
    fn apply_updates_skips_unknown_lots() {
        let mut state = SessionState::new();
        state.set_snapshot(snapshot(6));
        let update = lot("CP-999", 100, 50);

        let applied = state.apply_updates(6, &[update]);

        assert!(applied);
        let merged = state.snapshot().expect("snapshot present");
        assert!(merged.lots.iter().all(|lot| lot.id != "CP-999"));
    }

    #[test]
    fn views_and_advice_are_recomputed_from_the_lot_list() {
        let snapshot = snapshot(1);

        let views = snapshot.views();
        let advice = snapshot.advice();

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].occupancy_pct, 67);
        assert_eq!(advice.modes[0], TravelMode::Walk);
        assert_eq!(advice.nearest_km, Some(0.12));
    }
}
