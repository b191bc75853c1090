//! Per-slot fetch state machine and the reconciliation function that drives
//! fetch triggering.
//!
//! The cache store holds only populated-or-absent data; whether a slot is
//! being fetched or has errored lives here, keyed by slot identity. Making
//! the phase a tagged enum keeps "fetching and errored at once" impossible.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::networks::NetworkId;

/// Key used for the per-network protocol aggregate, which has no address.
pub const PROTOCOL_KEY: &str = "_protocol";

/// One independently fetched sub-component of an entity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Summary,
    Chart,
    Price { interval_secs: u64 },
    Transactions,
    PoolList,
}

/// Identity of one slot: the write target of exactly one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotId {
    pub network: NetworkId,
    pub address: String,
    pub kind: SlotKind,
}

impl SlotId {
    pub fn new(network: NetworkId, address: impl Into<String>, kind: SlotKind) -> Self {
        Self {
            network,
            address: address.into(),
            kind,
        }
    }

    pub fn protocol(network: NetworkId, kind: SlotKind) -> Self {
        Self::new(network, PROTOCOL_KEY, kind)
    }
}

/// Fetch phase of a slot. `Idle` covers both never-fetched and
/// fetched-and-settled; whether data exists is the store's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotPhase {
    #[default]
    Idle,
    Fetching,
    Errored,
}

/// What the fetch layer should do for a slot right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchAction {
    /// Slot is populated; read from the store.
    UseCached,
    /// Start a fetch.
    Fetch,
    /// A fetch for this exact slot is already outstanding; do nothing.
    InFlight,
    /// A previous fetch errored and nobody reset it; do not retry.
    Stalled,
}

/// Pure reconciliation: given whether the slot is populated and its phase,
/// decide the action. Populated data always wins, so a late write from a
/// still-outstanding fetch only refreshes the same key.
pub fn reconcile(populated: bool, phase: SlotPhase) -> FetchAction {
    if populated {
        return FetchAction::UseCached;
    }
    match phase {
        SlotPhase::Idle => FetchAction::Fetch,
        SlotPhase::Fetching => FetchAction::InFlight,
        SlotPhase::Errored => FetchAction::Stalled,
    }
}

/// Shared tracker of slot phases.
///
/// `plan` applies [`reconcile`] and transitions the slot to `Fetching` in the
/// same lock acquisition when it answers `Fetch`, which closes the race where
/// two interleaved evaluations of the same slot would both start a fetch.
#[derive(Clone, Default)]
pub struct FetchTracker {
    phases: Arc<Mutex<FxHashMap<SlotId, SlotPhase>>>,
}

impl FetchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, id: &SlotId) -> SlotPhase {
        let phases = self.phases.lock().expect("tracker lock poisoned");
        phases.get(id).copied().unwrap_or_default()
    }

    /// Reconciles one slot and claims it when a fetch is due.
    pub fn plan(&self, id: &SlotId, populated: bool) -> FetchAction {
        let mut phases = self.phases.lock().expect("tracker lock poisoned");
        let phase = phases.get(id).copied().unwrap_or_default();
        let action = reconcile(populated, phase);
        if action == FetchAction::Fetch {
            phases.insert(id.clone(), SlotPhase::Fetching);
        }
        action
    }

    /// Marks a fetch as settled successfully.
    pub fn complete(&self, id: &SlotId) {
        let mut phases = self.phases.lock().expect("tracker lock poisoned");
        phases.insert(id.clone(), SlotPhase::Idle);
    }

    /// Marks a fetch as failed. The slot stays stalled until `reset`.
    pub fn fail(&self, id: &SlotId) {
        let mut phases = self.phases.lock().expect("tracker lock poisoned");
        phases.insert(id.clone(), SlotPhase::Errored);
    }

    /// Clears a slot's phase so the next plan may fetch again. This is the
    /// consumer's explicit retry, the remount analog.
    pub fn reset(&self, id: &SlotId) {
        let mut phases = self.phases.lock().expect("tracker lock poisoned");
        phases.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot() -> SlotId {
        SlotId::new(
            NetworkId::Ethereum,
            "0x00000000000000000000000000000000000000aa",
            SlotKind::Price { interval_secs: 3600 },
        )
    }

    #[test]
    fn reconcile_table() {
        assert_eq!(reconcile(true, SlotPhase::Idle), FetchAction::UseCached);
        assert_eq!(reconcile(true, SlotPhase::Fetching), FetchAction::UseCached);
        assert_eq!(reconcile(false, SlotPhase::Idle), FetchAction::Fetch);
        assert_eq!(reconcile(false, SlotPhase::Fetching), FetchAction::InFlight);
        assert_eq!(reconcile(false, SlotPhase::Errored), FetchAction::Stalled);
    }

    #[test]
    fn plan_claims_the_fetch_exactly_once() {
        let tracker = FetchTracker::new();
        let id = slot();

        // rapid re-evaluation for the same (address, interval) issues one fetch
        assert_eq!(tracker.plan(&id, false), FetchAction::Fetch);
        assert_eq!(tracker.plan(&id, false), FetchAction::InFlight);

        tracker.complete(&id);
        assert_eq!(tracker.plan(&id, true), FetchAction::UseCached);
    }

    #[test]
    fn errored_slot_does_not_retry_until_reset() {
        let tracker = FetchTracker::new();
        let id = slot();

        assert_eq!(tracker.plan(&id, false), FetchAction::Fetch);
        tracker.fail(&id);
        assert_eq!(tracker.plan(&id, false), FetchAction::Stalled);
        assert_eq!(tracker.plan(&id, false), FetchAction::Stalled);

        tracker.reset(&id);
        assert_eq!(tracker.plan(&id, false), FetchAction::Fetch);
    }

    #[test]
    fn intervals_track_separately() {
        let tracker = FetchTracker::new();
        let hourly = slot();
        let daily = SlotId::new(
            hourly.network,
            hourly.address.clone(),
            SlotKind::Price {
                interval_secs: 86_400,
            },
        );

        assert_eq!(tracker.plan(&hourly, false), FetchAction::Fetch);
        assert_eq!(tracker.plan(&daily, false), FetchAction::Fetch);
    }
}
