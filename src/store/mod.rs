pub mod models;
pub mod slot;
mod store;

pub use slot::{reconcile, FetchAction, FetchTracker, SlotId, SlotKind, SlotPhase};
pub use store::EntityStore;
