pub mod address;
pub mod time;

pub use address::normalize_address;
pub use time::{delta_timestamps, interval_timestamps, DeltaTimestamps};
