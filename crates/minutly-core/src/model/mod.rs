// ── Snapshot domain model ──
//
// What a poll cycle produces. Sensor readings come straight from the API;
// binary signals are derived from timeline event types.

pub mod binary;
pub mod snapshot;

pub use binary::{BinaryKind, BinaryTriggers};
pub use snapshot::{DeviceSnapshot, Snapshot};
