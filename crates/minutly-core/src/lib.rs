// minutly-core: Polling coordinator between minutly-api and hosts (CLI, daemons).

pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod model;
pub mod setup;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CoordinatorConfig, EventSource};
pub use coordinator::{Coordinator, CoordinatorHealth};
pub use entity::{DeviceInfo, ENTITY_DESCRIPTIONS, Entity, EntityDescription, EntityKind, EntityState};
pub use error::CoreError;
pub use model::{BinaryKind, BinaryTriggers, DeviceSnapshot, Snapshot};
pub use setup::{AuthInput, SetupErrorCode, SetupOutcome, authenticate};

// Wire types consumers need alongside the coordinator.
pub use minutly_api::{ClientConfig, Device, LatestValues, MinutClient, SensorKind, Tokens};
