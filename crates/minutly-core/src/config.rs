// ── Runtime coordinator configuration ──
//
// Describes *how* a coordinator polls: cadence, recency window, where
// events come from and which event types drive each binary signal.
// Hosts build a `CoordinatorConfig` and hand it in; core never reads files.

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::model::BinaryTriggers;

/// Default poll cadence.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(15);

/// Which timeline feed a poll cycle reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EventSource {
    /// One timeline request per device.
    #[default]
    PerDevice,
    /// One account-wide timeline request covering every device.
    Account,
}

/// Configuration for a single [`Coordinator`](crate::Coordinator).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Background loop cadence. Zero disables the loop.
    pub scan_interval: Duration,
    /// Events older than this are ignored when deriving binary state.
    pub event_window: TimeDelta,
    pub event_source: EventSource,
    pub triggers: BinaryTriggers,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            scan_interval: DEFAULT_SCAN_INTERVAL,
            event_window: minutly_api::default_event_window(),
            event_source: EventSource::default(),
            triggers: BinaryTriggers::default(),
        }
    }
}
