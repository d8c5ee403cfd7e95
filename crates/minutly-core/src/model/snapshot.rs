use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use minutly_api::{Device, LatestValues, SensorKind};

use super::binary::{BinaryKind, BinaryTriggers};

/// One device's state for one poll cycle.
///
/// `sensors` and `binary` always carry every known kind: an unavailable
/// reading is `None`, an untriggered signal is `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub device: Device,
    pub sensors: BTreeMap<SensorKind, Option<f64>>,
    pub binary: BTreeMap<BinaryKind, bool>,
}

impl DeviceSnapshot {
    /// Assemble a snapshot from this cycle's readings and the event types
    /// seen for the device inside the recency window.
    pub fn build(
        device: Device,
        values: &LatestValues,
        seen: &BTreeSet<String>,
        triggers: &BinaryTriggers,
    ) -> Self {
        let sensors = SensorKind::iter().map(|k| (k, values.get(k))).collect();
        let binary = BinaryKind::iter()
            .map(|k| (k, triggers.is_triggered(k, seen)))
            .collect();
        Self {
            device,
            sensors,
            binary,
        }
    }

    pub fn sensor(&self, kind: SensorKind) -> Option<f64> {
        self.sensors.get(&kind).copied().flatten()
    }

    pub fn is_on(&self, kind: BinaryKind) -> bool {
        self.binary.get(&kind).copied().unwrap_or(false)
    }
}

/// Result of one successful poll cycle, keyed by device id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub devices: BTreeMap<String, DeviceSnapshot>,
}

impl Snapshot {
    pub fn device(&self, device_id: &str) -> Option<&DeviceSnapshot> {
        self.devices.get(device_id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
