// ── Entity descriptions ──
//
// One generic `Entity` type parameterized by a row of a static description
// table, instead of one type per sensor or binary kind. Entities are
// stateless views: their state is read from whichever snapshot is current.

use std::fmt;

use serde::Serialize;

use minutly_api::{Device, SensorKind};

use crate::model::{BinaryKind, Snapshot};

pub const MANUFACTURER: &str = "Minut";
pub const DEFAULT_MODEL: &str = "Point";

/// What an entity reads from a [`DeviceSnapshot`](crate::DeviceSnapshot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "kind", rename_all = "snake_case")]
pub enum EntityKind {
    Sensor(SensorKind),
    Binary(BinaryKind),
}

/// Static metadata for one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityDescription {
    /// Suffix of the unique id.
    pub key: &'static str,
    pub name: &'static str,
    pub kind: EntityKind,
    pub unit: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub state_class: Option<&'static str>,
}

pub static ENTITY_DESCRIPTIONS: &[EntityDescription] = &[
    EntityDescription {
        key: "temperature",
        name: "Temperature",
        kind: EntityKind::Sensor(SensorKind::Temperature),
        unit: Some("°C"),
        device_class: Some("temperature"),
        state_class: Some("measurement"),
    },
    EntityDescription {
        key: "humidity",
        name: "Humidity",
        kind: EntityKind::Sensor(SensorKind::Humidity),
        unit: Some("%"),
        device_class: Some("humidity"),
        state_class: Some("measurement"),
    },
    EntityDescription {
        key: "noise",
        name: "Noise Level",
        kind: EntityKind::Sensor(SensorKind::Noise),
        unit: Some("dBA"),
        device_class: Some("sound_pressure"),
        state_class: Some("measurement"),
    },
    EntityDescription {
        key: "motion",
        name: "Motion",
        kind: EntityKind::Binary(BinaryKind::Motion),
        unit: None,
        device_class: Some("motion"),
        state_class: None,
    },
    EntityDescription {
        key: "alarm",
        name: "Alarm",
        kind: EntityKind::Binary(BinaryKind::Alarm),
        unit: None,
        device_class: Some("sound"),
        state_class: None,
    },
];

/// Identity of the physical device an entity belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: String,
}

impl DeviceInfo {
    pub fn from_device(device_id: &str, device: &Device) -> Self {
        Self {
            identifier: device_id.to_owned(),
            name: device
                .display_name()
                .map_or_else(|| format!("Point {device_id}"), str::to_owned),
            manufacturer: MANUFACTURER,
            model: device.model().unwrap_or(DEFAULT_MODEL).to_owned(),
        }
    }
}

/// Current value of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Measurement(f64),
    /// Reading unavailable this cycle. Never reported as zero.
    Unknown,
    On,
    Off,
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measurement(v) => write!(f, "{v}"),
            Self::Unknown => f.write_str("unknown"),
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
        }
    }
}

/// One exposed value of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub description: &'static EntityDescription,
    pub device_id: String,
    pub unique_id: String,
    pub device_info: DeviceInfo,
}

impl Entity {
    pub fn new(description: &'static EntityDescription, device_id: &str, device: &Device) -> Self {
        Self {
            description,
            device_id: device_id.to_owned(),
            unique_id: format!("{device_id}_{}", description.key),
            device_info: DeviceInfo::from_device(device_id, device),
        }
    }

    /// Every entity for every device in `snapshot`, device by device.
    pub fn for_snapshot(snapshot: &Snapshot) -> Vec<Self> {
        snapshot
            .devices
            .iter()
            .flat_map(|(id, dev)| {
                ENTITY_DESCRIPTIONS
                    .iter()
                    .map(move |desc| Self::new(desc, id, &dev.device))
            })
            .collect()
    }

    /// "{device name} {entity name}".
    pub fn display_name(&self) -> String {
        format!("{} {}", self.device_info.name, self.description.name)
    }

    /// Whether the device is part of `snapshot`.
    pub fn available(&self, snapshot: &Snapshot) -> bool {
        snapshot.device(&self.device_id).is_some()
    }

    /// Read this entity's state from `snapshot`.
    pub fn state(&self, snapshot: &Snapshot) -> EntityState {
        let Some(dev) = snapshot.device(&self.device_id) else {
            return EntityState::Unknown;
        };
        match self.description.kind {
            EntityKind::Sensor(kind) => {
                dev.sensor(kind).map_or(EntityState::Unknown, EntityState::Measurement)
            }
            EntityKind::Binary(kind) if dev.is_on(kind) => EntityState::On,
            EntityKind::Binary(_) => EntityState::Off,
        }
    }
}
