// Wire models and response-shape normalization
//
// Every endpoint family tolerates two body shapes: a bare JSON array, or an
// object wrapping the array under a well-known key. Normalization lives here
// so the request modules only deal with transport and status handling.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ── Sensor kinds ────────────────────────────────────────────────────

/// Sensor kinds read from per-kind "latest value" endpoints.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Noise,
}

// ── Device ──────────────────────────────────────────────────────────

/// A device as returned by the device-list endpoint.
///
/// Kept as an opaque JSON object: vendor fields pass through untouched,
/// accessors pick out the handful we rely on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Device(Map<String, Value>);

impl Device {
    /// Device identifier, from `id` or `device_id` (string or number).
    pub fn id(&self) -> Option<String> {
        ["id", "device_id"]
            .iter()
            .find_map(|key| scalar_to_string(self.0.get(*key)?))
    }

    /// Human label, from `description` or `name`.
    pub fn display_name(&self) -> Option<&str> {
        ["description", "name"]
            .iter()
            .find_map(|key| self.0.get(*key)?.as_str().filter(|s| !s.is_empty()))
    }

    pub fn model(&self) -> Option<&str> {
        self.0.get("model")?.as_str().filter(|s| !s.is_empty())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Normalize a device-list body: bare list or `{"devices": [...]}`.
///
/// An object without a `devices` key yields an empty list. Non-object
/// items are skipped.
pub(crate) fn devices_from_body(body: Value) -> Option<Vec<Device>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("devices") {
            Some(Value::Array(items)) => items,
            Some(_) => return None,
            None => Vec::new(),
        },
        _ => return None,
    };
    Some(
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(Device(map)),
                _ => None,
            })
            .collect(),
    )
}

// ── Latest values ───────────────────────────────────────────────────

/// Latest reading per sensor kind. `None` means "unknown", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestValues {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub noise: Option<f64>,
}

impl LatestValues {
    pub fn get(&self, kind: SensorKind) -> Option<f64> {
        match kind {
            SensorKind::Temperature => self.temperature,
            SensorKind::Humidity => self.humidity,
            SensorKind::Noise => self.noise,
        }
    }
}

/// Extract the most recent reading from a value-series body.
///
/// Accepts `[{value, ...}]` or `{"values": [...]}` / `{"data": [...]}`.
/// Series are chronological ascending, so the last element wins.
pub(crate) fn latest_value_from_body(body: &Value) -> Option<f64> {
    let series = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => ["values", "data"]
            .iter()
            .filter_map(|key| map.get(*key)?.as_array())
            .find(|items| !items.is_empty())?
            .as_slice(),
        _ => return None,
    };
    parse_reading(series.last()?.get("value")?)
}

fn parse_reading(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

// ── Timeline events ─────────────────────────────────────────────────

/// A timeline entry that survived parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
}

impl TimelineEvent {
    /// Parse a raw timeline entry.
    ///
    /// With `owner`, the entry came from that device's own timeline and is
    /// attributed to it whatever id it embeds. Without one, the id comes
    /// from `device_id` or `device.id`.
    ///
    /// Returns `None` when the type is missing, no device id can be found,
    /// or the timestamp does not parse.
    pub fn from_raw(raw: &Value, owner: Option<&str>) -> Option<Self> {
        let event_type = raw.get("type")?.as_str().filter(|s| !s.is_empty())?;
        let device_id = match owner {
            Some(id) => id.to_owned(),
            None => raw
                .get("device_id")
                .and_then(scalar_to_string)
                .or_else(|| raw.get("device")?.get("id").and_then(scalar_to_string))?,
        };
        let timestamp = ["timestamp", "time", "created_at", "datetime"]
            .iter()
            .find_map(|key| raw.get(*key)?.as_str())
            .and_then(parse_timestamp)?;
        Some(Self {
            event_type: event_type.to_owned(),
            device_id,
            timestamp,
        })
    }
}

/// Normalize a timeline body: bare list or `{"events": [...]}`.
pub(crate) fn events_from_body(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("events") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Parse an ISO-8601 timestamp. A `Z` suffix is normalized to `+00:00`;
/// timestamps without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let normalized = match raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        Some(stem) => format!("{stem}+00:00"),
        None => raw.to_owned(),
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Keep events whose age (`now - timestamp`) is at most `within`.
///
/// The boundary is inclusive. Events stamped in the future have a
/// negative age and are kept.
pub fn retain_recent(
    events: impl IntoIterator<Item = TimelineEvent>,
    now: DateTime<Utc>,
    within: TimeDelta,
) -> Vec<TimelineEvent> {
    events
        .into_iter()
        .filter(|ev| now.signed_duration_since(ev.timestamp) <= within)
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn device_accessors_fall_back_across_keys() {
        let Some(devices) = devices_from_body(json!([
            {"device_id": 17, "name": "Hall", "model": "P2"},
            {"id": "d1", "description": "Bedroom", "name": "ignored"},
        ])) else {
            panic!("array body should normalize");
        };
        assert_eq!(devices[0].id().as_deref(), Some("17"));
        assert_eq!(devices[0].display_name(), Some("Hall"));
        assert_eq!(devices[0].model(), Some("P2"));
        assert_eq!(devices[1].id().as_deref(), Some("d1"));
        assert_eq!(devices[1].display_name(), Some("Bedroom"));
    }

    #[test]
    fn devices_body_without_key_is_empty() {
        assert_eq!(devices_from_body(json!({"other": 1})), Some(Vec::new()));
        assert_eq!(devices_from_body(json!("nope")), None);
        assert_eq!(devices_from_body(json!({"devices": 3})), None);
    }

    #[test]
    fn latest_value_takes_last_element() {
        let body = json!([{"value": 20.0}, {"value": 21.5}]);
        assert_eq!(latest_value_from_body(&body), Some(21.5));

        let wrapped = json!({"values": [{"value": "44.2"}]});
        assert_eq!(latest_value_from_body(&wrapped), Some(44.2));

        let data = json!({"values": [], "data": [{"value": 38}]});
        assert_eq!(latest_value_from_body(&data), Some(38.0));
    }

    #[test]
    fn latest_value_absent_on_garbage() {
        assert_eq!(latest_value_from_body(&json!([])), None);
        assert_eq!(latest_value_from_body(&json!([{"value": null}])), None);
        assert_eq!(latest_value_from_body(&json!([{"value": "n/a"}])), None);
        assert_eq!(latest_value_from_body(&json!({"values": "x"})), None);
        assert_eq!(latest_value_from_body(&json!(12)), None);
    }

    #[test]
    fn timestamps_normalize_zulu_and_naive() {
        let zulu = parse_timestamp("2024-01-01T00:00:00Z").expect("zulu parses");
        let offset = parse_timestamp("2024-01-01T01:00:00+01:00").expect("offset parses");
        let naive = parse_timestamp("2024-01-01T00:00:00.000").expect("naive parses");
        assert_eq!(zulu, offset);
        assert_eq!(zulu, naive);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn raw_event_reads_nested_device_and_alternate_time_keys() {
        let raw = json!({
            "type": "alarm_heard",
            "device": {"id": "d9"},
            "datetime": "2024-03-01T12:00:00Z"
        });
        let ev = TimelineEvent::from_raw(&raw, None).expect("event parses");
        assert_eq!(ev.device_id, "d9");
        assert_eq!(ev.event_type, "alarm_heard");

        let no_device = json!({"type": "tamper", "created_at": "2024-03-01T12:00:00Z"});
        assert!(TimelineEvent::from_raw(&no_device, None).is_none());
        let owned = TimelineEvent::from_raw(&no_device, Some("d1")).expect("owner applies");
        assert_eq!(owned.device_id, "d1");

        let serial = TimelineEvent::from_raw(&raw, Some("d1")).expect("owner wins");
        assert_eq!(serial.device_id, "d1");
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let now = parse_timestamp("2024-06-01T12:00:00Z").expect("valid");
        let within = TimeDelta::minutes(2);
        let at_edge = TimelineEvent {
            event_type: "activity_detected".into(),
            device_id: "d1".into(),
            timestamp: now - within,
        };
        let just_past = TimelineEvent {
            timestamp: now - within - TimeDelta::microseconds(1),
            ..at_edge.clone()
        };
        let kept = retain_recent([at_edge.clone(), just_past], now, within);
        assert_eq!(kept, vec![at_edge]);
    }

    #[test]
    fn events_body_shapes() {
        assert_eq!(events_from_body(json!([{"a": 1}])).len(), 1);
        assert_eq!(events_from_body(json!({"events": [{"a": 1}, {"b": 2}]})).len(), 2);
        assert!(events_from_body(json!({"unexpected": true})).is_empty());
    }
}
