use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Boolean signals derived from timeline events.
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
pub enum BinaryKind {
    Motion,
    Alarm,
}

impl BinaryKind {
    /// Event types that switch this signal on, absent any override.
    pub fn default_triggers(self) -> &'static [&'static str] {
        match self {
            Self::Motion => &["activity_detected"],
            Self::Alarm => &["alarm_heard", "avg_sound_high", "sound_level_dropped_normal"],
        }
    }
}

/// Trigger table: which event types turn each binary kind on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BinaryTriggers(BTreeMap<BinaryKind, BTreeSet<String>>);

impl Default for BinaryTriggers {
    fn default() -> Self {
        Self(
            BinaryKind::iter()
                .map(|kind| {
                    let events = kind.default_triggers().iter().map(|s| (*s).to_owned());
                    (kind, events.collect())
                })
                .collect(),
        )
    }
}

impl BinaryTriggers {
    /// Replace the trigger list of one kind.
    pub fn with(mut self, kind: BinaryKind, events: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.0.insert(kind, events.into_iter().map(Into::into).collect());
        self
    }

    pub fn triggers(&self, kind: BinaryKind) -> impl Iterator<Item = &str> {
        self.0.get(&kind).into_iter().flatten().map(String::as_str)
    }

    /// `true` if any trigger of `kind` appears in `seen`.
    pub fn is_triggered(&self, kind: BinaryKind, seen: &BTreeSet<String>) -> bool {
        self.0
            .get(&kind)
            .is_some_and(|triggers| !triggers.is_disjoint(seen))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen(types: &[&str]) -> BTreeSet<String> {
        types.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn default_table_maps_activity_to_motion() {
        let triggers = BinaryTriggers::default();
        assert!(triggers.is_triggered(BinaryKind::Motion, &seen(&["activity_detected"])));
        assert!(!triggers.is_triggered(BinaryKind::Alarm, &seen(&["activity_detected"])));
        assert!(triggers.is_triggered(BinaryKind::Alarm, &seen(&["battery_low", "avg_sound_high"])));
        assert!(!triggers.is_triggered(BinaryKind::Motion, &seen(&[])));
    }

    #[test]
    fn override_replaces_one_kind_only() {
        let triggers = BinaryTriggers::default().with(BinaryKind::Alarm, ["glassbreak"]);
        assert_eq!(triggers.triggers(BinaryKind::Alarm).collect::<Vec<_>>(), vec!["glassbreak"]);
        assert_eq!(
            triggers.triggers(BinaryKind::Motion).collect::<Vec<_>>(),
            vec!["activity_detected"]
        );
    }
}
