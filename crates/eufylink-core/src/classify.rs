// ── Event classification ──
//
// Static table deciding which pushed events matter and how to read them.
// Built and validated once; lookups are pure.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Which store an event's value lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventTarget {
    /// The per-device property cache.
    Cached,
    /// The live snapshot entity, updated in place.
    Live,
}

/// How to interpret one event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRule {
    /// Event type name as sent by the server, e.g. `"motion detected"`.
    pub event: String,
    /// Property name used when the event carries no `name` field.
    #[serde(default)]
    pub property: Option<String>,
    /// Event field holding the new value.
    pub value_field: String,
    pub target: EventTarget,
}

impl EventRule {
    pub fn new(
        event: impl Into<String>,
        property: Option<&str>,
        value_field: impl Into<String>,
        target: EventTarget,
    ) -> Self {
        Self {
            event: event.into(),
            property: property.map(str::to_owned),
            value_field: value_field.into(),
            target,
        }
    }

    /// Resolve the property name, preferring the event's own `name`.
    pub fn property_name<'a>(&'a self, name: Option<&'a str>) -> Option<&'a str> {
        name.or(self.property.as_deref())
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.event.trim().is_empty() {
            return Err(invalid(&self.event, "event name is empty"));
        }
        if self.value_field.trim().is_empty() {
            return Err(invalid(&self.event, "value field is empty"));
        }
        if self.property.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(invalid(&self.event, "default property name is empty"));
        }
        Ok(())
    }
}

/// The rules the event server's push events need out of the box.
pub fn builtin_rules() -> Vec<EventRule> {
    use EventTarget::{Cached, Live};

    vec![
        EventRule::new("property changed", None, "value", Live),
        EventRule::new("motion detected", Some("motionDetected"), "state", Cached),
        EventRule::new("person detected", Some("personDetected"), "state", Cached),
        EventRule::new("pet detected", Some("petDetected"), "state", Cached),
        EventRule::new("sound detected", Some("soundDetected"), "state", Cached),
        EventRule::new("crying detected", Some("cryingDetected"), "state", Cached),
        EventRule::new("rings", Some("ringing"), "state", Cached),
        EventRule::new("got rtsp url", Some("rtspUrl"), "rtspUrl", Cached),
    ]
}

/// Validated event-type → rule table.
#[derive(Debug, Clone)]
pub struct ClassificationTable {
    rules: HashMap<String, EventRule>,
}

impl ClassificationTable {
    /// Build a table from exactly these rules.
    ///
    /// Rejects empty names or fields and duplicate event names.
    pub fn new(rules: impl IntoIterator<Item = EventRule>) -> Result<Self, CoreError> {
        let mut table = HashMap::new();
        for rule in rules {
            rule.validate()?;
            if table.contains_key(&rule.event) {
                return Err(invalid(&rule.event, "duplicate event name"));
            }
            table.insert(rule.event.clone(), rule);
        }
        Ok(Self { rules: table })
    }

    /// Built-in rules, with `overrides` replacing same-named entries.
    ///
    /// Duplicates within `overrides` are rejected.
    pub fn with_overrides(overrides: &[EventRule]) -> Result<Self, CoreError> {
        let overrides = Self::new(overrides.iter().cloned())?;
        let mut table = Self::default();
        for (event, rule) in overrides.rules {
            table.rules.insert(event, rule);
        }
        Ok(table)
    }

    /// Look up an event type. `None` means "ignore this event".
    pub fn lookup(&self, event: &str) -> Option<&EventRule> {
        self.rules.get(event)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for ClassificationTable {
    fn default() -> Self {
        let rules = builtin_rules()
            .into_iter()
            .map(|rule| (rule.event.clone(), rule))
            .collect();
        Self { rules }
    }
}

fn invalid(event: &str, reason: &str) -> CoreError {
    CoreError::InvalidClassification {
        event: event.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rules_pass_validation() {
        let table = ClassificationTable::new(builtin_rules()).unwrap();
        assert_eq!(table.len(), builtin_rules().len());
        assert_eq!(table.len(), ClassificationTable::default().len());
    }

    #[test]
    fn lookup_unknown_event_is_none() {
        let table = ClassificationTable::default();
        assert!(table.lookup("station guard mode").is_none());
        assert!(table.lookup("").is_none());
    }

    #[test]
    fn motion_detected_targets_cache() {
        let table = ClassificationTable::default();
        let rule = table.lookup("motion detected").unwrap();
        assert_eq!(rule.target, EventTarget::Cached);
        assert_eq!(rule.value_field, "state");
        assert_eq!(rule.property_name(None), Some("motionDetected"));
    }

    #[test]
    fn message_name_overrides_default_property() {
        let table = ClassificationTable::default();
        let rule = table.lookup("property changed").unwrap();
        assert_eq!(rule.property_name(Some("battery")), Some("battery"));
        assert_eq!(rule.property_name(None), None);
    }

    #[test]
    fn duplicate_rules_are_rejected() {
        let rules = vec![
            EventRule::new("rings", Some("ringing"), "state", EventTarget::Cached),
            EventRule::new("rings", Some("ring"), "state", EventTarget::Live),
        ];
        let err = ClassificationTable::new(rules).unwrap_err();
        assert!(matches!(err, CoreError::InvalidClassification { ref event, .. } if event == "rings"));
    }

    #[test]
    fn empty_value_field_is_rejected() {
        let rules = vec![EventRule::new("rings", None, " ", EventTarget::Cached)];
        assert!(ClassificationTable::new(rules).is_err());
    }

    #[test]
    fn overrides_replace_builtins() {
        let overrides = vec![
            EventRule::new("motion detected", Some("motion"), "state", EventTarget::Live),
            EventRule::new("package delivered", Some("package"), "state", EventTarget::Cached),
        ];
        let table = ClassificationTable::with_overrides(&overrides).unwrap();

        assert_eq!(table.len(), builtin_rules().len() + 1);
        let motion = table.lookup("motion detected").unwrap();
        assert_eq!(motion.target, EventTarget::Live);
        assert_eq!(motion.property.as_deref(), Some("motion"));
        assert!(table.lookup("package delivered").is_some());
    }

    #[test]
    fn rule_deserializes_from_toml_shape() {
        let rule: EventRule = serde_json::from_value(serde_json::json!({
            "event": "got rtsp url",
            "property": "rtspUrl",
            "value_field": "rtspUrl",
            "target": "cached"
        }))
        .unwrap();
        assert_eq!(rule.target, EventTarget::Cached);
    }
}
