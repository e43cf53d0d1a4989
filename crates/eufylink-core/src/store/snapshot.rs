// ── Snapshot value types ──
//
// Plain owned data. Published to consumers as `Arc<MergedState>`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entity record: property name → value, keyed by `serialNumber`.
pub type Entity = Map<String, Value>;

const SERIAL_NUMBER: &str = "serialNumber";

/// The server's full state as of the last start-listening result.
///
/// Array members (`"devices"`, `"stations"`) hold entity records; other
/// members (such as `"driver"`) are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LiveSnapshot(Map<String, Value>);

impl LiveSnapshot {
    pub fn new(collections: Map<String, Value>) -> Self {
        Self(collections)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entity records of one collection, in server order.
    pub fn collection(&self, name: &str) -> impl Iterator<Item = &Entity> {
        self.0
            .get(name)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
    }

    /// Every entity record with the collection it belongs to.
    pub fn entities(&self) -> impl Iterator<Item = (&str, &Entity)> {
        self.0.iter().flat_map(|(name, members)| {
            members
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_object)
                .map(move |entity| (name.as_str(), entity))
        })
    }

    /// First record in `collection` whose `serialNumber` matches.
    pub fn entity(&self, collection: &str, serial_number: &str) -> Option<&Entity> {
        self.collection(collection)
            .find(|entity| serial_of(entity) == Some(serial_number))
    }

    pub(crate) fn entity_mut(&mut self, collection: &str, serial_number: &str) -> Option<&mut Entity> {
        self.0
            .get_mut(collection)?
            .as_array_mut()?
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .find(|entity| serial_of(entity) == Some(serial_number))
    }
}

pub(crate) fn serial_of(entity: &Entity) -> Option<&str> {
    entity.get(SERIAL_NUMBER).and_then(Value::as_str)
}

/// Last observed value of cached properties, per device serial number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyCache(BTreeMap<String, BTreeMap<String, Value>>);

impl PropertyCache {
    /// All cached properties of one device.
    pub fn device(&self, serial_number: &str) -> Option<&BTreeMap<String, Value>> {
        self.0.get(serial_number)
    }

    pub fn property(&self, serial_number: &str, property: &str) -> Option<&Value> {
        self.0.get(serial_number)?.get(property)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, Value>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn set(&mut self, serial_number: &str, property: &str, value: Value) {
        self.0
            .entry(serial_number.to_owned())
            .or_default()
            .insert(property.to_owned(), value);
    }
}

/// What consumers read: `{ "cache": ..., "data": ... }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedState {
    pub cache: PropertyCache,
    pub data: LiveSnapshot,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> LiveSnapshot {
        let Value::Object(map) = json!({
            "driver": { "version": "1.2.0", "connected": true },
            "stations": [{ "serialNumber": "T8010", "name": "Home" }],
            "devices": [
                { "serialNumber": "T8400", "name": "Porch" },
                { "serialNumber": "T8113", "name": "Garage" }
            ]
        }) else {
            unreachable!()
        };
        LiveSnapshot::new(map)
    }

    #[test]
    fn entities_skip_non_array_members() {
        let snapshot = sample();
        let all: Vec<(&str, Option<&str>)> = snapshot
            .entities()
            .map(|(collection, entity)| (collection, serial_of(entity)))
            .collect();

        assert_eq!(all.len(), 3);
        assert!(all.contains(&("stations", Some("T8010"))));
        assert!(all.contains(&("devices", Some("T8113"))));
    }

    #[test]
    fn entity_lookup_by_serial() {
        let snapshot = sample();
        assert_eq!(snapshot.entity("devices", "T8113").unwrap()["name"], "Garage");
        assert!(snapshot.entity("stations", "T8400").is_none());
        assert!(snapshot.entity("driver", "T8400").is_none());
    }

    #[test]
    fn merged_state_serializes_cache_and_data() {
        let mut cache = PropertyCache::default();
        cache.set("T8400", "motionDetected", json!(true));
        let merged = MergedState {
            cache,
            data: sample(),
        };

        let value = serde_json::to_value(&merged).unwrap();
        assert_eq!(value["cache"]["T8400"]["motionDetected"], json!(true));
        assert_eq!(value["data"]["devices"][0]["serialNumber"], "T8400");
    }
}
