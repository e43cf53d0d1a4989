// ── Mutable state store ──
//
// Owned by the coordinator; the inbound dispatcher is its only writer.
// Every operation either applies or is a silent no-op.

use serde_json::{Map, Value};

use super::snapshot::{LiveSnapshot, MergedState, PropertyCache};

/// Live snapshot + property cache, with the merge rules for each.
#[derive(Debug, Default)]
pub struct StateStore {
    data: LiveSnapshot,
    cache: PropertyCache,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> &LiveSnapshot {
        &self.data
    }

    pub fn cache(&self) -> &PropertyCache {
        &self.cache
    }

    /// Replace the whole live snapshot. Nothing of the old one survives.
    pub fn replace_live_snapshot(&mut self, collections: Map<String, Value>) {
        self.data = LiveSnapshot::new(collections);
    }

    /// Set one property on the first matching entity record.
    ///
    /// Returns `false`, leaving the store untouched, when the collection
    /// or the serial number is not in the snapshot.
    pub fn update_live_property(
        &mut self,
        collection: &str,
        serial_number: &str,
        property: &str,
        value: Value,
    ) -> bool {
        match self.data.entity_mut(collection, serial_number) {
            Some(entity) => {
                entity.insert(property.to_owned(), value);
                true
            }
            None => false,
        }
    }

    /// Record a cached property, stripping NUL characters from strings.
    pub fn update_cached_property(&mut self, serial_number: &str, property: &str, value: Value) {
        self.cache.set(serial_number, property, strip_nul(value));
    }

    /// An owned copy for publishing.
    pub fn merged(&self) -> MergedState {
        MergedState {
            cache: self.cache.clone(),
            data: self.data.clone(),
        }
    }
}

fn strip_nul(value: Value) -> Value {
    match value {
        Value::String(s) if s.contains('\0') => Value::String(s.replace('\0', "")),
        other => other,
    }
}
