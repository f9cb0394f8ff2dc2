use crate::{utils::id_key, Record, WireRecord};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::trace;

/// One record per `(type, id)`. Records of a type keep the order they were first seen in.
#[derive(Default)]
pub(crate) struct IdentityMap {
    records: HashMap<String, IndexMap<String, Record>>
}

impl IdentityMap {
    pub fn get(&self, kind: &str, id: &str) -> Option<Record> {
        self.records.get(kind).and_then(|records| records.get(id)).cloned()
    }

    pub fn all(&self, kind: &str) -> Vec<Record> {
        self.records
            .get(kind)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Merge a resource from the server into the map. Known records are updated in place and
    /// returned; unknown ones are created. Resources without an id can't be tracked and are
    /// returned as standalone records.
    pub fn merge(&mut self, wire: &WireRecord) -> Record {
        let id = match wire.id.as_ref().and_then(id_key) {
            Some(id) => id,
            None => return Record::from_wire(wire)
        };

        let records = self.records.entry(wire.kind.clone()).or_default();
        match records.get(&id) {
            Some(existing) => {
                trace!(kind = %wire.kind, %id, "updating record");
                existing.merge_wire(wire);
                existing.clone()
            }
            None => {
                trace!(kind = %wire.kind, %id, "inserting record");
                let record = Record::from_wire(wire);
                records.insert(id, record.clone());
                record
            }
        }
    }

    /// File `record` under `(kind, id)`. If a different record is already filed there, that one
    /// stays canonical and receives the fields of `record`.
    pub fn add(&mut self, kind: &str, id: String, record: &Record) -> Record {
        let records = self.records.entry(kind.to_string()).or_default();
        match records.get(&id) {
            Some(existing) if existing.ptr_eq(record) => existing.clone(),
            Some(existing) => {
                trace!(%kind, %id, "merging added record into existing one");
                existing.update_from(record);
                existing.clone()
            }
            None => {
                records.insert(id, record.clone());
                record.clone()
            }
        }
    }

    pub fn remove(&mut self, kind: &str, id: &str) -> Option<Record> {
        self.records
            .get_mut(kind)
            .and_then(|records| records.shift_remove(id))
    }

    pub fn remove_all(&mut self, kind: &str) -> Vec<Record> {
        self.records
            .remove(kind)
            .map(|records| records.into_values().collect())
            .unwrap_or_default()
    }

    /// Move whatever is filed under one key to another, replacing what was there.
    pub fn relocate(&mut self, from_kind: &str, from_id: &str, to_kind: &str, to_id: &str) {
        if let Some(record) = self.remove(from_kind, from_id) {
            self.records
                .entry(to_kind.to_string())
                .or_default()
                .insert(to_id.to_string(), record);
        }
    }
}
