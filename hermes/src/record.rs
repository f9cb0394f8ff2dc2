use crate::{
    normalize::{flatten_record, links_key},
    utils::id_key,
    Attributes, Identifier, Link, Links, Relationship, RelationshipData, WireRecord
};
use parking_lot::RwLock;
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};

#[derive(Debug, Default)]
struct RecordState {
    fields: Attributes,
    /// Relationship key to the type of the resources it references, if known.
    relationships: BTreeMap<String, Option<String>>,
    links: Links,
    meta: Attributes,
    persisted: bool,
    /// The id was chosen by the client and has to be sent to the server.
    client_id: bool,
    /// For a queued job returned by a save: the record being saved.
    queued_for: Option<Record>
}

/// A flat record.
///
/// `Record` is a shared handle: clones point at the same data, and updates made through one
/// handle (for example by the store merging a refetched resource) are visible through all of them.
/// Use [`ptr_eq`](#method.ptr_eq) to check whether two handles are the same record.
#[derive(Debug, Clone)]
pub struct Record(Arc<RwLock<RecordState>>);

impl Record {
    /// Create a new local record from flat fields. `type` is required for the record to be
    /// useful; an `id` is optional and, if present, will be sent to the server on creation.
    ///
    /// ```
    /// use hermes::Record;
    /// use serde_json::json;
    ///
    /// let record = Record::with_type("event").set("title", json!("Example title"));
    /// assert_eq!(record.kind(), "event");
    /// assert!(record.id().is_none());
    ///
    /// let wire = record.to_wire_format();
    /// assert!(wire.id.is_none());
    /// assert_eq!(wire.attributes["title"], json!("Example title"));
    /// assert!(!wire.attributes.contains_key("type"));
    /// ```
    pub fn new(fields: Attributes) -> Self {
        let client_id = fields.get("id").map_or(false, |id| !id.is_null());
        Record(Arc::new(RwLock::new(RecordState {
            fields,
            client_id,
            ..Default::default()
        })))
    }

    /// Create an empty local record of the given type.
    pub fn with_type<S: Into<String>>(kind: S) -> Self {
        let mut fields = Attributes::new();
        fields.insert("type".to_string(), Value::String(kind.into()));
        Record::new(fields)
    }

    /// Create a record from a resource the server sent.
    pub fn from_wire(record: &WireRecord) -> Self {
        let record_ref = Record(Arc::new(RwLock::new(RecordState::default())));
        record_ref.merge_wire(record);
        record_ref
    }

    /// Builder-style `set`, returning the record.
    pub fn set<K: Into<String>>(self, key: K, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<K: Into<String>>(&self, key: K, value: Value) {
        self.0.write().fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().fields.get(key).cloned()
    }

    pub fn kind(&self) -> String {
        match self.0.read().fields.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => String::new()
        }
    }

    pub fn id(&self) -> Option<Value> {
        self.0
            .read()
            .fields
            .get("id")
            .filter(|id| !id.is_null())
            .cloned()
    }

    /// The id as the string the identity map files this record under.
    pub fn id_key(&self) -> Option<String> {
        self.id().as_ref().and_then(id_key)
    }

    /// A snapshot of all fields.
    pub fn fields(&self) -> Attributes {
        self.0.read().fields.clone()
    }

    /// Copy every given field onto the record, overwriting existing ones.
    pub fn update(&self, fields: &Attributes) {
        let mut state = self.0.write();
        for (key, value) in fields {
            state.fields.insert(key.clone(), value.clone());
        }
    }

    /// Copy everything, fields and bookkeeping, from another record onto this one.
    pub fn update_from(&self, other: &Record) {
        if self.ptr_eq(other) {
            return;
        }
        let (fields, relationships, links, meta, persisted, client_id) = {
            let other = other.0.read();
            (
                other.fields.clone(),
                other.relationships.clone(),
                other.links.clone(),
                other.meta.clone(),
                other.persisted,
                other.client_id
            )
        };
        let mut state = self.0.write();
        for (key, value) in fields {
            state.fields.insert(key, value);
        }
        state.relationships.extend(relationships);
        state.links = links;
        state.meta = meta;
        state.persisted = persisted;
        state.client_id = client_id;
    }

    /// Merge a resource from the server into this record, in place.
    pub(crate) fn merge_wire(&self, record: &WireRecord) {
        let fields = flatten_record(record);
        let mut state = self.0.write();
        for (key, value) in fields {
            state.fields.insert(key, value);
        }
        if let Some(ref relationships) = record.relationships {
            for (key, relationship) in relationships {
                let kind = referenced_kind(relationship);
                let known = state.relationships.entry(key.clone()).or_insert(None);
                if kind.is_some() {
                    *known = kind;
                }
            }
        }
        if let Some(ref links) = record.links {
            state.links = links.clone();
        }
        if let Some(ref meta) = record.meta {
            state.meta = meta.clone();
        }
        state.persisted = true;
        state.client_id = false;
    }

    pub(crate) fn set_id(&self, id: Value) {
        self.0.write().fields.insert("id".to_string(), id);
    }

    pub(crate) fn assign_client_id(&self, id: Value) {
        let mut state = self.0.write();
        state.fields.insert("id".to_string(), id);
        state.client_id = true;
    }

    pub(crate) fn mark_persisted(&self) {
        let mut state = self.0.write();
        state.persisted = true;
        state.client_id = false;
    }

    pub(crate) fn set_queued_record(&self, record: &Record) {
        self.0.write().queued_for = Some(record.clone());
    }

    /// If this record is a job the server queued while saving another record, that record.
    pub fn queued_record(&self) -> Option<Record> {
        self.0.read().queued_for.clone()
    }

    /// Whether the server knows about this record.
    pub fn is_persisted(&self) -> bool {
        self.0.read().persisted
    }

    /// Declare `key` as a relationship to resources of type `kind`, referencing `ids`
    /// (a single id, a list of ids or `null`).
    pub fn relate<K: Into<String>, T: Into<String>>(&self, key: K, kind: T, ids: Value) {
        let key = key.into();
        let mut state = self.0.write();
        state.fields.insert(key.clone(), ids);
        state.relationships.insert(key, Some(kind.into()));
    }

    /// The names of all relationships of this record.
    pub fn relationship_keys(&self) -> Vec<String> {
        self.0.read().relationships.keys().cloned().collect()
    }

    /// The links of a relationship, as sent by the server.
    pub fn relationship_links(&self, key: &str) -> Option<Links> {
        self.0
            .read()
            .fields
            .get(&links_key(key))
            .and_then(|links| serde_json::from_value(links.clone()).ok())
    }

    /// The record's own links.
    pub fn links(&self) -> Links {
        self.0.read().links.clone()
    }

    pub fn link(&self, name: &str) -> Option<Link> {
        self.0.read().links.get(name).cloned().flatten()
    }

    pub fn meta(&self) -> Attributes {
        self.0.read().meta.clone()
    }

    /// Convert the record back into a resource object, e.g. for a request body.
    ///
    /// Local ids the store assigned to unsaved records are left out.
    pub fn to_wire_format(&self) -> WireRecord {
        let state = self.0.read();
        let kind = match state.fields.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => String::new()
        };
        let id = if state.persisted || state.client_id {
            state.fields.get("id").filter(|id| !id.is_null()).cloned()
        } else {
            None
        };

        let link_keys: Vec<String> = state.relationships.keys().map(|key| links_key(key)).collect();
        let attributes = state
            .fields
            .iter()
            .filter(|(key, _)| {
                key.as_str() != "id"
                    && key.as_str() != "type"
                    && !state.relationships.contains_key(key.as_str())
                    && !link_keys.contains(*key)
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let relationships: BTreeMap<String, Relationship> = state
            .relationships
            .iter()
            .map(|(key, related_kind)| {
                let related_kind = related_kind.clone().unwrap_or_else(|| key.clone());
                let identifier = |id: &Value| Identifier {
                    id: Some(id.clone()),
                    kind: related_kind.clone(),
                    meta: None
                };
                let data = match state.fields.get(key) {
                    Some(Value::Array(ids)) => Some(RelationshipData::Many(
                        ids.iter()
                            .filter(|id| !id.is_null())
                            .map(identifier)
                            .collect()
                    )),
                    Some(Value::Null) | None => None,
                    Some(id) => Some(RelationshipData::One(identifier(id)))
                };
                let relationship = Relationship {
                    data,
                    links: None,
                    meta: None
                };
                (key.clone(), relationship)
            })
            .collect();

        WireRecord {
            id,
            kind,
            attributes,
            relationships: if relationships.is_empty() {
                None
            } else {
                Some(relationships)
            },
            links: None,
            meta: None
        }
    }

    /// Whether both handles point at the same record.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

fn referenced_kind(relationship: &Relationship) -> Option<String> {
    match relationship.data {
        Some(RelationshipData::One(ref identifier)) => Some(identifier.kind.clone()),
        Some(RelationshipData::Many(ref identifiers)) => {
            identifiers.first().map(|identifier| identifier.kind.clone())
        }
        None => None
    }
}

#[cfg(test)]
mod tests {
    use super::Record;
    use crate::{RelationshipData, WireRecord};
    use serde_json::json;

    fn wire() -> WireRecord {
        serde_json::from_value(json!({
            "id": "1",
            "type": "event",
            "attributes": { "title": "Test 1" },
            "relationships": {
                "image": {
                    "data": { "type": "image", "id": "1" },
                    "links": { "self": "http://example.com/images/1" }
                }
            },
            "links": { "self": "http://example.com/event/1234" },
            "meta": { "createdAt": "2017-03-19T16:00:00.000Z" }
        }))
        .unwrap()
    }

    #[test]
    fn server_records_round_trip_relationships() {
        let record = Record::from_wire(&wire());
        assert!(record.is_persisted());
        assert_eq!(record.get("image"), Some(json!("1")));
        assert_eq!(record.meta()["createdAt"], json!("2017-03-19T16:00:00.000Z"));
        assert_eq!(
            record.link("self").map(|link| link.href().to_string()),
            Some("http://example.com/event/1234".to_string())
        );

        let back = record.to_wire_format();
        assert_eq!(back.id, Some(json!("1")));
        assert_eq!(back.kind, "event");
        assert_eq!(back.attributes.len(), 1);
        let image = &back.relationships.unwrap()["image"];
        match image.data {
            Some(RelationshipData::One(ref identifier)) => {
                assert_eq!(identifier.kind, "image");
                assert_eq!(identifier.id, Some(json!("1")));
            }
            ref other => panic!("unexpected linkage {:?}", other)
        }
    }

    #[test]
    fn merging_updates_in_place() {
        let record = Record::from_wire(&wire());
        let handle = record.clone();

        let mut updated = wire();
        updated
            .attributes
            .insert("title".to_string(), json!("Renamed"));
        record.merge_wire(&updated);

        assert!(handle.ptr_eq(&record));
        assert_eq!(handle.get("title"), Some(json!("Renamed")));
    }

    #[test]
    fn local_records_omit_store_assigned_ids() {
        let record = Record::with_type("event");
        record.set_id(json!(-1));
        assert!(record.to_wire_format().id.is_none());

        let given = Record::with_type("event").set("id", json!(123));
        let given = Record::new(given.fields());
        assert_eq!(given.to_wire_format().id, Some(json!(123)));
    }

    #[test]
    fn plural_relationships_serialize_as_lists() {
        let record = Record::from_wire(&wire());
        record.insert("image", json!(["1", "2"]));
        let back = record.to_wire_format();
        match back.relationships.unwrap()["image"].data {
            Some(RelationshipData::Many(ref identifiers)) => assert_eq!(identifiers.len(), 2),
            ref other => panic!("unexpected linkage {:?}", other)
        }
    }
}
