//! Turns wire-format resources into flat attribute maps.
//!
//! A flat record is built in three phases, and later phases win on key collisions:
//!
//! 1. `id` and `type`
//! 2. every attribute, verbatim
//! 3. every relationship: the referenced id (or list of ids) under the relationship's key, and
//!    the relationship's links under `"<key>Links"`

use crate::{Attributes, Identifier, RelationshipData, WireRecord};
use serde_json::Value;

/// Apply `f` to a single item or to every item of a list, keeping the cardinality.
pub fn map_items<T, F>(data: Option<&RelationshipData>, mut f: F) -> Value
where
    F: FnMut(Option<&Identifier>) -> T,
    T: Into<Value>
{
    match data {
        Some(RelationshipData::Many(items)) => {
            Value::Array(items.iter().map(|item| f(Some(item)).into()).collect())
        }
        Some(RelationshipData::One(item)) => f(Some(item)).into(),
        None => f(None).into()
    }
}

/// The key a relationship's links are stored under in a flat record.
pub fn links_key(relationship: &str) -> String {
    format!("{}Links", relationship)
}

/// Flatten a wire record.
///
/// ```
/// use hermes::{normalize::flatten_record, WireRecord};
/// use serde_json::json;
///
/// let record: WireRecord = serde_json::from_value(json!({
///     "id": "1",
///     "type": "event",
///     "attributes": { "title": "Test 1" },
///     "relationships": {
///         "image": {
///             "data": { "type": "image", "id": "1" },
///             "links": { "self": "http://example.com/images/1" }
///         }
///     }
/// })).unwrap();
///
/// let flat = flatten_record(&record);
/// assert_eq!(flat["title"], json!("Test 1"));
/// assert_eq!(flat["image"], json!("1"));
/// assert_eq!(flat["imageLinks"], json!({ "self": "http://example.com/images/1" }));
/// ```
pub fn flatten_record(record: &WireRecord) -> Attributes {
    let mut data = Attributes::new();
    data.insert("id".to_string(), record.id.clone().unwrap_or(Value::Null));
    data.insert("type".to_string(), Value::String(record.kind.clone()));

    for (key, value) in &record.attributes {
        data.insert(key.clone(), value.clone());
    }

    if let Some(ref relationships) = record.relationships {
        for (key, relationship) in relationships {
            let ids = map_items(relationship.data.as_ref(), |item| {
                item.and_then(|item| item.id.clone()).unwrap_or(Value::Null)
            });
            data.insert(key.clone(), ids);

            if let Some(ref links) = relationship.links {
                let links = serde_json::to_value(links).unwrap_or(Value::Null);
                data.insert(links_key(key), links);
            }
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::flatten_record;
    use crate::WireRecord;
    use serde_json::{json, Value};

    fn wire(value: Value) -> WireRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn seeds_id_and_type() {
        let flat = flatten_record(&wire(json!({ "id": "1", "type": "event" })));
        assert_eq!(flat["id"], json!("1"));
        assert_eq!(flat["type"], json!("event"));
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn attributes_overwrite_id_and_type() {
        let flat = flatten_record(&wire(json!({
            "id": "1",
            "type": "event",
            "attributes": { "type": "evil-event", "title": "Test" }
        })));
        assert_eq!(flat["type"], json!("evil-event"));
        assert_eq!(flat["title"], json!("Test"));
    }

    #[test]
    fn relationships_overwrite_attributes() {
        let flat = flatten_record(&wire(json!({
            "id": "1",
            "type": "event",
            "attributes": { "image": "inline.png" },
            "relationships": { "image": { "data": { "type": "image", "id": "7" } } }
        })));
        assert_eq!(flat["image"], json!("7"));
    }

    #[test]
    fn plural_relationships_keep_order_and_length() {
        let flat = flatten_record(&wire(json!({
            "id": "1",
            "type": "event",
            "relationships": {
                "images": {
                    "data": [
                        { "type": "image", "id": "3" },
                        { "type": "image" },
                        { "type": "image", "id": 1 }
                    ]
                }
            }
        })));
        assert_eq!(flat["images"], json!(["3", null, 1]));
    }

    #[test]
    fn missing_linkage_becomes_null() {
        let flat = flatten_record(&wire(json!({
            "id": "1",
            "type": "event",
            "relationships": {
                "organiser": { "data": null },
                "photos": { "links": { "related": "http://example.com/event/1/photos" } }
            }
        })));
        assert_eq!(flat["organiser"], Value::Null);
        assert_eq!(flat["photos"], Value::Null);
        assert_eq!(
            flat["photosLinks"],
            json!({ "related": "http://example.com/event/1/photos" })
        );
        assert!(!flat.contains_key("organiserLinks"));
    }

    #[test]
    fn link_objects_are_kept_whole() {
        let flat = flatten_record(&wire(json!({
            "id": "1",
            "type": "event",
            "relationships": {
                "image": {
                    "data": { "type": "image", "id": "1" },
                    "links": { "self": { "href": "http://example.com/images/1", "meta": { "foo": "bar" } } }
                }
            }
        })));
        assert_eq!(flat["imageLinks"]["self"]["meta"]["foo"], json!("bar"));
    }

    #[test]
    fn link_objects_are_copied_verbatim() {
        let links = json!({
            "self": { "href": "http://example.com/images/1" },
            "related": { "href": "http://example.com/event/1/image", "title": "Image", "type": "application/vnd.api+json" },
            "describedby": null
        });
        let flat = flatten_record(&wire(json!({
            "id": "1",
            "type": "event",
            "relationships": { "image": { "data": { "type": "image", "id": "1" }, "links": links } }
        })));
        assert_eq!(flat["imageLinks"], links);
    }
}
