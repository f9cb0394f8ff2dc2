//! Canned server documents.
//!
//! | name             | contents                                                       |
//! |------------------|----------------------------------------------------------------|
//! | `events-1`       | events 1-4, each with an `image` relationship; a `next` link   |
//! |                  | and a `null` `prev` link                                       |
//! | `events-2`       | events 5 and 6; `prev` and `first` links back to page one      |
//! | `event-1`        | event 12345 with an `image` record link                        |
//! | `event-1b`       | event 12345 with a `self` link                                 |
//! | `image-1`        | image 1                                                        |
//! | `jsonapi-object` | `events-1` plus a `jsonapi` member                             |
//! | `queue-1`        | a queued job, as returned with `202 Accepted`                  |
//! | `error`          | an `errors` document                                           |
//! | `invalid`        | a body that isn't JSON                                         |

use lazy_static::lazy_static;
use serde_json::{json, Value};

fn event(id: u32) -> Value {
    json!({
        "id": id.to_string(),
        "type": "event",
        "attributes": {
            "title": format!("Test {}", id)
        },
        "relationships": {
            "image": {
                "data": { "type": "image", "id": "1" },
                "links": { "self": "http://example.com/images/1" },
                "meta": { "foo": "bar" }
            }
        },
        "meta": { "createdAt": "2017-03-19T16:00:00.000Z" }
    })
}

lazy_static! {
    pub static ref EVENTS_1: Value = json!({
        "data": [event(1), event(2), event(3), event(4)],
        "links": {
            "prev": null,
            "next": {
                "href": "http://example.com/event?page=2",
                "meta": { "foo": "bar" }
            }
        },
        "meta": { "total": 6 }
    });
    pub static ref EVENTS_2: Value = json!({
        "data": [event(5), event(6)],
        "links": {
            "first": "http://example.com/event",
            "prev": "http://example.com/event"
        },
        "meta": { "total": 6 }
    });
    pub static ref EVENT_1: Value = json!({
        "data": {
            "id": "12345",
            "type": "event",
            "attributes": { "title": "Test 1" },
            "links": { "image": "http://example.com/images/1" }
        }
    });
    pub static ref EVENT_1B: Value = json!({
        "data": {
            "id": "12345",
            "type": "event",
            "attributes": { "title": "Test 1" },
            "links": { "self": "http://example.com/event/1234" }
        }
    });
    pub static ref IMAGE_1: Value = json!({
        "data": {
            "id": 1,
            "type": "image",
            "attributes": { "url": "http://example.com/1.jpg" }
        }
    });
    pub static ref JSONAPI_OBJECT: Value = {
        let mut document = EVENTS_1.clone();
        document["jsonapi"] = json!({ "version": "1.0", "meta": { "foo": "bar" } });
        document
    };
    pub static ref QUEUE_1: Value = json!({
        "data": {
            "id": "123",
            "type": "queue-jobs",
            "attributes": {
                "status": "Pending request, waiting other process"
            },
            "links": { "self": "http://example.com/event/queue-jobs/123" }
        }
    });
    pub static ref ERROR: Value = json!({
        "errors": [{
            "status": "400",
            "title": "Bad request",
            "detail": "The title is too short",
            "source": { "pointer": "/data/attributes/title" }
        }]
    });
}

pub const INVALID: &str = "<html><body>Not JSON</body></html>";

/// The body of a fixture by name.
///
/// # Panics
///
/// Panics on unknown names.
pub fn body(name: &str) -> String {
    let document: &Value = match name {
        "events-1" => &*EVENTS_1,
        "events-2" => &*EVENTS_2,
        "event-1" => &*EVENT_1,
        "event-1b" => &*EVENT_1B,
        "image-1" => &*IMAGE_1,
        "jsonapi-object" => &*JSONAPI_OBJECT,
        "queue-1" => &*QUEUE_1,
        "error" => &*ERROR,
        "invalid" => return INVALID.to_string(),
        other => panic!("unknown fixture {}", other)
    };
    document.to_string()
}
