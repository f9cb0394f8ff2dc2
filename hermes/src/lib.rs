//! A JSON:API client that keeps every resource it sees in a local identity map,
//! de-duplicates requests and resolves pagination and relationship links lazily.
//!
//! # Getting Started
//!
//! Build a [`Client`](./struct.Client.html) once and hand it to a [`Store`](./struct.Store.html):
//!
//! ```no_run
//! # tokio_test::block_on(async {
//! use hermes::{Client, Store};
//!
//! let client = Client::builder("https://example.com/api/")
//!     .with_header("Authorization", "Bearer 1234")
//!     .with_default_transport()
//!     .build();
//! let store = Store::new(client);
//!
//! let events = store.fetch_all("event", false, None).await.unwrap();
//! let next_page = events.next().await.unwrap();
//! assert_eq!(next_page.status(), 200);
//! # });
//! ```
//!
//! # Store
//!
//! The store owns two things: the identity map and the request cache.
//!
//! The identity map holds exactly one [`Record`](./struct.Record.html) per `(type, id)` pair.
//! Whenever a response contains a resource that is already known, the existing record is updated
//! in place, so everybody holding a clone of that record sees the new data.
//!
//! The request cache remembers the future of every `fetch`, `fetch_all` and `GET` `request` call.
//! Two calls with the same parameters share one network request and resolve to the same
//! [`Response`](./struct.Response.html). Failed requests are dropped from the cache, and
//! `remove_all` drops everything cached for a type.
//!
//! # Responses
//!
//! A [`Response`](./struct.Response.html) is an immutable snapshot of one request. Its links
//! (`first`, `prev`, `next`, `last` or any other name) are resolved on first access and memoized,
//! so asking for the same link twice never issues a second request.
//!
//! # Transport
//!
//! Every request goes through the client's [`FetchStrategy`](./transport/trait.FetchStrategy.html),
//! which in turn uses a [`Transport`](./transport/trait.Transport.html). Both can be swapped out on
//! the [`ClientBuilder`](./struct.ClientBuilder.html) to intercept, mock or reroute requests.
//!
//! # Features
//!
//! * `default-transport` **(default)** - Include a `reqwest` based transport and the related
//! builder method

#[macro_use]
extern crate serde;
#[macro_use]
extern crate async_trait;

use serde_json::Value;
use std::collections::BTreeMap;

pub mod client;
mod error;
pub mod network;
pub mod normalize;
mod record;
mod response;
pub mod store;
pub mod transport;
mod types;
pub mod utils;

pub use client::{Client, ClientBuilder, Endpoint, TypeConfig};
pub use error::{Error, Result};
pub use record::Record;
pub use response::{Response, ResponseFuture, ResponseResult};
pub use store::{Store, StoreBuilder};
pub use types::{Data, HttpRequest, HttpResponse, Method, RawResponse, RequestOptions};

/// The attribute map of a resource, and the shape of a flattened record.
pub type Attributes = serde_json::Map<String, Value>;

/// A top-level JSON:API document.
///
/// [Spec](https://jsonapi.org/format/#document-top-level)
///
/// ```
/// # use serde_json::json;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use hermes::{Document, Link, PrimaryData};
///
/// let document: Document = serde_json::from_value(json!({
///     "data": [{ "id": "1", "type": "event", "attributes": { "title": "Test 1" } }],
///     "links": { "next": { "href": "http://example.com/event?page=2", "meta": { "foo": "bar" } } }
/// }))?;
///
/// assert!(matches!(document.data, Some(PrimaryData::Many(ref records)) if records.len() == 1));
/// let next = document.links.as_ref().unwrap()["next"].as_ref().unwrap();
/// assert_eq!(next.href(), "http://example.com/event?page=2");
///
/// #     Ok(())
/// # }
/// ```
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct Document {
    /// The primary data. `null` and a missing member are both `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PrimaryData>,
    /// The top-level errors returned by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorObject>>,
    /// Related resources sideloaded with the primary data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included: Option<Vec<WireRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonapi: Option<JsonApiObject>
}

impl Document {
    /// Wraps a single resource, the shape used for request bodies.
    pub fn from_record(record: WireRecord) -> Self {
        Document {
            data: Some(PrimaryData::One(Box::new(record))),
            ..Default::default()
        }
    }

    /// The document's errors, if it contains at least one.
    pub fn errors(&self) -> Option<&[ErrorObject]> {
        self.errors
            .as_deref()
            .filter(|errors| !errors.is_empty())
    }
}

/// The primary data of a document: either one resource or a list of them.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<WireRecord>),
    One(Box<WireRecord>)
}

/// A resource object as it is sent over the wire.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct WireRecord {
    /// Missing on resources created by the client that don't have an id yet.
    /// Servers send strings, but numbers are accepted as well.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<BTreeMap<String, Relationship>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Attributes>
}

/// A relationship of a resource object.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct Relationship {
    /// The resource linkage. `null` (an empty to-one relationship) and a missing member are both
    /// `None`.
    #[serde(default)]
    pub data: Option<RelationshipData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Attributes>
}

/// Resource linkage, keeping the to-one/to-many cardinality of the relationship.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum RelationshipData {
    Many(Vec<Identifier>),
    One(Identifier)
}

/// A resource identifier object.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Identifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Attributes>
}

/// A links object. Links that aren't available are sent as `null` and kept as `None`.
pub type Links = BTreeMap<String, Option<Link>>;

/// A link, either a bare URL or a link object.
///
/// Link objects keep every member the server sent, so they serialize back unchanged.
///
/// ```
/// # use serde_json::json;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use hermes::Links;
///
/// let links: Links = serde_json::from_value(json!({
///     "prev": null,
///     "self": { "href": "http://example.com/images/1" }
/// }))?;
///
/// assert!(links["prev"].is_none());
/// assert_eq!(
///     serde_json::to_value(&links["self"])?,
///     json!({ "href": "http://example.com/images/1" })
/// );
/// #     Ok(())
/// # }
/// ```
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum Link {
    Url(String),
    Object {
        href: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rel: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        describedby: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// The media type of the link's target.
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hreflang: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<Attributes>
    }
}

impl Link {
    pub fn href(&self) -> &str {
        match self {
            Link::Url(url) => url,
            Link::Object { href, .. } => href
        }
    }

    /// The link's meta object, if it has one.
    pub fn meta(&self) -> Option<&Attributes> {
        match self {
            Link::Url(_) => None,
            Link::Object { meta, .. } => meta.as_ref()
        }
    }
}

/// The `jsonapi` member of a document, describing the server's implementation.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct JsonApiObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Attributes>
}

/// An element in the top-level `errors` array of a document.
///
/// [Spec](https://jsonapi.org/format/#error-objects)
///
/// ```
/// # use serde_json::json;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use hermes::Document;
///
/// let document: Document = serde_json::from_value(json!({
///     "errors": [{
///         "status": "403",
///         "title": "Forbidden",
///         "source": { "pointer": "/data/attributes/title" }
///     }]
/// }))?;
///
/// let error = &document.errors().unwrap()[0];
/// assert_eq!(error.title.as_deref(), Some("Forbidden"));
/// assert_eq!(error.to_string(), "403 Forbidden (/data/attributes/title)");
///
/// #     Ok(())
/// # }
/// ```
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    /// The HTTP status code for this problem. Sent as a string, but numbers are accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Attributes>
}

/// Which part of the request document caused an error.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct ErrorSource {
    /// A JSON Pointer to the value in the request document, e.g. `/data/attributes/title`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    /// The query parameter that caused the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>
}

impl std::fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self.status {
            Some(Value::String(ref status)) => status.clone(),
            Some(ref status) => status.to_string(),
            None => "error".to_string()
        };
        let message = self
            .title
            .as_deref()
            .or(self.detail.as_deref())
            .or(self.code.as_deref())
            .unwrap_or("unknown error");
        write!(f, "{} {}", status, message)?;

        let location = self.source.as_ref().and_then(|source| {
            source
                .pointer
                .as_deref()
                .or(source.parameter.as_deref())
        });
        if let Some(location) = location {
            write!(f, " ({})", location)?;
        }
        Ok(())
    }
}
