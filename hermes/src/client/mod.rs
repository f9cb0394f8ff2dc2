use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc
};

mod builder;

use crate::{
    network,
    transport::{FetchStrategy, Transport},
    utils::{join_path, resolve_url},
    Method, Record, RequestOptions, Response, ResponseFuture, Result
};
pub use builder::ClientBuilder;

/// Where the records of a type live, relative to the client's base url.
#[derive(Clone)]
pub enum Endpoint {
    Static(String),
    Dynamic(Arc<dyn Fn() -> String + Send + Sync>)
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Static(path) => f.debug_tuple("Static").field(path).finish(),
            Endpoint::Dynamic(_) => f.write_str("Dynamic(..)")
        }
    }
}

/// Per-type settings: the endpoint and how new records get their ids.
///
/// ```
/// use hermes::TypeConfig;
///
/// let config = TypeConfig::new("event")
///     .endpoint("foo/event")
///     .autogenerated_ids(true)
///     .auto_id(|| "110ec58a-a0f2-4ac4-8393-c866d813b8d1".to_string());
///
/// assert_eq!(config.endpoint_path(), "foo/event");
/// assert_eq!(config.generate_id().len(), 36);
/// ```
#[derive(Clone)]
pub struct TypeConfig {
    kind: String,
    endpoint: Option<Endpoint>,
    use_autogenerated_ids: bool,
    auto_id: Option<Arc<dyn Fn() -> String + Send + Sync>>
}

impl TypeConfig {
    pub fn new<S: Into<String>>(kind: S) -> Self {
        TypeConfig {
            kind: kind.into(),
            endpoint: None,
            use_autogenerated_ids: false,
            auto_id: None
        }
    }

    pub fn endpoint<S: Into<String>>(mut self, path: S) -> Self {
        self.endpoint = Some(Endpoint::Static(path.into()));
        self
    }

    pub fn endpoint_fn<F: Fn() -> String + Send + Sync + 'static>(mut self, path: F) -> Self {
        self.endpoint = Some(Endpoint::Dynamic(Arc::new(path)));
        self
    }

    /// Generate ids on the client instead of letting the server assign them.
    pub fn autogenerated_ids(mut self, enabled: bool) -> Self {
        self.use_autogenerated_ids = enabled;
        self
    }

    /// The id generator for autogenerated ids. Defaults to random UUIDs.
    pub fn auto_id<F: Fn() -> String + Send + Sync + 'static>(mut self, generator: F) -> Self {
        self.auto_id = Some(Arc::new(generator));
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The endpoint path, defaulting to the type name.
    pub fn endpoint_path(&self) -> String {
        match self.endpoint {
            Some(Endpoint::Static(ref path)) => path.clone(),
            Some(Endpoint::Dynamic(ref path)) => path(),
            None => self.kind.clone()
        }
    }

    pub fn uses_autogenerated_ids(&self) -> bool {
        self.use_autogenerated_ids
    }

    pub fn generate_id(&self) -> String {
        match self.auto_id {
            Some(ref generator) => generator(),
            None => uuid::Uuid::new_v4().to_string()
        }
    }
}

impl fmt::Debug for TypeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeConfig")
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("use_autogenerated_ids", &self.use_autogenerated_ids)
            .finish()
    }
}

pub struct ClientImpl {
    pub(crate) base_url: String,
    pub(crate) default_headers: BTreeMap<String, String>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) fetch_strategy: Arc<dyn FetchStrategy>,
    pub(crate) types: HashMap<String, TypeConfig>
}

/// The configuration every request is made with: base url, headers, transport, fetch strategy
/// and per-type settings. Cheap to clone.
///
/// A client on its own works with standalone records that aren't tracked by any store. To get an
/// identity map and request caching, wrap it in a [`Store`](./struct.Store.html).
#[derive(Clone)]
#[repr(transparent)]
pub struct Client(pub Arc<ClientImpl>);

impl Client {
    pub fn builder<U: Into<String>>(base_url: U) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.0.base_url
    }

    pub fn default_headers(&self) -> &BTreeMap<String, String> {
        &self.0.default_headers
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.0.transport
    }

    pub fn fetch_strategy(&self) -> &Arc<dyn FetchStrategy> {
        &self.0.fetch_strategy
    }

    /// The settings for a type, or the defaults if none were registered.
    pub fn type_config(&self, kind: &str) -> TypeConfig {
        self.0
            .types
            .get(kind)
            .cloned()
            .unwrap_or_else(|| TypeConfig::new(kind))
    }

    /// The absolute url of a type's collection.
    pub fn endpoint_url(&self, kind: &str) -> Result<String> {
        resolve_url(&self.0.base_url, &self.type_config(kind).endpoint_path())
    }

    /// The url of a single record: its `self` link if it has one, or the type's endpoint
    /// followed by the id.
    pub fn record_url(&self, record: &Record) -> Result<String> {
        if let Some(link) = record.link("self") {
            return resolve_url(&self.0.base_url, link.href());
        }
        let endpoint = self.endpoint_url(&record.kind())?;
        Ok(match record.id_key() {
            Some(id) => join_path(&endpoint, &id),
            None => endpoint
        })
    }

    /// The default headers overlaid with the per-call headers. Header names are compared
    /// case-insensitively.
    pub fn request_headers(&self, options: &RequestOptions) -> BTreeMap<String, String> {
        let mut headers = self.0.default_headers.clone();
        for (key, value) in &options.headers {
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(key));
            headers.insert(key.clone(), value.clone());
        }
        headers
    }

    /// Make an uncached request for a single resource. Plural results are rejected since there
    /// is no store to put them in.
    pub async fn request(
        &self,
        url: &str,
        method: Method,
        options: Option<RequestOptions>
    ) -> Result<Arc<Response>> {
        network::dispatch(
            self,
            None,
            url.to_string(),
            method,
            None,
            options.unwrap_or_default()
        )
        .await
    }

    /// Save a standalone record. See [`Store::save`](./struct.Store.html#method.save).
    pub async fn save(&self, record: &Record) -> Result<Record> {
        network::save(self, None, record).await
    }

    /// Replace one of a record's relationships on the server, by `PATCH`ing the relationship's
    /// `self` link with the record's current linkage.
    pub async fn save_relationship(&self, record: &Record, relationship: &str) -> Result<Record> {
        network::save_relationship(self, record, relationship).await
    }

    /// Delete a standalone record on the server. Records that were never saved are a no-op.
    pub async fn remove(&self, record: &Record) -> Result<()> {
        network::remove(self, None, record).await
    }

    /// Follow one of a standalone record's own links.
    pub fn fetch_link(
        &self,
        record: &Record,
        name: &str,
        options: Option<RequestOptions>
    ) -> ResponseFuture {
        network::fetch_record_link(self, None, record, name, options)
    }

    /// Follow one of the links of a standalone record's relationship.
    pub fn fetch_relationship_link(
        &self,
        record: &Record,
        relationship: &str,
        name: &str,
        options: Option<RequestOptions>
    ) -> ResponseFuture {
        network::fetch_relationship_link(self, None, record, relationship, name, options)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.0.base_url)
            .field("default_headers", &self.0.default_headers)
            .field("types", &self.0.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Client, TypeConfig};
    use crate::{Record, RequestOptions};
    use serde_json::json;

    fn client() -> Client {
        Client::builder("http://example.com/")
            .with_type(TypeConfig::new("event").endpoint("foo/event"))
            .with_type(TypeConfig::new("image").endpoint_fn(|| "images".to_string()))
            .build()
    }

    #[test]
    fn endpoints_default_to_the_type_name() {
        let client = client();
        assert_eq!(client.endpoint_url("user").unwrap(), "http://example.com/user");
        assert_eq!(client.endpoint_url("event").unwrap(), "http://example.com/foo/event");
        assert_eq!(client.endpoint_url("image").unwrap(), "http://example.com/images");
    }

    #[test]
    fn record_urls_prefer_self_links() {
        let client = client();
        let record = Record::with_type("image").set("id", json!(1));
        assert_eq!(client.record_url(&record).unwrap(), "http://example.com/images/1");

        let wire = serde_json::from_value(json!({
            "id": "12345",
            "type": "event",
            "links": { "self": "http://example.com/event/1234" }
        }))
        .unwrap();
        let record = Record::from_wire(&wire);
        assert_eq!(client.record_url(&record).unwrap(), "http://example.com/event/1234");
    }

    #[test]
    fn per_call_headers_win() {
        let client = Client::builder("http://example.com/")
            .with_header("X-Auth", "12345")
            .build();
        let headers = client.request_headers(&RequestOptions::new().header("x-auth", "54321"));
        assert_eq!(headers.get("x-auth").map(String::as_str), Some("54321"));
        assert!(!headers.contains_key("X-Auth"));
        assert_eq!(
            headers.get("Content-Type").map(String::as_str),
            Some("application/vnd.api+json")
        );
    }
}
