#[cfg(feature = "default-transport")]
use crate::transport::ReqwestTransport;
use crate::{
    client::{ClientImpl, TypeConfig},
    transport::{DefaultFetch, FetchStrategy, TerminatorTransport, Transport},
    Client
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc
};

pub struct ClientBuilder {
    base_url: String,
    default_headers: BTreeMap<String, String>,
    transport: Arc<dyn Transport>,
    fetch_strategy: Arc<dyn FetchStrategy>,
    types: HashMap<String, TypeConfig>
}

impl ClientBuilder {
    /// A builder with JSON:API content-type headers and no transport. Requests fail until a
    /// transport is set with `with_transport` or `with_default_transport`.
    pub fn new<U: Into<String>>(base_url: U) -> Self {
        let mut default_headers = BTreeMap::new();
        default_headers.insert(
            "Content-Type".to_string(),
            "application/vnd.api+json".to_string()
        );
        ClientBuilder {
            base_url: base_url.into(),
            default_headers,
            transport: Arc::new(TerminatorTransport),
            fetch_strategy: Arc::new(DefaultFetch),
            types: HashMap::new()
        }
    }

    /// Use the `reqwest` transport.
    #[cfg(feature = "default-transport")]
    pub fn with_default_transport(self) -> Self {
        self.with_transport(ReqwestTransport::new())
    }

    pub fn with_transport<T: Transport>(mut self, transport: T) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Replace the strategy that turns request parameters into responses. This is the place to
    /// intercept, mock or reroute requests without changing how caching works.
    pub fn with_fetch_strategy<S: FetchStrategy>(mut self, strategy: S) -> Self {
        self.fetch_strategy = Arc::new(strategy);
        self
    }

    /// Replace all default headers.
    pub fn with_default_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        let key = key.into();
        self.default_headers
            .retain(|existing, _| !existing.eq_ignore_ascii_case(&key));
        self.default_headers.insert(key, value.into());
        self
    }

    pub fn with_type(mut self, config: TypeConfig) -> Self {
        self.types.insert(config.kind().to_string(), config);
        self
    }

    pub fn build(self) -> Client {
        let client = ClientImpl {
            base_url: self.base_url,
            default_headers: self.default_headers,
            transport: self.transport,
            fetch_strategy: self.fetch_strategy,
            types: self.types
        };

        Client(Arc::new(client))
    }
}
