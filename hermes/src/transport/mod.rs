//! The seams between the store and the network.
//!
//! A [`FetchStrategy`](./trait.FetchStrategy.html) turns request parameters into a
//! [`Response`](../struct.Response.html). The default strategy sends the request through the
//! client's [`Transport`](./trait.Transport.html), parses the document and syncs it into the
//! store. Replacing either one leaves the request cache and identity map untouched.

use crate::{
    network, Client, Error, HttpRequest, HttpResponse, Method, RequestOptions, Response,
    ResponseResult, Result, Store
};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

#[cfg(feature = "default-transport")]
mod fetch;

#[cfg(feature = "default-transport")]
pub use fetch::ReqwestTransport;

/// Sends a single HTTP request.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Everything a fetch strategy needs to produce a response.
#[derive(Clone, Debug)]
pub struct FetchRequest {
    /// The store to sync the response into, if any.
    pub store: Option<Store>,
    pub client: Client,
    /// Absolute, or relative to the client's base url.
    pub url: String,
    pub method: Method,
    pub body: Option<Value>,
    pub options: RequestOptions
}

/// Produces the response for a request.
///
/// Implementations must reject, not resolve, anything that shouldn't be treated as a successful
/// response: the request cache relies on failed futures to decide what to keep.
#[async_trait]
pub trait FetchStrategy: Send + Sync + 'static {
    async fn fetch(&self, request: FetchRequest) -> ResponseResult;
}

/// The default strategy: send the request through the client's transport and build a response
/// from the document that comes back.
///
/// Non-2xx statuses, malformed bodies and documents with an `errors` array all fail the request.
pub struct DefaultFetch;

#[async_trait]
impl FetchStrategy for DefaultFetch {
    async fn fetch(&self, request: FetchRequest) -> ResponseResult {
        let FetchRequest {
            store,
            client,
            url,
            method,
            body,
            options
        } = request;

        let raw = network::read(&client, &url, method, body.as_ref(), &options).await?;
        if let Some(error) = raw.error.clone() {
            warn!(%url, %method, status = raw.status, "request failed: {}", error);
            return Err(error);
        }

        let response = Response::new(raw, store.as_ref(), client, Some(options), None)?;
        if let Some(error) = response.error() {
            warn!(%url, %method, "server returned errors: {}", error);
            return Err(error.clone());
        }

        Ok(Arc::new(response))
    }
}

/// The transport of a client that was built without one. Every request fails.
pub struct TerminatorTransport;

#[async_trait]
impl Transport for TerminatorTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        Err(Error::programmer(format!(
            "No transport configured for {} {}",
            request.method, request.url
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::{FetchRequest, FetchStrategy, Transport};
    use crate::{Client, Error, HttpRequest, HttpResponse, Method, Result, Store};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    struct Canned(u16, String, Arc<Mutex<Vec<HttpRequest>>>);

    #[async_trait]
    impl Transport for Canned {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.2.lock().push(request);
            Ok(HttpResponse::new(self.0, self.1.clone()))
        }
    }

    fn client(status: u16, body: &str) -> (Client, Arc<Mutex<Vec<HttpRequest>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let client = Client::builder("http://example.com/")
            .with_transport(Canned(status, body.to_string(), sent.clone()))
            .build();
        (client, sent)
    }

    fn request(client: &Client, store: Option<Store>) -> FetchRequest {
        FetchRequest {
            store,
            client: client.clone(),
            url: "event/1".to_string(),
            method: Method::Get,
            body: None,
            options: Default::default()
        }
    }

    #[tokio::test]
    async fn default_fetch_builds_responses() {
        let body = json!({ "data": { "id": "1", "type": "event", "attributes": { "title": "Test 1" } } });
        let (client, sent) = client(200, &body.to_string());
        let store = Store::new(client.clone());

        let response = client
            .fetch_strategy()
            .fetch(request(&client, Some(store.clone())))
            .await
            .unwrap();

        assert_eq!(sent.lock()[0].url, "http://example.com/event/1");
        let record = response.record().unwrap();
        assert!(record.ptr_eq(&store.find("event", "1").unwrap()));
    }

    #[tokio::test]
    async fn error_documents_reject() {
        let body = json!({ "errors": [{ "status": "400", "title": "Bad request" }] });
        let (client, _) = client(200, &body.to_string());

        let error = client
            .fetch_strategy()
            .fetch(request(&client, None))
            .await
            .unwrap_err();
        assert_eq!(error.errors().map(<[_]>::len), Some(1));
    }

    #[tokio::test]
    async fn bad_statuses_reject() {
        let (client, _) = client(500, "");
        let error = client
            .fetch_strategy()
            .fetch(request(&client, None))
            .await
            .unwrap_err();
        assert_eq!(error.http_status(), Some(500));
        assert_eq!(error.to_string(), "Invalid HTTP status: 500");
    }

    #[tokio::test]
    async fn clients_without_transport_fail() {
        let client = Client::builder("http://example.com/").build();
        let error = client.request("event/1", Method::Get, None).await.unwrap_err();
        assert!(matches!(error, Error::Programmer(_)));
    }
}
