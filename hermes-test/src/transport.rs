use crate::fixtures;
use async_trait::async_trait;
use hermes::{transport::Transport, HttpRequest, HttpResponse, Method, Result};
use http::{HeaderMap, HeaderValue};
use parking_lot::Mutex;
use std::sync::Arc;

/// A canned answer for one method and url.
#[derive(Clone, Debug)]
pub struct Route {
    pub method: Method,
    /// Matched exactly, or ignoring the query string if the route has none.
    pub url: String,
    pub status: u16,
    pub body: String,
    pub headers: HeaderMap
}

#[derive(Default)]
struct State {
    routes: Vec<Route>,
    requests: Vec<HttpRequest>
}

/// An in-memory transport that answers from registered routes and records every request.
///
/// Requests without a matching route get a `404`. Clones share routes and recorded requests, so
/// a test can keep one clone and hand the other to the client.
#[derive(Clone, Default)]
pub struct MockTransport(Arc<Mutex<State>>);

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method url` with `status` and `body`, replacing any earlier route for it.
    pub fn mock<U: Into<String>, B: Into<String>>(
        &self,
        method: Method,
        url: U,
        status: u16,
        body: B
    ) -> &Self {
        let route = Route {
            method,
            url: url.into(),
            status,
            body: body.into(),
            headers: HeaderMap::new()
        };
        self.add_route(route);
        self
    }

    /// Answer `method url` with a fixture. `queue-1` is served with `202 Accepted`, everything
    /// else with `200 OK`.
    pub fn mock_fixture<U: Into<String>>(&self, method: Method, url: U, fixture: &str) -> &Self {
        let status = if fixture == "queue-1" { 202 } else { 200 };
        self.mock(method, url, status, fixtures::body(fixture))
    }

    /// Answer `method url` with `status` and a response header.
    pub fn mock_with_header<U: Into<String>, B: Into<String>>(
        &self,
        method: Method,
        url: U,
        status: u16,
        body: B,
        header: (&'static str, &'static str)
    ) -> &Self {
        let mut headers = HeaderMap::new();
        headers.insert(header.0, HeaderValue::from_static(header.1));
        let route = Route {
            method,
            url: url.into(),
            status,
            body: body.into(),
            headers
        };
        self.add_route(route);
        self
    }

    pub fn add_route(&self, route: Route) {
        let mut state = self.0.lock();
        state
            .routes
            .retain(|existing| !(existing.method == route.method && existing.url == route.url));
        state.routes.push(route);
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.0.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.0.lock().requests.last().cloned()
    }

    /// The number of requests sent so far.
    pub fn calls(&self) -> usize {
        self.0.lock().requests.len()
    }

    /// The number of requests sent to one method and url, ignoring the query string.
    pub fn calls_to(&self, method: Method, url: &str) -> usize {
        self.0
            .lock()
            .requests
            .iter()
            .filter(|request| request.method == method && strip_query(&request.url) == url)
            .count()
    }

    fn respond(&self, request: &HttpRequest) -> HttpResponse {
        let state = self.0.lock();
        let exact = state
            .routes
            .iter()
            .find(|route| route.method == request.method && route.url == request.url);
        let route = exact.or_else(|| {
            state.routes.iter().find(|route| {
                route.method == request.method
                    && !route.url.contains('?')
                    && route.url == strip_query(&request.url)
            })
        });

        match route {
            Some(route) => HttpResponse {
                status: route.status,
                headers: route.headers.clone(),
                body: route.body.clone()
            },
            None => HttpResponse::new(404, "")
        }
    }
}

fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.respond(&request);
        self.0.lock().requests.push(request);
        Ok(response)
    }
}
