use crate::{Method, RequestOptions, ResponseFuture};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum OperationKind {
    Fetch,
    FetchAll,
    Request(Method)
}

/// Everything that makes two requests the same request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    kind: OperationKind,
    /// The record type, or the url for plain requests.
    resource: String,
    id: Option<String>,
    options: String
}

impl CacheKey {
    pub fn fetch(kind: &str, id: &str, options: &RequestOptions) -> Self {
        CacheKey {
            kind: OperationKind::Fetch,
            resource: kind.to_string(),
            id: Some(id.to_string()),
            options: options.canonical()
        }
    }

    pub fn fetch_all(kind: &str, options: &RequestOptions) -> Self {
        CacheKey {
            kind: OperationKind::FetchAll,
            resource: kind.to_string(),
            id: None,
            options: options.canonical()
        }
    }

    pub fn request(url: &str, method: Method, options: &RequestOptions) -> Self {
        CacheKey {
            kind: OperationKind::Request(method),
            resource: url.to_string(),
            id: None,
            options: options.canonical()
        }
    }

    fn is_type(&self, kind: &str) -> bool {
        matches!(self.kind, OperationKind::Fetch | OperationKind::FetchAll) && self.resource == kind
    }
}

/// The request futures of a store, keyed by what was requested.
///
/// Lookups and inserts happen under one lock before any future is polled, so concurrent callers
/// asking for the same thing always end up with the same future.
#[derive(Default)]
pub(crate) struct RequestCache {
    entries: Mutex<HashMap<CacheKey, ResponseFuture>>
}

impl RequestCache {
    /// The cached future for `key`, or the one `fetch` creates. With `force`, any cached future
    /// is replaced.
    ///
    /// Futures that failed with a transient error are evicted here, on the next lookup after they
    /// settled.
    pub fn get_or_fetch<F>(&self, key: CacheKey, force: bool, fetch: F) -> ResponseFuture
    where
        F: FnOnce() -> ResponseFuture
    {
        let mut entries = self.entries.lock();
        if !force {
            if let Some(future) = entries.get(&key) {
                let stale = matches!(future.peek(), Some(Err(e)) if e.is_transient());
                if !stale {
                    debug!(?key, "request cache hit");
                    return future.clone();
                }
                debug!(?key, "evicting failed request");
            }
        }

        debug!(?key, force, "request cache miss");
        let future = fetch();
        entries.insert(key, future.clone());
        future
    }

    /// Drop every `fetch` and `fetch_all` entry of a type.
    pub fn purge_type(&self, kind: &str) {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.is_type(kind));
        debug!(%kind, purged = before - entries.len(), "purged request cache");
    }

    /// Drop the `fetch` entries of a single record and the `fetch_all` entries of its type.
    pub fn purge_record(&self, kind: &str, id: &str) {
        let mut entries = self.entries.lock();
        entries.retain(|key, _| {
            let matches = match key.kind {
                OperationKind::Fetch => key.id.as_deref() == Some(id),
                OperationKind::FetchAll => true,
                OperationKind::Request(_) => false
            };
            !(matches && key.resource == kind)
        });
        debug!(%kind, %id, "purged request cache for record");
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
