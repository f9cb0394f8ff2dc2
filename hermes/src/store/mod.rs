//! The store: an identity map of records plus a cache of in-flight and settled requests.

use crate::{
    network, utils::join_path, Client, Data, Document, Error, Method, PrimaryData, Record,
    RequestOptions, ResponseFuture, Result
};
use futures::{future, Future, FutureExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::{
    fmt,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Weak
    }
};
use tracing::debug;

mod builder;
mod cache;
mod identity_map;

pub use builder::StoreBuilder;
use cache::{CacheKey, RequestCache};
use identity_map::IdentityMap;

pub struct StoreImpl {
    client: Client,
    cache_enabled: bool,
    records: Mutex<IdentityMap>,
    requests: RequestCache,
    local_ids: AtomicI64
}

/// A JSON:API store. Cheap to clone; clones share the same records and request cache.
///
/// Every resource the store sees (primary data and included resources alike) is kept as exactly
/// one [`Record`](../struct.Record.html) per type and id, and refetching a resource updates that
/// record in place.
///
/// `fetch`, `fetch_all` and `request` return shared futures. Calling them again with the same
/// arguments returns the same future, so concurrent callers share one request and callers that
/// come later get the settled result without hitting the network. Pass `force` to bypass this.
#[derive(Clone)]
#[repr(transparent)]
pub struct Store(pub(crate) Arc<StoreImpl>);

/// A handle that doesn't keep the store alive. Responses hold one of these, since the store's
/// request cache holds the responses.
#[derive(Clone)]
pub(crate) struct WeakStore(Weak<StoreImpl>);

impl WeakStore {
    pub fn upgrade(&self) -> Option<Store> {
        self.0.upgrade().map(Store)
    }
}

impl Store {
    /// A store with request caching enabled.
    pub fn new(client: Client) -> Self {
        StoreBuilder::new(client).build()
    }

    pub fn builder(client: Client) -> StoreBuilder {
        StoreBuilder::new(client)
    }

    pub fn client(&self) -> &Client {
        &self.0.client
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.0.cache_enabled
    }

    pub(crate) fn downgrade(&self) -> WeakStore {
        WeakStore(Arc::downgrade(&self.0))
    }

    /// Merge a document into the identity map and return the records of its primary data.
    /// Included resources are merged too.
    pub fn sync(&self, document: &Document) -> Option<Data> {
        let mut records = self.0.records.lock();
        for included in document.included.iter().flatten() {
            records.merge(included);
        }

        match document.data {
            Some(PrimaryData::One(ref record)) => Some(Data::One(records.merge(record))),
            Some(PrimaryData::Many(ref list)) => Some(Data::Many(
                list.iter().map(|record| records.merge(record)).collect()
            )),
            None => None
        }
    }

    /// Add records to the store and return the canonical ones.
    pub fn add<D: Into<Data>>(&self, data: D) -> Data {
        match data.into() {
            Data::One(record) => Data::One(self.add_record(&record)),
            Data::Many(list) => Data::Many(list.iter().map(|record| self.add_record(record)).collect())
        }
    }

    /// Add a record to the store and return the canonical one.
    ///
    /// Records without an id get one: a client-generated id if the type is configured for it,
    /// or a negative local id that's never sent to the server. If another record with the same
    /// type and id is already known, it's updated with the fields of `record` and returned.
    pub fn add_record(&self, record: &Record) -> Record {
        let kind = record.kind();
        let id = match record.id_key() {
            Some(id) => id,
            None => {
                let config = self.0.client.type_config(&kind);
                if config.uses_autogenerated_ids() {
                    let id = config.generate_id();
                    record.assign_client_id(Value::String(id.clone()));
                    id
                } else {
                    let id = self.0.local_ids.fetch_sub(1, Ordering::Relaxed) - 1;
                    record.set_id(Value::from(id));
                    id.to_string()
                }
            }
        };

        self.0.records.lock().add(&kind, id, record)
    }

    pub fn find<I: ToString>(&self, kind: &str, id: I) -> Option<Record> {
        self.0.records.lock().get(kind, &id.to_string())
    }

    /// All records of a type, in the order they were first seen.
    pub fn find_all(&self, kind: &str) -> Vec<Record> {
        self.0.records.lock().all(kind)
    }

    /// Drop a record from the identity map. Nothing is sent to the server.
    pub fn remove<I: ToString>(&self, kind: &str, id: I) -> Option<Record> {
        self.0.records.lock().remove(kind, &id.to_string())
    }

    /// Drop every record of a type, along with every cached request for that type.
    pub fn remove_all(&self, kind: &str) -> Vec<Record> {
        self.0.requests.purge_type(kind);
        self.0.records.lock().remove_all(kind)
    }

    pub(crate) fn relocate(&self, from_kind: &str, from_id: &str, to_kind: &str, to_id: &str) {
        self.0
            .records
            .lock()
            .relocate(from_kind, from_id, to_kind, to_id);
    }

    /// Fetch a single record.
    pub fn fetch<I: ToString>(
        &self,
        kind: &str,
        id: I,
        force: bool,
        options: Option<RequestOptions>
    ) -> ResponseFuture {
        let id = id.to_string();
        let options = options.unwrap_or_default();
        let key = CacheKey::fetch(kind, &id, &options);
        // Endpoint functions run outside the cache lock.
        let url = self
            .0
            .client
            .endpoint_url(kind)
            .map(|endpoint| join_path(&endpoint, &id));
        self.cached(key, force, || self.dispatch(url, Method::Get, options))
    }

    /// Fetch the collection of a type. Further pages are available through the response's links.
    pub fn fetch_all(&self, kind: &str, force: bool, options: Option<RequestOptions>) -> ResponseFuture {
        let options = options.unwrap_or_default();
        let key = CacheKey::fetch_all(kind, &options);
        let url = self.0.client.endpoint_url(kind);
        self.cached(key, force, || self.dispatch(url, Method::Get, options))
    }

    /// Request an arbitrary url, relative to the base url or absolute. Only `GET` requests are
    /// cached.
    pub fn request(&self, url: &str, method: Method, options: Option<RequestOptions>) -> ResponseFuture {
        let options = options.unwrap_or_default();
        if method != Method::Get {
            return self.dispatch(Ok(url.to_string()), method, options);
        }

        let key = CacheKey::request(url, method, &options);
        self.cached(key, false, || self.dispatch(Ok(url.to_string()), method, options))
    }

    fn cached<F>(&self, key: CacheKey, force: bool, fetch: F) -> ResponseFuture
    where
        F: FnOnce() -> ResponseFuture
    {
        if !self.0.cache_enabled {
            return fetch();
        }
        self.0.requests.get_or_fetch(key, force, fetch)
    }

    fn dispatch(&self, url: Result<String>, method: Method, options: RequestOptions) -> ResponseFuture {
        let url = match url {
            Ok(url) => url,
            Err(e) => return future::ready(Err(e)).boxed().shared()
        };
        let store = self.downgrade();
        async move {
            let store = store
                .upgrade()
                .ok_or_else(|| Error::programmer("The store was dropped before the request ran"))?;
            let client = store.client().clone();
            network::dispatch(&client, Some(store), url, method, None, options).await
        }
        .boxed()
        .shared()
    }

    /// Create or update a record on the server and make it the canonical record for its id.
    ///
    /// New records are `POST`ed, records the server knows are `PATCH`ed at their `self` link or
    /// their type's endpoint. If the server answers with the record, its data is copied onto
    /// `record`. If it answers with a resource of another type (e.g. a job that will create the
    /// record later), that resource is returned instead.
    pub async fn save(&self, record: &Record) -> Result<Record> {
        network::save(&self.0.client, Some(self), record).await
    }

    /// Replace one of a record's relationships on the server. See
    /// [`Client::save_relationship`](../struct.Client.html#method.save_relationship).
    pub async fn save_relationship(&self, record: &Record, relationship: &str) -> Result<Record> {
        network::save_relationship(&self.0.client, record, relationship).await
    }

    /// Delete a record on the server and drop it from the store. Records the server never saw are
    /// dropped without a request.
    pub async fn destroy_record(&self, record: &Record) -> Result<()> {
        network::remove(&self.0.client, Some(self), record).await?;
        if let Some(id) = record.id_key() {
            self.0.requests.purge_record(&record.kind(), &id);
        }
        Ok(())
    }

    /// Delete the record with this type and id. Unknown records are ignored.
    pub fn destroy<I: ToString>(&self, kind: &str, id: I) -> impl Future<Output = Result<()>> + Send + 'static {
        let store = self.clone();
        let kind = kind.to_string();
        let id = id.to_string();
        async move {
            match store.find(&kind, &id) {
                Some(record) => store.destroy_record(&record).await,
                None => {
                    debug!(%kind, %id, "nothing to destroy");
                    Ok(())
                }
            }
        }
    }

    /// Follow one of a record's own links, syncing the result into this store.
    pub fn fetch_record_link(
        &self,
        record: &Record,
        name: &str,
        options: Option<RequestOptions>
    ) -> ResponseFuture {
        network::fetch_record_link(&self.0.client, Some(self.clone()), record, name, options)
    }

    /// Follow one of the links of a record's relationship, syncing the result into this store.
    pub fn fetch_relationship_link(
        &self,
        record: &Record,
        relationship: &str,
        name: &str,
        options: Option<RequestOptions>
    ) -> ResponseFuture {
        network::fetch_relationship_link(
            &self.0.client,
            Some(self.clone()),
            record,
            relationship,
            name,
            options
        )
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("client", &self.0.client)
            .field("cache_enabled", &self.0.cache_enabled)
            .finish()
    }
}
