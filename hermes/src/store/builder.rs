use crate::{
    store::{cache::RequestCache, identity_map::IdentityMap, StoreImpl},
    Client, Store
};
use parking_lot::Mutex;
use std::sync::{atomic::AtomicI64, Arc};

/// Builds a [`Store`](../struct.Store.html).
pub struct StoreBuilder {
    client: Client,
    cache: bool
}

impl StoreBuilder {
    pub fn new(client: Client) -> Self {
        StoreBuilder {
            client,
            cache: true
        }
    }

    /// Whether requests are de-duplicated and cached. On by default. With caching off, every
    /// call goes to the network.
    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    pub fn build(self) -> Store {
        let store = StoreImpl {
            client: self.client,
            cache_enabled: self.cache,
            records: Mutex::new(IdentityMap::default()),
            requests: RequestCache::default(),
            local_ids: AtomicI64::new(0)
        };

        Store(Arc::new(store))
    }
}
