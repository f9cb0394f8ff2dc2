use crate::{
    network, store::WeakStore, Attributes, Client, Data, Error, JsonApiObject, Links, PrimaryData,
    RawResponse, Record, RequestOptions, Result, Store
};
use futures::future::{BoxFuture, Shared};
use http::HeaderMap;
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc
};

/// The result of a request as handed out by the store.
pub type ResponseResult = std::result::Result<Arc<Response>, Error>;
/// A request that may still be in flight. Clones share one underlying request.
pub type ResponseFuture = Shared<BoxFuture<'static, ResponseResult>>;

/// The outcome of one request: the records it returned, along with the document's `meta`,
/// `links` and `jsonapi` members and the HTTP metadata.
///
/// A response never changes once it's built. Link accessors issue their request on first access
/// and return the same shared future every time after that.
pub struct Response {
    data: Option<Data>,
    meta: Attributes,
    links: Links,
    jsonapi: JsonApiObject,
    headers: HeaderMap,
    request_headers: BTreeMap<String, String>,
    error: Option<Error>,
    status: u16,
    store: Option<WeakStore>,
    client: Client,
    options: Option<RequestOptions>,
    raw: RawResponse,
    link_cache: Mutex<HashMap<String, ResponseFuture>>
}

impl Response {
    /// Build a response from a raw exchange.
    ///
    /// With a store, the primary data and any included resources are merged into its identity
    /// map and `data` holds the canonical records. `data_override` replaces the primary data of
    /// the document.
    ///
    /// Without a store, plural data can't be represented and is rejected.
    pub fn new(
        raw: RawResponse,
        store: Option<&Store>,
        client: Client,
        options: Option<RequestOptions>,
        data_override: Option<Data>
    ) -> Result<Response> {
        let document = raw.data.as_ref();

        let data = match (store, data_override) {
            (Some(store), Some(data)) => Some(store.add(data)),
            (Some(store), None) => document.and_then(|document| store.sync(document)),
            (None, Some(Data::Many(_))) => return Err(plural_outside_store()),
            (None, Some(data)) => Some(data),
            (None, None) => match document.and_then(|document| document.data.as_ref()) {
                Some(PrimaryData::Many(_)) => return Err(plural_outside_store()),
                Some(PrimaryData::One(record)) => Some(Data::One(Record::from_wire(record))),
                None => None
            }
        };

        let error = document
            .and_then(|document| document.errors())
            .map(|errors| Error::Document(errors.to_vec()))
            .or_else(|| raw.error.clone());

        Ok(Response {
            data,
            meta: document
                .and_then(|document| document.meta.clone())
                .unwrap_or_default(),
            links: document
                .and_then(|document| document.links.clone())
                .unwrap_or_default(),
            jsonapi: document
                .and_then(|document| document.jsonapi.clone())
                .unwrap_or_default(),
            headers: raw.headers.clone(),
            request_headers: raw.request_headers.clone(),
            error,
            status: raw.status,
            store: store.map(Store::downgrade),
            client,
            options,
            raw,
            link_cache: Mutex::new(HashMap::new())
        })
    }

    /// A `204 No Content` response with an empty list of records. Missing links resolve to this.
    pub fn empty(
        store: Option<&Store>,
        client: Client,
        request_headers: BTreeMap<String, String>
    ) -> Response {
        let raw = RawResponse {
            status: 204,
            request_headers: request_headers.clone(),
            ..Default::default()
        };
        Response {
            data: Some(Data::Many(Vec::new())),
            meta: Attributes::new(),
            links: BTreeMap::new(),
            jsonapi: JsonApiObject::default(),
            headers: HeaderMap::new(),
            request_headers,
            error: None,
            status: 204,
            store: store.map(Store::downgrade),
            client,
            options: None,
            raw,
            link_cache: Mutex::new(HashMap::new())
        }
    }

    pub fn data(&self) -> Option<&Data> {
        self.data.as_ref()
    }

    /// The record, if the response holds a single one.
    pub fn record(&self) -> Option<&Record> {
        self.data.as_ref().and_then(Data::as_record)
    }

    /// The records, if the response holds a list. Empty responses hold an empty list.
    pub fn records(&self) -> Option<&[Record]> {
        self.data.as_ref().and_then(Data::as_records)
    }

    pub fn meta(&self) -> &Attributes {
        &self.meta
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    pub fn jsonapi(&self) -> &JsonApiObject {
        &self.jsonapi
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The headers the request was sent with.
    pub fn request_headers(&self) -> &BTreeMap<String, String> {
        &self.request_headers
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    pub fn options(&self) -> Option<&RequestOptions> {
        self.options.as_ref()
    }

    /// The store this response was synced into, unless it has been dropped since.
    pub fn store(&self) -> Option<Store> {
        self.store.as_ref().and_then(WeakStore::upgrade)
    }

    /// The names of the document's links.
    pub fn link_names(&self) -> Vec<String> {
        self.links.keys().cloned().collect()
    }

    /// Follow the link called `name`. The request is made on first access only, every later
    /// call returns the same future. A link the document doesn't have, or sent as `null`,
    /// resolves to an empty response.
    pub fn link(&self, name: &str) -> ResponseFuture {
        let mut cache = self.link_cache.lock();
        if let Some(future) = cache.get(name) {
            return future.clone();
        }

        let future = network::fetch_link(
            self.links.get(name).and_then(Option::as_ref),
            self.store(),
            &self.client,
            &self.request_headers,
            self.options.as_ref()
        );
        cache.insert(name.to_string(), future.clone());
        future
    }

    pub fn first(&self) -> ResponseFuture {
        self.link("first")
    }

    pub fn prev(&self) -> ResponseFuture {
        self.link("prev")
    }

    pub fn next(&self) -> ResponseFuture {
        self.link("next")
    }

    pub fn last(&self) -> ResponseFuture {
        self.link("last")
    }

    /// Replace the record of this response with `record`, returning a new response.
    ///
    /// This is how a local record becomes the canonical one after saving it: the record the
    /// server returned is dropped from the store, its data (id included) is copied onto `record`
    /// and `record` takes its place in the identity map. If `record` already is the response's
    /// record, the response itself is returned.
    pub fn replace_data(self: &Arc<Self>, record: &Record) -> Result<Arc<Response>> {
        let old = match self.data {
            Some(Data::One(ref old)) => old.clone(),
            _ => {
                return Err(Error::programmer(
                    "Only responses with a single record can have their data replaced"
                ))
            }
        };
        if old.ptr_eq(record) {
            return Ok(self.clone());
        }

        let store = self.store();
        let (old_kind, old_id) = (old.kind(), old.id_key());
        let (new_kind, new_id) = (record.kind(), record.id_key());

        if let (Some(store), Some(id)) = (&store, &old_id) {
            store.remove(&old_kind, id);
        }

        let own_id = record.id();
        record.update_from(&old);
        // An id-less resource leaves the record filed under the id it already had.
        if let Some(id) = old.id().or(own_id) {
            record.set_id(id);
        }

        if let (Some(store), Some(from), Some(to)) = (&store, &new_id, &old_id) {
            store.relocate(&new_kind, from, &old_kind, to);
        }

        let response = Response::new(
            self.raw.clone(),
            store.as_ref(),
            self.client.clone(),
            self.options.clone(),
            Some(Data::One(record.clone()))
        )?;
        Ok(Arc::new(response))
    }
}

fn plural_outside_store() -> Error {
    Error::programmer("plural result invalid outside a store")
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("data", &self.data)
            .field("meta", &self.meta)
            .field("links", &self.links)
            .field("error", &self.error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Response;
    use crate::{
        transport::{FetchRequest, FetchStrategy},
        Client, Data, Document, Error, RawResponse, Record, ResponseResult, Store
    };
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;

    /// Answers every request with the same document and counts the calls.
    struct FakeFetch {
        document: Value,
        calls: Arc<Mutex<Vec<String>>>
    }

    #[async_trait]
    impl FetchStrategy for FakeFetch {
        async fn fetch(&self, request: FetchRequest) -> ResponseResult {
            self.calls.lock().push(request.url.clone());
            let raw = raw(self.document.clone());
            let response = Response::new(
                raw,
                request.store.as_ref(),
                request.client,
                Some(request.options),
                None
            )?;
            Ok(Arc::new(response))
        }
    }

    fn raw(document: Value) -> RawResponse {
        RawResponse {
            status: 200,
            data: Some(serde_json::from_value::<Document>(document).unwrap()),
            ..Default::default()
        }
    }

    fn page() -> Value {
        json!({
            "data": [
                { "id": "1", "type": "event", "attributes": { "title": "Test 1" } },
                { "id": "2", "type": "event", "attributes": { "title": "Test 2" } }
            ],
            "links": { "next": "http://example.com/event?page=2" },
            "meta": { "total": 2 },
            "jsonapi": { "version": "1.0" }
        })
    }

    fn setup() -> (Client, Store, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let client = Client::builder("http://example.com/")
            .with_fetch_strategy(FakeFetch {
                document: page(),
                calls: calls.clone()
            })
            .build();
        let store = Store::new(client.clone());
        (client, store, calls)
    }

    #[test]
    fn syncs_into_the_store() {
        let (client, store, _) = setup();
        let response = Response::new(raw(page()), Some(&store), client, None, None).unwrap();

        let records = response.records().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].ptr_eq(&store.find("event", "1").unwrap()));
        assert_eq!(response.meta()["total"], json!(2));
        assert_eq!(response.jsonapi().version.as_deref(), Some("1.0"));
        assert!(response.error().is_none());
    }

    #[test]
    fn plural_data_needs_a_store() {
        let (client, _, _) = setup();
        let error = Response::new(raw(page()), None, client.clone(), None, None).unwrap_err();
        assert_eq!(error, Error::programmer("plural result invalid outside a store"));

        let override_data = Data::Many(vec![Record::with_type("event")]);
        assert!(Response::new(RawResponse::default(), None, client, None, Some(override_data)).is_err());
    }

    #[test]
    fn storeless_single_records_are_unmanaged() {
        let (client, _, _) = setup();
        let document = json!({ "data": { "id": "12345", "type": "event" } });
        let response = Response::new(raw(document), None, client, None, None).unwrap();
        assert_eq!(response.record().unwrap().id(), Some(json!("12345")));
        assert!(response.store().is_none());
    }

    #[test]
    fn document_errors_win_over_transport_errors() {
        let (client, _, _) = setup();
        let mut raw = raw(json!({ "errors": [{ "status": "404", "title": "Not found" }] }));
        raw.error = Some(Error::status(404));
        let response = Response::new(raw, None, client, None, None).unwrap();
        assert!(matches!(response.error(), Some(Error::Document(_))));
    }

    #[tokio::test]
    async fn links_are_memoized() {
        let (client, store, calls) = setup();
        let response = Response::new(raw(page()), Some(&store), client, None, None).unwrap();

        let first = response.next().await.unwrap();
        let second = response.next().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*calls.lock(), vec!["http://example.com/event?page=2".to_string()]);
    }

    #[tokio::test]
    async fn missing_links_resolve_empty() {
        let (client, store, calls) = setup();
        let response = Response::new(raw(page()), Some(&store), client, None, None).unwrap();

        let prev = response.prev().await.unwrap();
        assert_eq!(prev.records().map(<[_]>::len), Some(0));
        assert_eq!(prev.status(), 204);
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn replacing_with_the_same_record_is_a_no_op() {
        let (client, store, _) = setup();
        let document = json!({ "data": { "id": "12345", "type": "event" } });
        let response = Arc::new(Response::new(raw(document), Some(&store), client, None, None).unwrap());

        let record = response.record().unwrap().clone();
        let replaced = response.replace_data(&record).unwrap();
        assert!(Arc::ptr_eq(&response, &replaced));
    }

    #[test]
    fn replacing_data_moves_the_new_record_into_place() {
        let (client, store, _) = setup();
        let local = Record::with_type("event").set("title", json!("Example title"));
        let local = store.add_record(&local);
        let local_id = local.id_key().unwrap();

        let document = json!({
            "data": { "id": "12345", "type": "event", "attributes": { "title": "Example title" } }
        });
        let response = Arc::new(Response::new(raw(document), Some(&store), client, None, None).unwrap());
        let server_record = response.record().unwrap().clone();

        let replaced = response.replace_data(&local).unwrap();
        assert!(replaced.record().unwrap().ptr_eq(&local));
        assert_eq!(local.id(), Some(json!("12345")));
        assert!(local.is_persisted());
        assert!(store.find("event", "12345").unwrap().ptr_eq(&local));
        assert!(!store.find("event", "12345").unwrap().ptr_eq(&server_record));
        assert!(store.find("event", local_id).is_none());

        // the original response is unchanged
        assert!(response.record().unwrap().ptr_eq(&server_record));
    }

    #[test]
    fn replacing_with_an_id_less_record_keeps_the_local_id() {
        let (client, store, _) = setup();
        let local = store.add_record(&Record::with_type("event"));
        let local_id = local.id();

        let document = json!({ "data": { "type": "event", "attributes": { "title": "Test 1" } } });
        let response = Arc::new(Response::new(raw(document), Some(&store), client, None, None).unwrap());

        let replaced = response.replace_data(&local).unwrap();
        assert!(replaced.record().unwrap().ptr_eq(&local));
        assert_eq!(local.id(), local_id);
        assert_eq!(local.get("title"), Some(json!("Test 1")));
        assert_eq!(store.find_all("event").len(), 1);
        assert!(store.find_all("event")[0].ptr_eq(&local));
    }

    #[tokio::test]
    async fn concurrent_link_accesses_share_one_request() {
        let (client, store, calls) = setup();
        let response = Response::new(raw(page()), Some(&store), client, None, None).unwrap();

        let first = response.next();
        let second = response.next();
        let (first, second) = futures::join!(first, second);

        assert!(Arc::ptr_eq(&first.unwrap(), &second.unwrap()));
        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn null_links_resolve_empty() {
        let (client, store, calls) = setup();
        let mut document = page();
        document["links"]["prev"] = Value::Null;
        let response = Response::new(raw(document), Some(&store), client, None, None).unwrap();

        assert!(response.links()["prev"].is_none());
        let prev = response.prev().await.unwrap();
        assert_eq!(prev.records().map(<[_]>::len), Some(0));
        assert!(calls.lock().is_empty());
    }
}
