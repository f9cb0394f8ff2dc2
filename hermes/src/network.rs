//! Low-level request helpers shared by the store and storeless clients.

use crate::{
    transport::FetchRequest,
    utils::{resolve_url, with_query},
    Client, Data, Document, Error, HttpRequest, HttpResponse, Link, Method, PrimaryData,
    RawResponse, Record, RequestOptions, Response, ResponseFuture, Result, Store
};
use futures::{future, FutureExt};
use serde_json::{error::Category, Value};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, trace};

/// Send a request through the client's transport and parse the body.
///
/// Transport failures (the request never got a response) are returned as `Err`. Everything the
/// server answered, including error statuses and unparseable bodies, ends up in the returned
/// `RawResponse`, with `error` set where appropriate.
pub async fn read(
    client: &Client,
    url: &str,
    method: Method,
    body: Option<&Value>,
    options: &RequestOptions
) -> Result<RawResponse> {
    let url = with_query(&resolve_url(client.base_url(), url)?, &options.query_params())?;
    let headers = client.request_headers(options);

    debug!(%method, %url, "sending request");
    let request = HttpRequest {
        method,
        url,
        headers: headers.clone(),
        body: body.cloned()
    };
    let response = client.transport().send(request).await?;
    trace!(status = response.status, "received response");

    Ok(parse_response(response, headers))
}

fn parse_response(response: HttpResponse, request_headers: BTreeMap<String, String>) -> RawResponse {
    let HttpResponse {
        status,
        headers,
        body
    } = response;
    let mut raw = RawResponse {
        status,
        headers,
        request_headers,
        ..Default::default()
    };

    if !(200..300).contains(&status) {
        raw.error = Some(Error::status(status));
        return raw;
    }
    if status == 204 || body.trim().is_empty() {
        return raw;
    }

    match serde_json::from_str::<Document>(&body) {
        Ok(document) => raw.data = Some(document),
        Err(e) => {
            let kind = match e.classify() {
                Category::Data => "invalid-document",
                Category::Syntax | Category::Eof => "invalid-json",
                Category::Io => "io"
            };
            raw.error = Some(Error::malformed(kind, e));
        }
    }
    raw
}

/// Run a request through the client's fetch strategy.
pub async fn dispatch(
    client: &Client,
    store: Option<Store>,
    url: String,
    method: Method,
    body: Option<Value>,
    options: RequestOptions
) -> Result<Arc<Response>> {
    let request = FetchRequest {
        store,
        client: client.clone(),
        url,
        method,
        body,
        options
    };
    client.fetch_strategy().fetch(request).await
}

/// Follow a link. A missing link resolves to an empty response instead of failing, so code that
/// pages through a collection doesn't have to special-case the last page.
///
/// Link urls already carry their own query string, so only the headers of the original request
/// (and any headers in `options`) are reused.
pub fn fetch_link(
    link: Option<&Link>,
    store: Option<Store>,
    client: &Client,
    request_headers: &BTreeMap<String, String>,
    options: Option<&RequestOptions>
) -> ResponseFuture {
    let link = match link {
        Some(link) => link,
        None => {
            let response = Response::empty(store.as_ref(), client.clone(), request_headers.clone());
            return future::ready(Ok(Arc::new(response))).boxed().shared();
        }
    };

    let mut headers = request_headers.clone();
    if let Some(options) = options {
        for (key, value) in &options.headers {
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(key));
            headers.insert(key.clone(), value.clone());
        }
    }
    let options = RequestOptions {
        headers,
        ..Default::default()
    };
    let client = client.clone();
    let url = link.href().to_string();
    async move { dispatch(&client, store, url, Method::Get, None, options).await }
        .boxed()
        .shared()
}

pub(crate) fn fetch_record_link(
    client: &Client,
    store: Option<Store>,
    record: &Record,
    name: &str,
    options: Option<RequestOptions>
) -> ResponseFuture {
    let headers = client.default_headers().clone();
    let future = fetch_link(record.link(name).as_ref(), store, client, &headers, options.as_ref());

    // A queued job resolving to the record it was created for hands back the caller's record.
    match record.queued_record() {
        Some(original) => async move {
            let response = future.await?;
            match response.record() {
                Some(resolved) if resolved.kind() == original.kind() => {
                    response.replace_data(&original)
                }
                _ => Ok(response)
            }
        }
        .boxed()
        .shared(),
        None => future
    }
}

pub(crate) fn fetch_relationship_link(
    client: &Client,
    store: Option<Store>,
    record: &Record,
    relationship: &str,
    name: &str,
    options: Option<RequestOptions>
) -> ResponseFuture {
    let headers = client.default_headers().clone();
    let link = record
        .relationship_links(relationship)
        .and_then(|mut links| links.remove(name))
        .flatten();
    fetch_link(link.as_ref(), store, client, &headers, options.as_ref())
}

/// Replace a relationship on the server by `PATCH`ing its `self` link with the record's current
/// linkage. The ids the server answers with are written back onto the record.
pub(crate) async fn save_relationship(
    client: &Client,
    record: &Record,
    relationship: &str
) -> Result<Record> {
    let link = record
        .relationship_links(relationship)
        .and_then(|mut links| links.remove("self"))
        .flatten()
        .ok_or_else(|| {
            Error::programmer(format!("Relationship {} has no self link", relationship))
        })?;
    let linkage = record
        .to_wire_format()
        .relationships
        .and_then(|mut relationships| relationships.remove(relationship))
        .and_then(|relationship| relationship.data);
    let body = serde_json::json!({ "data": linkage });

    let raw = read(
        client,
        link.href(),
        Method::Patch,
        Some(&body),
        &RequestOptions::default()
    )
    .await?;
    if let Some(error) = raw.error {
        return Err(error);
    }
    if let Some(errors) = raw.data.as_ref().and_then(Document::errors) {
        return Err(Error::Document(errors.to_vec()));
    }

    let ids = match raw.data.and_then(|document| document.data) {
        Some(PrimaryData::Many(list)) => Some(Value::Array(
            list.into_iter()
                .map(|item| item.id.unwrap_or(Value::Null))
                .collect()
        )),
        Some(PrimaryData::One(item)) => Some(item.id.unwrap_or(Value::Null)),
        None => None
    };
    if let Some(ids) = ids {
        record.insert(relationship, ids);
    }
    Ok(record.clone())
}

/// Create or update a record on the server.
///
/// New records are `POST`ed to their type's endpoint, persisted ones are `PATCH`ed at their url.
/// When the server answers with the saved resource, its data is copied onto `record` and the
/// caller's handle stays the canonical one. A `204 No Content` leaves the record as it is. If the
/// server answers with a resource of a different type (such as a job queued to do the work),
/// that resource is returned instead.
pub(crate) async fn save(client: &Client, store: Option<&Store>, record: &Record) -> Result<Record> {
    let kind = record.kind();
    let config = client.type_config(&kind);
    if record.id().is_none() && config.uses_autogenerated_ids() {
        record.assign_client_id(Value::String(config.generate_id()));
    }

    let (url, method) = if record.is_persisted() {
        (client.record_url(record)?, Method::Patch)
    } else {
        (client.endpoint_url(&kind)?, Method::Post)
    };
    let body = serde_json::to_value(Document::from_record(record.to_wire_format()))
        .map_err(|e| Error::programmer(format!("Record can't be serialized: {}", e)))?;

    let response = dispatch(
        client,
        store.cloned(),
        url,
        method,
        Some(body),
        RequestOptions::default()
    )
    .await?;

    match response.data() {
        Some(Data::One(returned)) if returned.kind() != kind => {
            debug!(%kind, returned = %returned.kind(), "save returned a different resource");
            returned.set_queued_record(record);
            Ok(returned.clone())
        }
        Some(Data::One(_)) => {
            response.replace_data(record)?;
            if let Some(store) = store {
                store.add_record(record);
            }
            Ok(record.clone())
        }
        Some(Data::Many(records)) if !records.is_empty() => Err(Error::programmer(
            "Saving a record returned a list of resources"
        )),
        _ => {
            record.mark_persisted();
            if let Some(store) = store {
                store.add_record(record);
            }
            Ok(record.clone())
        }
    }
}

/// Delete a record on the server and drop it from the store. Records the server never saw are
/// only dropped from the store.
pub(crate) async fn remove(client: &Client, store: Option<&Store>, record: &Record) -> Result<()> {
    if record.is_persisted() {
        let url = client.record_url(record)?;
        dispatch(
            client,
            store.cloned(),
            url,
            Method::Delete,
            None,
            RequestOptions::default()
        )
        .await?;
    }

    if let (Some(store), Some(id)) = (store, record.id_key()) {
        store.remove(&record.kind(), id);
    }
    Ok(())
}
