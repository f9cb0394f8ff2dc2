use crate::{Document, Error, Record};
use http::HeaderMap;
use serde_json::Value;
use std::{collections::BTreeMap, fmt};

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE"
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
            Method::Delete => http::Method::DELETE
        }
    }
}

/// Per-call request options. These end up in the query string and the request headers, and
/// are part of the request cache key.
///
/// ```
/// use hermes::RequestOptions;
/// use serde_json::json;
///
/// let options = RequestOptions::new()
///     .filter(json!({ "name": "foo", "bar": { "id": 2 } }))
///     .sort("-name")
///     .sort("bar.id")
///     .include("bar");
///
/// assert_eq!(
///     options.query_params(),
///     vec![
///         ("filter[bar.id]".to_string(), "2".to_string()),
///         ("filter[name]".to_string(), "foo".to_string()),
///         ("sort".to_string(), "-name,bar.id".to_string()),
///         ("include".to_string(), "bar".to_string())
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// A (possibly nested) filter object. Nested keys are joined with `.`.
    pub filter: Option<Value>,
    pub sort: Vec<String>,
    pub include: Vec<String>,
    /// Sparse fieldsets, keyed by resource type.
    pub fields: BTreeMap<String, Vec<String>>,
    /// Any other query parameters, such as `page[number]`.
    pub params: BTreeMap<String, String>,
    /// Extra request headers. They take precedence over the client's default headers.
    pub headers: BTreeMap<String, String>
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort<S: Into<String>>(mut self, field: S) -> Self {
        self.sort.push(field.into());
        self
    }

    pub fn include<S: Into<String>>(mut self, path: S) -> Self {
        self.include.push(path.into());
        self
    }

    pub fn fields<K, I, S>(mut self, kind: K, fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        self.fields
            .entry(kind.into())
            .or_insert_with(Vec::new)
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// The query parameters for these options, in a stable order.
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Some(ref filter) = self.filter {
            flatten_filter(filter, String::new(), &mut params);
        }
        if !self.sort.is_empty() {
            params.push(("sort".to_string(), self.sort.join(",")));
        }
        if !self.include.is_empty() {
            params.push(("include".to_string(), self.include.join(",")));
        }
        for (kind, fields) in &self.fields {
            params.push((format!("fields[{}]", kind), fields.join(",")));
        }
        for (key, value) in &self.params {
            params.push((key.clone(), value.clone()));
        }

        params
    }

    /// A canonical string for everything that influences the request, used as part of the
    /// request cache key. Header names are compared case-insensitively.
    pub(crate) fn canonical(&self) -> String {
        let headers: BTreeMap<String, &str> = self
            .headers
            .iter()
            .map(|(key, value)| (key.to_ascii_lowercase(), value.as_str()))
            .collect();
        serde_json::to_string(&(self.query_params(), headers)).unwrap_or_default()
    }
}

fn flatten_filter(value: &Value, prefix: String, params: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            let mut entries = map.iter().collect::<Vec<_>>();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            for (key, value) in entries {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_filter(value, key, params);
            }
        }
        value => params.push((format!("filter[{}]", prefix), filter_value(value)))
    }
}

fn filter_value(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        Value::Null => String::new(),
        Value::Array(values) => values
            .iter()
            .map(filter_value)
            .collect::<Vec<_>>()
            .join(","),
        value => value.to_string()
    }
}

/// A fully resolved HTTP request, as handed to a [`Transport`](./transport/trait.Transport.html).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpRequest {
    pub method: Method,
    /// The absolute URL, including the query string.
    pub url: String,
    pub headers: BTreeMap<String, String>,
    /// The JSON body. Only set for writes.
    pub body: Option<Value>
}

/// What a [`Transport`](./transport/trait.Transport.html) got back from the server.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String
}

impl HttpResponse {
    pub fn new<B: Into<String>>(status: u16, body: B) -> Self {
        HttpResponse {
            status,
            headers: HeaderMap::new(),
            body: body.into()
        }
    }
}

/// The outcome of one HTTP exchange, before it is turned into a
/// [`Response`](./struct.Response.html).
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// The parsed document. `None` for `204 No Content` and failed requests.
    pub data: Option<Document>,
    pub headers: HeaderMap,
    /// The headers that were sent with the request.
    pub request_headers: BTreeMap<String, String>,
    pub error: Option<Error>
}

/// The records of a response: one record or a list of them.
#[derive(Debug, Clone)]
pub enum Data {
    One(Record),
    Many(Vec<Record>)
}

impl Data {
    /// The record, if this is singular data.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Data::One(record) => Some(record),
            Data::Many(_) => None
        }
    }

    /// The records, if this is plural data.
    pub fn as_records(&self) -> Option<&[Record]> {
        match self {
            Data::One(_) => None,
            Data::Many(records) => Some(records)
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Data::Many(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Data::One(_) => 1,
            Data::Many(records) => records.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        let records: &[Record] = match self {
            Data::One(record) => std::slice::from_ref(record),
            Data::Many(records) => records
        };
        records.iter()
    }
}

impl From<Record> for Data {
    fn from(record: Record) -> Self {
        Data::One(record)
    }
}

impl From<Vec<Record>> for Data {
    fn from(records: Vec<Record>) -> Self {
        Data::Many(records)
    }
}

#[cfg(test)]
mod tests {
    use super::RequestOptions;
    use serde_json::json;

    fn params(options: &RequestOptions) -> Vec<(String, String)> {
        options.query_params()
    }

    #[test]
    fn flattens_nested_filters() {
        let options = RequestOptions::new().filter(json!({ "name": "foo", "bar": { "id": 2 } }));
        assert_eq!(
            params(&options),
            vec![
                ("filter[bar.id]".to_string(), "2".to_string()),
                ("filter[name]".to_string(), "foo".to_string())
            ]
        );
    }

    #[test]
    fn joins_sparse_fields() {
        let options = RequestOptions::new()
            .fields("bar", vec!["name"])
            .fields("bar.baz", vec!["foo", "bar"])
            .fields("foo", vec!["name"]);
        assert_eq!(
            params(&options),
            vec![
                ("fields[bar]".to_string(), "name".to_string()),
                ("fields[bar.baz]".to_string(), "foo,bar".to_string()),
                ("fields[foo]".to_string(), "name".to_string())
            ]
        );
    }

    #[test]
    fn canonical_form_ignores_insertion_order() {
        let a = RequestOptions::new()
            .param("page[size]", "10")
            .param("page[number]", "2")
            .header("X-Auth", "1");
        let b = RequestOptions::new()
            .header("X-Auth", "1")
            .param("page[number]", "2")
            .param("page[size]", "10");
        assert_eq!(a.canonical(), b.canonical());
        assert_ne!(a.canonical(), RequestOptions::new().canonical());
    }

    #[test]
    fn canonical_form_keeps_values_apart() {
        let joined = RequestOptions::new().param("a", "1&b=2");
        let split = RequestOptions::new().param("a", "1").param("b", "2");
        assert_ne!(joined.canonical(), split.canonical());

        let in_header = RequestOptions::new().header("x", "1|y:2");
        let two_headers = RequestOptions::new().header("x", "1").header("y", "2");
        assert_ne!(in_header.canonical(), two_headers.canonical());
    }

    #[test]
    fn canonical_form_ignores_header_case() {
        let upper = RequestOptions::new().header("X-Auth", "1");
        let lower = RequestOptions::new().header("x-auth", "1");
        assert_eq!(upper.canonical(), lower.canonical());
    }
}
