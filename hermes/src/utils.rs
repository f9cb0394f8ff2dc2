use crate::Result;
use serde_json::Value;
use url::Url;

/// The string a resource id is filed under. JSON:API ids are strings, but plenty of servers send
/// numbers, so `1` and `"1"` refer to the same resource.
pub fn id_key(id: &Value) -> Option<String> {
    match id {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None
    }
}

/// Resolve a request url against the base url. Absolute urls are returned as they are, relative
/// ones are appended to the base.
///
/// ```
/// use hermes::utils::resolve_url;
///
/// assert_eq!(
///     resolve_url("http://example.com/api", "event/1").unwrap(),
///     "http://example.com/api/event/1"
/// );
/// assert_eq!(
///     resolve_url("http://example.com/api/", "http://other.com/event?page=2").unwrap(),
///     "http://other.com/event?page=2"
/// );
/// ```
pub fn resolve_url(base: &str, url: &str) -> Result<String> {
    if let Ok(absolute) = Url::parse(url) {
        return Ok(absolute.into());
    }

    let mut joined = String::with_capacity(base.len() + url.len() + 1);
    joined.push_str(base);
    if !joined.ends_with('/') && !url.is_empty() {
        joined.push('/');
    }
    joined.push_str(url.trim_start_matches('/'));

    Ok(Url::parse(&joined)?.into())
}

/// Append query parameters to a url, keeping any that are already there.
pub fn with_query(url: &str, params: &[(String, String)]) -> Result<String> {
    let mut url = Url::parse(url)?;
    if !params.is_empty() {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
    }
    Ok(url.into())
}

/// Join url path segments with exactly one `/` between them.
pub(crate) fn join_path(base: &str, segment: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        segment.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::{id_key, join_path, resolve_url, with_query};
    use serde_json::json;

    #[test]
    fn numeric_and_string_ids_share_a_key() {
        assert_eq!(id_key(&json!(12345)), id_key(&json!("12345")));
        assert_eq!(id_key(&json!(null)), None);
    }

    #[test]
    fn prepends_base_url() {
        assert_eq!(
            resolve_url("http://example.com/", "/event/1").unwrap(),
            "http://example.com/event/1"
        );
        assert!(resolve_url("not a url", "event").is_err());
    }

    #[test]
    fn appends_encoded_query() {
        let url = with_query(
            "http://example.com/event?page=2",
            &[("filter[name]".to_string(), "foo bar".to_string())]
        )
        .unwrap();
        assert_eq!(url, "http://example.com/event?page=2&filter%5Bname%5D=foo+bar");
        assert_eq!(
            with_query("http://example.com/event", &[]).unwrap(),
            "http://example.com/event"
        );
    }

    #[test]
    fn joins_segments() {
        assert_eq!(join_path("event/", "/1"), "event/1");
    }
}
