use crate::{transport::Transport, Error, HttpRequest, HttpResponse, Result};
use reqwest::header::CONTENT_TYPE;

/// The default transport, backed by `reqwest`.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured `reqwest` client, e.g. one with timeouts or a proxy.
    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

fn network_error(error: reqwest::Error) -> Error {
    Error::Network(error.to_string())
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method.into(), &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            let has_content_type = request
                .headers
                .keys()
                .any(|key| key.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
            if !has_content_type {
                builder = builder.header(CONTENT_TYPE, "application/vnd.api+json");
            }
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(network_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body
        })
    }
}
