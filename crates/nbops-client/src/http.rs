//! reqwest-backed [`Transport`].

use async_trait::async_trait;
use nbops_config::ConnectionSettings;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use crate::error::{RemoteError, RemoteResult, TransportBuildError, classify_response};
use crate::transport::{ApiRequest, Method, Transport, encode_query};

/// Header carrying the per-process trace identifier.
pub const HEADER_REQUEST_ID: &str = "x-request-id";
/// Header selecting the acting role.
pub const HEADER_ROLE: &str = "x-role";

/// Sends requests to a live NocoBase instance.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build a client with bearer auth, JSON headers, optional role and the trace id.
    ///
    /// # Errors
    ///
    /// Returns [`TransportBuildError`] when a header value is not valid HTTP or
    /// reqwest rejects the configuration.
    pub fn new(settings: &ConnectionSettings, trace_id: &str) -> Result<Self, TransportBuildError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
            .map_err(|_| TransportBuildError::InvalidHeader { name: "authorization" })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(role) = &settings.role {
            let value = HeaderValue::from_str(role)
                .map_err(|_| TransportBuildError::InvalidHeader { name: HEADER_ROLE })?;
            headers.insert(HEADER_ROLE, value);
        }
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            TransportBuildError::InvalidHeader {
                name: HEADER_REQUEST_ID,
            }
        })?;
        headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .map_err(|source| TransportBuildError::Client { source })?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
        })
    }

    /// API root every path is resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for `request`, query included.
    ///
    /// Paths are appended textually: `collections:list` would otherwise parse
    /// as a URL with scheme `collections`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidRequest`] when the result is not a URL.
    pub fn url_for(&self, request: &ApiRequest) -> RemoteResult<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            request.path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined).map_err(|err| RemoteError::InvalidRequest {
            message: format!("cannot build URL for '{}': {err}", request.path),
        })?;
        let pairs = encode_query(&request.query);
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }
}

const fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> RemoteResult<Value> {
        let url = self.url_for(request)?;
        debug!(method = %request.method, url = %url, "sending request");

        let mut builder = self.client.request(reqwest_method(request.method), url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|err| RemoteError::Connectivity {
                message: err.to_string(),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| RemoteError::Connectivity {
                message: err.to_string(),
            })?;

        if !status.is_success() {
            return Err(classify_response(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|err| RemoteError::Decode {
            message: err.to_string(),
        })
    }
}
