//! Request model and the transport seam.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::RemoteResult;

/// HTTP verbs used against the NocoBase API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read.
    Get,
    /// Create or invoke an action.
    Post,
    /// Replace.
    Put,
    /// Partial update.
    Patch,
    /// Remove.
    Delete,
}

impl Method {
    /// Upper-case verb name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Everything except `GET` changes remote state.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl Display for Method {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One API call: verb, resource path relative to the API root, query and body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP verb.
    pub method: Method,
    /// Path such as `collections:list` or `roles/admin/resources:create`.
    pub path: String,
    /// Query parameters; see [`encode_query`] for the wire form.
    pub query: Map<String, Value>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Request with no query and no body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Map::new(),
            body: None,
        }
    }

    /// `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// `POST` request with `body`.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    /// Attach a body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add one query parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Merge the entries of an object into the query; other values are ignored.
    #[must_use]
    pub fn with_params(mut self, params: Option<&Value>) -> Self {
        if let Some(Value::Object(map)) = params {
            self.query
                .extend(map.iter().map(|(key, value)| (key.clone(), value.clone())));
        }
        self
    }
}

/// Anything that can execute an [`ApiRequest`] and return the JSON payload.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute the request.
    ///
    /// # Errors
    ///
    /// Returns a classified [`crate::RemoteError`] for every failure.
    async fn send(&self, request: &ApiRequest) -> RemoteResult<Value>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &ApiRequest) -> RemoteResult<Value> {
        (**self).send(request).await
    }
}

/// Wire form of query parameters.
///
/// Strings, numbers and booleans are sent verbatim, objects and arrays are
/// JSON-encoded (the `filter=` / `appends=` convention), nulls are dropped.
#[must_use]
pub fn encode_query(query: &Map<String, Value>) -> Vec<(String, String)> {
    query
        .iter()
        .filter_map(|(key, value)| {
            let encoded = match value {
                Value::Null => return None,
                Value::String(text) => text.clone(),
                Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
                    value.to_string()
                }
            };
            Some((key.clone(), encoded))
        })
        .collect()
}
