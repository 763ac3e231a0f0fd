//! High-level API client: verbs, retrying reads, pagination and action logging.
//!
//! # Design
//! - The client never reshapes payloads or errors; it returns exactly what
//!   the transport produced.
//! - Every call leaves one entry in the action log.

use std::sync::Arc;

use nbops_telemetry::{ActionRecord, ActionSink, log_action};
use serde_json::{Value, json};
use tracing::debug;

use crate::dry_run::is_dry_run_payload;
use crate::error::RemoteResult;
use crate::retry::RetryPolicy;
use crate::transport::{ApiRequest, Method, Transport};

/// Page size used by [`ApiClient::list_all`].
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Client bound to one transport, one action sink and one script name.
pub struct ApiClient<T> {
    transport: T,
    actions: Arc<dyn ActionSink>,
    script: String,
    retry: RetryPolicy,
}

impl<T: Transport> ApiClient<T> {
    /// Client logging to `actions` under the `script` label.
    pub fn new(transport: T, actions: Arc<dyn ActionSink>, script: impl Into<String>) -> Self {
        Self {
            transport,
            actions,
            script: script.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy used by [`Self::get_with_retry`] and [`Self::list_all`].
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Action sink shared with the operations layer.
    pub fn actions(&self) -> &dyn ActionSink {
        self.actions.as_ref()
    }

    /// Script label recorded on each action.
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Record a named event in the action log and echo it to the console.
    pub fn log_action(&self, action: &str, details: Value) {
        log_action(self.actions.as_ref(), &self.script, action, details);
    }

    /// Send an arbitrary request and log the outcome.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn request(&self, request: ApiRequest) -> RemoteResult<Value> {
        debug!(method = %request.method, path = %request.path, "api call");
        let outcome = self.transport.send(&request).await;

        let logged = request
            .body
            .clone()
            .or_else(|| (!request.query.is_empty()).then(|| Value::Object(request.query.clone())));
        let record = ActionRecord::new(&self.script, request.method.as_str())
            .with_request(request.method.as_str(), &request.path)
            .with_data(logged.as_ref());
        let record = match &outcome {
            Ok(payload) if is_dry_run_payload(payload) => record.with_result("dry-run"),
            Ok(_) => record.with_result("success"),
            Err(err) => record.with_error(err.to_string()),
        };
        self.actions.record(&record);

        outcome
    }

    /// `GET path` with optional query parameters.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn get(&self, path: &str, params: Option<&Value>) -> RemoteResult<Value> {
        self.request(ApiRequest::get(path).with_params(params)).await
    }

    /// `GET` retried under the client's [`RetryPolicy`].
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted or a final error occurs.
    pub async fn get_with_retry(&self, path: &str, params: Option<&Value>) -> RemoteResult<Value> {
        self.retry.run(move || self.get(path, params)).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn post(&self, path: &str, body: Value) -> RemoteResult<Value> {
        self.request(ApiRequest::post(path, body)).await
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn put(&self, path: &str, body: Value) -> RemoteResult<Value> {
        self.request(ApiRequest::new(Method::Put, path).with_body(body))
            .await
    }

    /// `PATCH path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn patch(&self, path: &str, body: Value) -> RemoteResult<Value> {
        self.request(ApiRequest::new(Method::Patch, path).with_body(body))
            .await
    }

    /// `DELETE path` with optional query parameters.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn delete(&self, path: &str, params: Option<&Value>) -> RemoteResult<Value> {
        self.request(ApiRequest::new(Method::Delete, path).with_params(params))
            .await
    }

    /// Fetch every page of a list endpoint.
    ///
    /// Pages start at 1 and the walk stops at the first page holding fewer
    /// than `page_size` items, so `N` items cost `N / page_size + 1` calls.
    ///
    /// # Errors
    ///
    /// Returns the first page error that survives the retry policy.
    pub async fn list_all(
        &self,
        path: &str,
        params: Option<&Value>,
        page_size: Option<usize>,
    ) -> RemoteResult<Vec<Value>> {
        let page_size = page_size.filter(|size| *size > 0).unwrap_or(DEFAULT_PAGE_SIZE);
        let mut items = Vec::new();
        let mut page: usize = 1;
        loop {
            let mut query = match params {
                Some(Value::Object(map)) => map.clone(),
                _ => serde_json::Map::new(),
            };
            query.insert("page".to_string(), json!(page));
            query.insert("pageSize".to_string(), json!(page_size));
            let query = Value::Object(query);

            let response = self.get_with_retry(path, Some(&query)).await?;
            let batch = match response.get("data") {
                Some(Value::Array(values)) => values.clone(),
                _ => Vec::new(),
            };
            let fetched = batch.len();
            items.extend(batch);
            if fetched < page_size {
                break;
            }
            page += 1;
        }
        debug!(path, pages = page, items = items.len(), "listed all pages");
        Ok(items)
    }
}
