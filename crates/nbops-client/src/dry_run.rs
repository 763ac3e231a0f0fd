//! Transport decorator that forwards reads and suppresses writes.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use nbops_telemetry::sanitize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::RemoteResult;
use crate::transport::{ApiRequest, Transport};

/// Wraps a transport so that only `GET` requests reach the server.
///
/// Mutating requests are logged and answered with
/// `{"data": null, "dryRun": true}`.
#[derive(Debug)]
pub struct DryRunTransport<T> {
    inner: T,
    suppressed: AtomicUsize,
}

impl<T> DryRunTransport<T> {
    /// Decorate `inner`.
    pub const fn new(inner: T) -> Self {
        Self {
            inner,
            suppressed: AtomicUsize::new(0),
        }
    }

    /// Number of writes that were not sent.
    pub fn suppressed(&self) -> usize {
        self.suppressed.load(Ordering::Relaxed)
    }

    /// The wrapped transport.
    pub const fn inner(&self) -> &T {
        &self.inner
    }

    /// Payload returned in place of a suppressed write.
    #[must_use]
    pub fn placeholder() -> Value {
        json!({ "data": null, "dryRun": true })
    }
}

/// Whether `payload` came from a suppressed write.
#[must_use]
pub fn is_dry_run_payload(payload: &Value) -> bool {
    payload.get("dryRun").and_then(Value::as_bool) == Some(true)
}

#[async_trait]
impl<T: Transport> Transport for DryRunTransport<T> {
    async fn send(&self, request: &ApiRequest) -> RemoteResult<Value> {
        if !request.method.is_mutating() {
            return self.inner.send(request).await;
        }
        self.suppressed.fetch_add(1, Ordering::Relaxed);
        let body = request.body.as_ref().map(sanitize);
        info!(
            method = %request.method,
            path = %request.path,
            body = ?body,
            "[DRY RUN] {} {}",
            request.method,
            request.path
        );
        Ok(Self::placeholder())
    }
}
