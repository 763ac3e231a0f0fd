//! Scripted transport that records every request.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use nbops_client::{ApiRequest, Method, RemoteError, RemoteResult, Transport};
use serde_json::{Value, json};

/// Canned answer for a request.
pub type Reply = RemoteResult<Value>;

#[derive(Default)]
struct Script {
    replies: HashMap<(Method, String), VecDeque<Reply>>,
    calls: Vec<ApiRequest>,
    failing: Vec<(Method, String)>,
}

/// Transport double.
///
/// Replies are queued per `(method, path)`; the last queued reply repeats
/// once the queue is down to one entry. Requests without a script get a
/// default: `GET` returns `{"data": []}`, writes return
/// `{"data": {"id": n}}` with `n` counting up from 1.
#[derive(Default)]
pub struct RecordingTransport {
    script: Mutex<Script>,
    next_id: AtomicU64,
}

impl RecordingTransport {
    /// Transport with no scripted replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `reply` for `method path`.
    #[must_use]
    pub fn on(self, method: Method, path: &str, reply: Reply) -> Self {
        self.script()
            .replies
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Queue a successful payload.
    #[must_use]
    pub fn ok(self, method: Method, path: &str, payload: Value) -> Self {
        self.on(method, path, Ok(payload))
    }

    /// Fail every request to `method path` with a connection error from now on.
    pub fn go_offline(&self, method: Method, path: &str) {
        self.script().failing.push((method, path.to_string()));
    }

    /// Every request, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.script().calls.clone()
    }

    /// Requests whose verb changes remote state.
    #[must_use]
    pub fn mutating_calls(&self) -> Vec<ApiRequest> {
        self.calls()
            .into_iter()
            .filter(|call| call.method.is_mutating())
            .collect()
    }

    /// Requests sent to `method path`.
    #[must_use]
    pub fn calls_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method && call.path == path)
            .collect()
    }

    /// `"METHOD path"` for each request, handy for order assertions.
    #[must_use]
    pub fn call_log(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|call| format!("{} {}", call.method, call.path))
            .collect()
    }

    fn default_reply(&self, method: Method) -> Value {
        if method.is_mutating() {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            json!({ "data": { "id": id } })
        } else {
            json!({ "data": [] })
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: &ApiRequest) -> RemoteResult<Value> {
        let key = (request.method, request.path.clone());
        let scripted = {
            let mut script = self.script();
            script.calls.push(request.clone());
            if script.failing.contains(&key) {
                return Err(RemoteError::Connectivity {
                    message: format!("{} {} unreachable", request.method, request.path),
                });
            }
            script.replies.get_mut(&key).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
        };
        scripted.unwrap_or_else(|| Ok(self.default_reply(request.method)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_queue_and_repeats_last() -> anyhow::Result<()> {
        let transport = RecordingTransport::new()
            .ok(Method::Get, "roles:get", json!({ "data": 1 }))
            .ok(Method::Get, "roles:get", json!({ "data": 2 }));

        for expected in [1, 2, 2] {
            let reply = transport.send(&ApiRequest::get("roles:get")).await?;
            assert_eq!(reply["data"], expected);
        }
        assert_eq!(transport.calls().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn defaults_assign_ids_to_writes() -> anyhow::Result<()> {
        let transport = RecordingTransport::new();
        let first = transport
            .send(&ApiRequest::post("roles:create", json!({})))
            .await?;
        let second = transport
            .send(&ApiRequest::post("roles:create", json!({})))
            .await?;
        let read = transport.send(&ApiRequest::get("roles:list")).await?;
        assert_eq!(first["data"]["id"], 1);
        assert_eq!(second["data"]["id"], 2);
        assert_eq!(read, json!({ "data": [] }));
        assert_eq!(transport.mutating_calls().len(), 2);
        assert_eq!(
            transport.call_log(),
            vec!["POST roles:create", "POST roles:create", "GET roles:list"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn offline_paths_fail_with_connectivity() {
        let transport = RecordingTransport::new();
        transport.go_offline(Method::Post, "flow_nodes:create");
        let result = transport
            .send(&ApiRequest::post("flow_nodes:create", json!({})))
            .await;
        assert!(matches!(result, Err(RemoteError::Connectivity { .. })));
        assert_eq!(transport.calls_to(Method::Post, "flow_nodes:create").len(), 1);
    }
}
