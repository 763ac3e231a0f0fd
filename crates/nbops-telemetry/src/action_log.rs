//! Structured action log persisted as JSON lines.
//!
//! # Design
//! - Every remote call and notable event becomes an [`ActionRecord`].
//! - Sinks are infallible from the caller's perspective: a log write that
//!   fails is reported at `debug` and the operation carries on.
//! - Sensitive body keys are masked before a payload reaches any sink.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Top-level payload keys whose values are never written to the log.
pub const SENSITIVE_KEYS: &[&str] = &["password", "apiKey", "token"];
/// Replacement text for masked values.
pub const REDACTED: &str = "***";

/// One entry in the action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    /// When the action happened.
    pub timestamp: DateTime<Utc>,
    /// Command or script that produced the entry.
    pub script: String,
    /// Action name, e.g. `GET` or `WORKFLOW_CREATED`.
    pub action: String,
    /// Request path for remote calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// HTTP method for remote calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Sanitised request payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// `success`, `dry-run`, or another outcome label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Error message when the action failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Free-form extra fields, flattened into the entry.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ActionRecord {
    /// Start a record stamped with the current time.
    #[must_use]
    pub fn new(script: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            script: script.into(),
            action: action.into(),
            endpoint: None,
            method: None,
            data: None,
            result: None,
            error: None,
            details: Map::new(),
        }
    }

    /// Attach the HTTP method and path.
    #[must_use]
    pub fn with_request(mut self, method: &str, endpoint: &str) -> Self {
        self.method = Some(method.to_string());
        self.endpoint = Some(endpoint.to_string());
        self
    }

    /// Attach a payload; sensitive keys are masked.
    #[must_use]
    pub fn with_data(mut self, data: Option<&Value>) -> Self {
        self.data = data.filter(|value| !value.is_null()).map(sanitize);
        self
    }

    /// Mark the outcome.
    #[must_use]
    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    /// Record a failure message.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Merge extra fields. Objects are flattened, other values land under `details`.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        match sanitize(&details) {
            Value::Object(map) => self.details.extend(map),
            Value::Null => {}
            other => {
                self.details.insert("details".to_string(), other);
            }
        }
        self
    }
}

/// Destination for action records.
pub trait ActionSink: Send + Sync {
    /// Persist one record. Implementations must not panic or propagate errors.
    fn record(&self, record: &ActionRecord);
}

/// Record `action` with `details` and echo it to the console.
pub fn log_action(sink: &dyn ActionSink, script: &str, action: &str, details: Value) {
    info!("[LOG] {action} | {details}");
    sink.record(&ActionRecord::new(script, action).with_details(details));
}

/// Copy of `payload` with top-level sensitive keys replaced by [`REDACTED`].
#[must_use]
pub fn sanitize(payload: &Value) -> Value {
    match payload {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    if SENSITIVE_KEYS.contains(&key.as_str()) {
                        (key.clone(), Value::String(REDACTED.to_string()))
                    } else {
                        (key.clone(), value.clone())
                    }
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Appends records to `<dir>/nocobase-api-YYYYMMDD.log`.
///
/// The file name is derived from each record's timestamp, so a run that
/// crosses midnight continues in the next day's file.
#[derive(Debug)]
pub struct FileActionLog {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileActionLog {
    /// Create the sink, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns the IO error when the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    /// Directory holding the log files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that receives records stamped at `at`.
    #[must_use]
    pub fn path_for(&self, at: DateTime<Utc>) -> PathBuf {
        self.dir
            .join(format!("nocobase-api-{}.log", at.format("%Y%m%d")))
    }

    fn append(&self, record: &ActionRecord) -> io::Result<()> {
        let mut line = serde_json::to_string(record).map_err(io::Error::other)?;
        line.push('\n');
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(record.timestamp))?;
        file.write_all(line.as_bytes())
    }
}

impl ActionSink for FileActionLog {
    fn record(&self, record: &ActionRecord) {
        if let Err(err) = self.append(record) {
            debug!(error = %err, dir = %self.dir.display(), "failed to write action log entry");
        }
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryActionLog {
    records: Mutex<Vec<ActionRecord>>,
}

impl MemoryActionLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record so far.
    #[must_use]
    pub fn records(&self) -> Vec<ActionRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Action names in recording order.
    #[must_use]
    pub fn actions(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .map(|record| record.action)
            .collect()
    }
}

impl ActionSink for MemoryActionLog {
    fn record(&self, record: &ActionRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullActionLog;

impl ActionSink for NullActionLog {
    fn record(&self, _record: &ActionRecord) {}
}
