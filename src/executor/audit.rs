//! Audit sink interface and bundled sinks
//!
//! Durable audit storage belongs to an external collaborator; this module
//! defines the interface the pipeline emits through, plus a JSONL file sink
//! for standalone use and an in-memory sink for tests.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::plan::{ExecutionMode, ExecutionStatus};

/// One pipeline invocation, as recorded for audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub executor: String,
    pub target: String,
    pub status: ExecutionStatus,
    pub mode: ExecutionMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diff_ids: Vec<String>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Where diffs and audit entries go.
///
/// Implementations return stable references usable for later lookup.
pub trait AuditSink: Send + Sync {
    /// Persist one diff text; returns its stable identifier
    fn store_diff(&self, plan_id: &str, sequence: usize, diff: &str) -> std::io::Result<String>;

    /// Persist one audit entry; returns its stored reference
    fn record(&self, entry: &AuditEntry) -> std::io::Result<String>;
}

/// File-backed sink: diffs under `<dir>/diffs/`, entries appended to
/// `<dir>/audit.jsonl`.
pub struct JsonlAuditSink {
    dir: PathBuf,
}

impl JsonlAuditSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl AuditSink for JsonlAuditSink {
    fn store_diff(&self, plan_id: &str, sequence: usize, diff: &str) -> std::io::Result<String> {
        let diff_id = format!("{}-{:03}", plan_id, sequence);
        let diffs_dir = self.dir.join("diffs");
        std::fs::create_dir_all(&diffs_dir)?;
        std::fs::write(diffs_dir.join(format!("{}.diff", diff_id)), diff)?;
        Ok(diff_id)
    }

    fn record(&self, entry: &AuditEntry) -> std::io::Result<String> {
        std::fs::create_dir_all(&self.dir)?;
        let line = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join("audit.jsonl"))?;
        writeln!(file, "{}", line)?;

        Ok(format!(
            "{}@{}",
            entry.executor,
            entry.timestamp.timestamp_millis()
        ))
    }
}

/// In-memory sink for tests
#[derive(Default)]
pub struct MemoryAuditSink {
    diffs: Mutex<Vec<(String, String)>>,
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diffs(&self) -> Vec<(String, String)> {
        self.diffs.lock().unwrap().clone()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn store_diff(&self, plan_id: &str, sequence: usize, diff: &str) -> std::io::Result<String> {
        let diff_id = format!("{}-{:03}", plan_id, sequence);
        self.diffs
            .lock()
            .unwrap()
            .push((diff_id.clone(), diff.to_string()));
        Ok(diff_id)
    }

    fn record(&self, entry: &AuditEntry) -> std::io::Result<String> {
        let reference = format!("mem-{}", self.entries.lock().unwrap().len());
        self.entries.lock().unwrap().push(entry.clone());
        Ok(reference)
    }
}
