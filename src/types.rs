//! Core identifiers and status types shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Node identifier, unique within one execution graph
pub type NodeId = String;

/// Execution identifier, unique within one registry
pub type ExecutionId = String;

static EXECUTION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh execution id: `exec_{unix_millis}_{9 hex chars}`.
///
/// The suffix is a blake3 digest of the timestamp, a process-wide counter and
/// the process id, so ids minted in the same millisecond still differ.
pub fn new_execution_id() -> ExecutionId {
    let millis = chrono::Utc::now().timestamp_millis();
    let counter = EXECUTION_COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut hasher = blake3::Hasher::new();
    hasher.update(&millis.to_le_bytes());
    hasher.update(&counter.to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());
    let digest = hex::encode(hasher.finalize().as_bytes());

    format!("exec_{}_{}", millis, &digest[..9])
}

/// Node lifecycle status: pending -> running -> completed | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: NodeStatus) -> bool {
        matches!(
            (self, next),
            (NodeStatus::Pending, NodeStatus::Running)
                | (NodeStatus::Running, NodeStatus::Completed)
                | (NodeStatus::Running, NodeStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Completed => "completed",
            NodeStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
