//! Read-only views of an execution for polling.

use crate::pipeline::graph::ExecutionGraph;
use crate::pipeline::node::{ArtifactInfo, Node, StageKind};
use crate::types::{ExecutionId, NodeId, NodeStatus};
use serde::{Deserialize, Serialize};

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    /// The run task has settled; nodes below a failed node stay pending
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSnapshot {
    pub execution_id: ExecutionId,
    pub status: RunStatus,
    /// Nodes in creation order
    pub nodes: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub kind: StageKind,
    pub model: String,
    pub status: NodeStatus,
    pub parent_id: Option<NodeId>,
    pub parent_array_index: usize,
    pub prompt_template: String,
    pub system_message: Option<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub output_array: Vec<String>,
    pub error: Option<String>,
    pub artifact: Option<ArtifactInfo>,
    pub children: Vec<NodeId>,
}

impl From<&Node> for NodeSnapshot {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind(),
            model: node.model.clone(),
            status: node.status(),
            parent_id: node.parent.clone(),
            parent_array_index: node.parent_index,
            prompt_template: node.prompt_template.clone(),
            system_message: node.stage.system_directive().map(str::to_string),
            input: node.input().map(str::to_string),
            output: node.raw_output().map(str::to_string),
            output_array: node.output().to_vec(),
            error: node.error().map(str::to_string),
            artifact: node.artifact().cloned(),
            children: node.children().to_vec(),
        }
    }
}

impl ExecutionSnapshot {
    pub fn capture(graph: &ExecutionGraph, status: RunStatus) -> Self {
        Self {
            execution_id: graph.execution_id().to_string(),
            status,
            nodes: graph.nodes().map(NodeSnapshot::from).collect(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn node(&self, id: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn count(&self, status: NodeStatus) -> usize {
        self.nodes.iter().filter(|n| n.status == status).count()
    }
}
