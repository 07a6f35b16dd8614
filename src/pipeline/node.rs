//! Pipeline node: one typed generation stage and its per-run state.

use crate::error::ApiError;
use crate::pipeline::parse::{split_output, wrap_artifact};
use crate::types::{NodeId, NodeStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Closed set of stage kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Text,
    Image,
    Speech,
}

impl StageKind {
    /// Accepts the canonical names plus the provider-flavoured aliases used by older templates.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "gpt" => Some(StageKind::Text),
            "image" | "dalle" => Some(StageKind::Image),
            "speech" | "tts" => Some(StageKind::Speech),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Text => "text",
            StageKind::Image => "image",
            StageKind::Speech => "speech",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific generation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Stage {
    Text {
        system_directive: Option<String>,
        /// `None` keeps the whole response as a single element
        separator: Option<String>,
    },
    Image {
        size: String,
        quality: String,
        style: Option<String>,
    },
    Speech {
        voice: String,
        speed: f32,
        format: String,
    },
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Text { .. } => StageKind::Text,
            Stage::Image { .. } => StageKind::Image,
            Stage::Speech { .. } => StageKind::Speech,
        }
    }

    /// Turn a raw stage result into the parsed output array.
    ///
    /// Only text stages split; image and speech results are always a single artifact reference.
    pub fn parse_output(&self, raw: &str) -> Vec<String> {
        match self {
            Stage::Text { separator, .. } => split_output(raw, separator.as_deref()),
            Stage::Image { .. } | Stage::Speech { .. } => wrap_artifact(raw),
        }
    }

    pub fn system_directive(&self) -> Option<&str> {
        match self {
            Stage::Text {
                system_directive, ..
            } => system_directive.as_deref(),
            _ => None,
        }
    }
}

/// Artifact details recorded on image and speech nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ArtifactInfo {
    Image {
        remote_url: String,
        /// Absent when the download failed; the remote URL is used instead
        local_path: Option<PathBuf>,
        revised_prompt: Option<String>,
    },
    Speech {
        local_path: PathBuf,
        /// Estimated narration length; absent when the text has no words
        estimated_secs: Option<u32>,
    },
}

/// Identity-free description of a stage, shared by template nodes and expansion prototypes
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBlueprint {
    pub name: String,
    pub model: String,
    pub stage: Stage,
    pub prompt_template: String,
}

/// One stage in an execution graph
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub model: String,
    pub stage: Stage,
    pub prompt_template: String,
    pub parent: Option<NodeId>,
    pub parent_index: usize,
    status: NodeStatus,
    input: Option<String>,
    raw_output: Option<String>,
    output: Vec<String>,
    error: Option<String>,
    artifact: Option<ArtifactInfo>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(
        id: impl Into<NodeId>,
        blueprint: NodeBlueprint,
        parent: Option<NodeId>,
        parent_index: usize,
    ) -> Self {
        Self {
            id: id.into(),
            name: blueprint.name,
            model: blueprint.model,
            stage: blueprint.stage,
            prompt_template: blueprint.prompt_template,
            parent,
            parent_index,
            status: NodeStatus::Pending,
            input: None,
            raw_output: None,
            output: Vec::new(),
            error: None,
            artifact: None,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> StageKind {
        self.stage.kind()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    pub fn raw_output(&self) -> Option<&str> {
        self.raw_output.as_deref()
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn artifact(&self) -> Option<&ArtifactInfo> {
        self.artifact.as_ref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn push_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    fn transition(&mut self, next: NodeStatus) -> Result<(), ApiError> {
        if !self.status.can_transition_to(next) {
            return Err(ApiError::InvalidTransition {
                node: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// pending -> running; the resolved input is set exactly once.
    pub fn start(&mut self, input: String) -> Result<(), ApiError> {
        self.transition(NodeStatus::Running)?;
        self.input = Some(input);
        Ok(())
    }

    /// running -> completed
    pub fn complete(
        &mut self,
        raw: String,
        output: Vec<String>,
        artifact: Option<ArtifactInfo>,
    ) -> Result<(), ApiError> {
        self.transition(NodeStatus::Completed)?;
        self.raw_output = Some(raw);
        self.output = output;
        self.artifact = artifact;
        Ok(())
    }

    /// running -> failed
    pub fn fail(&mut self, message: String) -> Result<(), ApiError> {
        self.transition(NodeStatus::Failed)?;
        self.error = Some(message);
        Ok(())
    }
}
