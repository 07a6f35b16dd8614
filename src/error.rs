//! Error types for the shortgen generation pipeline.

use crate::types::{ExecutionId, NodeId, NodeStatus};
use thiserror::Error;

/// Template validation errors, raised before any provider call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Node {node} is missing required field '{field}'")]
    MissingField { node: String, field: &'static str },

    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(NodeId),

    #[error("Node {node} references unknown parent {parent}")]
    UnknownParent { node: NodeId, parent: NodeId },

    #[error("Cyclic parent reference through node {0}")]
    CyclicParent(NodeId),

    #[error("Node {node} has unknown stage kind '{kind}'")]
    UnknownStageKind { node: String, kind: String },

    #[error("Template has no root node")]
    NoRoots,

    #[error("Dynamic expansion enabled but node template '{0}' is missing")]
    MissingExpansionTemplate(&'static str),

    #[error("Dynamic expansion enabled but no root is flagged for expansion")]
    NoExpansionRoot,

    #[error("Only one root may be expanded, found: {0:?}")]
    MultipleExpansionRoots(Vec<NodeId>),

    #[error("Node id {0} is reserved for dynamically generated scene nodes")]
    ReservedNodeId(NodeId),

    #[error("Node {node}: invalid {option}: {reason}")]
    InvalidOption {
        node: String,
        option: &'static str,
        reason: String,
    },
}

/// Generation provider errors
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Provider authentication failed: {0}")]
    AuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Provider model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    #[error("Provider returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Provider transport error: {0}")]
    Transport(String),
}

/// Artifact persistence errors
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact download failed: {0}")]
    Download(String),
}

/// Video assembly errors; never touch the generation graph
#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("No scenes to compose")]
    NoScenes,

    #[error("Clip synthesis failed for scene {scene}: {message}")]
    ClipFailed { scene: usize, message: String },

    #[error("Clip concatenation failed: {0}")]
    ConcatFailed(String),

    #[error("Media toolchain error: {0}")]
    Toolchain(String),

    #[error("Composition I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Caller-facing errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid template: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error("Execution not found: {0}")]
    ExecutionNotFound(ExecutionId),

    #[error("Execution {0} is still running")]
    ExecutionRunning(ExecutionId),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {node} cannot start before parent {parent} completes")]
    ParentNotReady { node: NodeId, parent: NodeId },

    #[error("Root {0} has already been expanded")]
    AlreadyExpanded(NodeId),

    #[error("Illegal status transition for node {node}: {from} -> {to}")]
    InvalidTransition {
        node: NodeId,
        from: NodeStatus,
        to: NodeStatus,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}
