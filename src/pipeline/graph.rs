//! Execution graph: the run-scoped node map for one execution.
//!
//! The graph owns every node of a run and the run's initial input. It only grows:
//! static nodes are inserted at instantiation, scene groups once when the expansion
//! root completes. All state transitions go through here so the engine never holds
//! a node across a provider call.

use crate::error::{ApiError, ValidationError};
use crate::pipeline::expansion::ExpansionPlan;
use crate::pipeline::node::{ArtifactInfo, Node, Stage};
use crate::pipeline::prompt::{resolve_prompt, PromptContext};
use crate::pipeline::template::CompiledTemplate;
use crate::types::{ExecutionId, NodeId, NodeStatus};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Run-scoped inputs shared by every node of one execution
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub execution_id: ExecutionId,
    pub initial_input: String,
}

/// Everything needed to invoke one node's provider, detached from the graph
#[derive(Debug, Clone)]
pub struct StageCall {
    pub node_id: NodeId,
    pub model: String,
    pub stage: Stage,
    pub prompt: String,
}

#[derive(Debug)]
pub struct ExecutionGraph {
    context: ExecutionContext,
    nodes: HashMap<NodeId, Node>,
    order: Vec<NodeId>,
    roots: Vec<NodeId>,
    expansion: Option<ExpansionPlan>,
    expanded: HashSet<NodeId>,
}

impl ExecutionGraph {
    /// Build the static graph from a compiled template.
    pub fn instantiate(context: ExecutionContext, template: CompiledTemplate) -> Self {
        let mut graph = Self {
            context,
            nodes: HashMap::with_capacity(template.nodes.len()),
            order: Vec::with_capacity(template.nodes.len()),
            roots: Vec::new(),
            expansion: template.expansion,
            expanded: HashSet::new(),
        };

        for node in template.nodes {
            if node.is_root() {
                graph.roots.push(node.id.clone());
            }
            graph.order.push(node.id.clone());
            graph.nodes.insert(node.id.clone(), node);
        }

        // Wire children in template order; parents were checked at compile time.
        for index in 0..graph.order.len() {
            let child = graph.order[index].clone();
            let parent = graph.nodes.get(&child).and_then(|n| n.parent.clone());
            if let Some(parent) = parent.and_then(|p| graph.nodes.get_mut(&p)) {
                parent.push_child(child);
            }
        }

        graph
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn execution_id(&self) -> &str {
        &self.context.execution_id
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_expanded(&self, root: &str) -> bool {
        self.expanded.contains(root)
    }

    /// Add a node under an existing parent (or as a new root).
    pub fn insert(&mut self, node: Node) -> Result<(), ApiError> {
        if self.nodes.contains_key(&node.id) {
            return Err(ValidationError::DuplicateNodeId(node.id.clone()).into());
        }
        match node.parent.as_deref() {
            Some(parent_id) => {
                let parent = self
                    .nodes
                    .get_mut(parent_id)
                    .ok_or_else(|| ApiError::NodeNotFound(parent_id.to_string()))?;
                parent.push_child(node.id.clone());
            }
            None => self.roots.push(node.id.clone()),
        }
        self.order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Resolve the node's prompt from its finalized parent and mark it running.
    pub fn begin(&mut self, id: &str) -> Result<StageCall, ApiError> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| ApiError::NodeNotFound(id.to_string()))?;

        let root_input = [self.context.initial_input.clone()];
        let parent_output: &[String] = match node.parent.as_deref() {
            None => &root_input,
            Some(parent_id) => {
                let parent = self
                    .nodes
                    .get(parent_id)
                    .ok_or_else(|| ApiError::NodeNotFound(parent_id.to_string()))?;
                if parent.status() != NodeStatus::Completed {
                    return Err(ApiError::ParentNotReady {
                        node: id.to_string(),
                        parent: parent_id.to_string(),
                    });
                }
                parent.output()
            }
        };

        let prompt = resolve_prompt(
            &node.prompt_template,
            &PromptContext {
                parent_output,
                parent_index: node.parent_index,
                root_input: Some(self.context.initial_input.as_str()),
            },
        );
        let call = StageCall {
            node_id: node.id.clone(),
            model: node.model.clone(),
            stage: node.stage.clone(),
            prompt: prompt.clone(),
        };

        if let Some(node) = self.nodes.get_mut(id) {
            node.start(prompt)?;
        }
        Ok(call)
    }

    /// Record a successful result and return the children to schedule next.
    ///
    /// Completing the expansion root synthesizes its scene groups first, so the
    /// returned list already includes them.
    pub fn complete(
        &mut self,
        id: &str,
        raw: String,
        artifact: Option<ArtifactInfo>,
    ) -> Result<Vec<NodeId>, ApiError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| ApiError::NodeNotFound(id.to_string()))?;
        let output = node.stage.parse_output(&raw);
        node.complete(raw, output, artifact)?;

        let expands_here = self
            .expansion
            .as_ref()
            .is_some_and(|plan| plan.root == id);
        if expands_here && !self.is_expanded(id) {
            self.expand(id)?;
        }

        Ok(self
            .nodes
            .get(id)
            .map(|n| n.children().to_vec())
            .unwrap_or_default())
    }

    /// Record a failure; the node's children will never run.
    pub fn fail(&mut self, id: &str, message: String) -> Result<(), ApiError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| ApiError::NodeNotFound(id.to_string()))?
            .fail(message)
    }

    /// Synthesize one planning/image/audio group per output element of `root_id`.
    ///
    /// Allowed once per root, and only after the root completed.
    pub fn expand(&mut self, root_id: &str) -> Result<usize, ApiError> {
        if self.expanded.contains(root_id) {
            return Err(ApiError::AlreadyExpanded(root_id.to_string()));
        }
        let root = self
            .nodes
            .get(root_id)
            .ok_or_else(|| ApiError::NodeNotFound(root_id.to_string()))?;
        if root.status() != NodeStatus::Completed {
            return Err(ApiError::ParentNotReady {
                node: root_id.to_string(),
                parent: root_id.to_string(),
            });
        }
        let scene_count = root.output().len();

        let scene_nodes = match &self.expansion {
            Some(plan) if plan.root == root_id => plan.scene_nodes(scene_count),
            _ => return Err(ValidationError::NoExpansionRoot.into()),
        };

        self.expanded.insert(root_id.to_string());
        for node in scene_nodes {
            self.insert(node)?;
        }

        info!(
            execution_id = %self.context.execution_id,
            node_id = %root_id,
            scene_count,
            "Expanded root into scene groups"
        );
        Ok(scene_count)
    }
}
