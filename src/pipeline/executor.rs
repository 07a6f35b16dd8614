//! Pipeline engine: drives an execution graph to a settled state.
//!
//! Execution is recursive fan-out. Each node runs in its own task; once it
//! completes, all of its children start together in a `JoinSet` owned by that
//! node's task, so a node's task settles only after its whole subtree has. A
//! failed node schedules nothing and reports nothing upward: siblings keep
//! running and the branch simply stops.

use crate::artifact::{ArtifactKind, ArtifactStore};
use crate::error::ApiError;
use crate::pipeline::graph::{ExecutionGraph, StageCall};
use crate::pipeline::node::{ArtifactInfo, Stage};
use crate::provider::{ImageRequest, Providers, SpeechRequest, TextRequest};
use crate::types::{NodeId, NodeStatus};
use crate::video::scene::estimate_speech_secs;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Graph shared by every task of one run. Locks are held only between awaits.
pub type SharedGraph = Arc<Mutex<ExecutionGraph>>;

const IMAGE_EXTENSION: &str = "png";

struct StageResult {
    raw: String,
    artifact: Option<ArtifactInfo>,
}

pub struct PipelineEngine {
    providers: Providers,
    store: Arc<dyn ArtifactStore>,
}

impl PipelineEngine {
    pub fn new(providers: Providers, store: Arc<dyn ArtifactStore>) -> Self {
        Self { providers, store }
    }

    /// Run every root concurrently and return once every reachable node has settled.
    pub async fn run(self: Arc<Self>, graph: SharedGraph) {
        let (execution_id, roots) = {
            let graph = graph.lock();
            (graph.execution_id().to_string(), graph.roots().to_vec())
        };
        info!(
            execution_id = %execution_id,
            root_count = roots.len(),
            "Execution started"
        );

        Arc::clone(&self)
            .run_branches(Arc::clone(&graph), roots)
            .await;

        let graph = graph.lock();
        let count = |status: NodeStatus| graph.nodes().filter(|n| n.status() == status).count();
        info!(
            execution_id = %execution_id,
            total = graph.len(),
            completed = count(NodeStatus::Completed),
            failed = count(NodeStatus::Failed),
            pending = count(NodeStatus::Pending),
            "Execution settled"
        );
    }

    /// Spawn one task per node and wait for all of them, whatever their outcome.
    async fn run_branches(self: Arc<Self>, graph: SharedGraph, node_ids: Vec<NodeId>) {
        let mut branches = JoinSet::new();
        for node_id in node_ids {
            branches.spawn(Arc::clone(&self).execute_node(Arc::clone(&graph), node_id));
        }

        while let Some(joined) = branches.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Branch task aborted");
            }
        }
    }

    fn execute_node(self: Arc<Self>, graph: SharedGraph, node_id: NodeId) -> BoxFuture<'static, ()> {
        async move {
            let children = self.step(&graph, &node_id).await;
            if !children.is_empty() {
                self.run_branches(graph, children).await;
            }
        }
        .boxed()
    }

    /// Run one node through pending -> running -> completed | failed.
    /// Returns the children to start, empty unless the node completed.
    async fn step(&self, graph: &SharedGraph, node_id: &str) -> Vec<NodeId> {
        let (execution_id, call) = {
            let mut graph = graph.lock();
            let execution_id = graph.execution_id().to_string();
            match graph.begin(node_id) {
                Ok(call) => (execution_id, call),
                Err(e) => {
                    error!(
                        execution_id = %execution_id,
                        node_id = %node_id,
                        error = %e,
                        "Node could not start"
                    );
                    return Vec::new();
                }
            }
        };
        debug!(
            execution_id = %execution_id,
            node_id = %node_id,
            kind = %call.stage.kind(),
            prompt = %call.prompt,
            "Node running"
        );

        match self.invoke(&execution_id, &call).await {
            Ok(result) => {
                let completed = graph.lock().complete(node_id, result.raw, result.artifact);
                match completed {
                    Ok(children) => {
                        info!(
                            execution_id = %execution_id,
                            node_id = %node_id,
                            status = %NodeStatus::Completed,
                            children = children.len(),
                            "Node completed"
                        );
                        children
                    }
                    Err(e) => {
                        error!(execution_id = %execution_id, node_id = %node_id, error = %e, "Failed to record node result");
                        Vec::new()
                    }
                }
            }
            Err(e) => {
                error!(
                    execution_id = %execution_id,
                    node_id = %node_id,
                    status = %NodeStatus::Failed,
                    error = %e,
                    "Node failed"
                );
                let recorded = graph.lock().fail(node_id, e.to_string());
                if let Err(e) = recorded {
                    error!(execution_id = %execution_id, node_id = %node_id, error = %e, "Failed to record node failure");
                }
                Vec::new()
            }
        }
    }

    async fn invoke(&self, execution_id: &str, call: &StageCall) -> Result<StageResult, ApiError> {
        match &call.stage {
            Stage::Text {
                system_directive, ..
            } => {
                let request = TextRequest {
                    model: call.model.clone(),
                    system_directive: system_directive.clone(),
                    prompt: call.prompt.clone(),
                };
                let raw = self.providers.text.generate_text(&request).await?;
                Ok(StageResult {
                    raw,
                    artifact: None,
                })
            }
            Stage::Image {
                size,
                quality,
                style,
            } => {
                let request = ImageRequest {
                    model: call.model.clone(),
                    prompt: call.prompt.clone(),
                    size: size.clone(),
                    quality: quality.clone(),
                    style: style.clone(),
                };
                let image = self.providers.image.generate_image(&request).await?;

                let local_path = match self
                    .store
                    .fetch(
                        execution_id,
                        &call.node_id,
                        ArtifactKind::Image,
                        &image.url,
                        IMAGE_EXTENSION,
                    )
                    .await
                {
                    Ok(path) => Some(path),
                    Err(e) => {
                        warn!(
                            execution_id = %execution_id,
                            node_id = %call.node_id,
                            error = %e,
                            "Image download failed, keeping remote URL"
                        );
                        None
                    }
                };
                let raw = local_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| image.url.clone());

                Ok(StageResult {
                    raw,
                    artifact: Some(ArtifactInfo::Image {
                        remote_url: image.url,
                        local_path,
                        revised_prompt: image.revised_prompt,
                    }),
                })
            }
            Stage::Speech {
                voice,
                speed,
                format,
            } => {
                let request = SpeechRequest {
                    model: call.model.clone(),
                    text: call.prompt.clone(),
                    voice: voice.clone(),
                    speed: *speed,
                    format: format.clone(),
                };
                let audio = self.providers.speech.synthesize(&request).await?;

                // Audio has no remote copy, so a failed write fails the node.
                let path = self
                    .store
                    .persist(
                        execution_id,
                        &call.node_id,
                        ArtifactKind::Audio,
                        format,
                        &audio,
                    )
                    .await?;

                Ok(StageResult {
                    raw: path.display().to_string(),
                    artifact: Some(ArtifactInfo::Speech {
                        local_path: path,
                        estimated_secs: estimate_speech_secs(&call.prompt),
                    }),
                })
            }
        }
    }
}
