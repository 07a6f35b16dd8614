//! Execution registry: the caller-facing surface for submitted runs.
//!
//! Holds one record per execution, keyed by id. Records outlive their run task so
//! results can be polled and composed; they are released only by `discard`.

use crate::error::ApiError;
use crate::pipeline::executor::{PipelineEngine, SharedGraph};
use crate::pipeline::graph::{ExecutionContext, ExecutionGraph};
use crate::pipeline::snapshot::{ExecutionSnapshot, RunStatus};
use crate::pipeline::template::GraphTemplate;
use crate::types::{new_execution_id, ExecutionId};
use crate::video::{Scene, VideoComposer};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

struct ExecutionRecord {
    graph: SharedGraph,
    settled: AtomicBool,
    notify: Notify,
}

/// Marks the record settled and wakes waiters when dropped, so a run task that
/// unwinds still releases `wait`.
struct SettleOnDrop(Arc<ExecutionRecord>);

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        self.0.settled.store(true, Ordering::Release);
        self.0.notify.notify_waiters();
    }
}

impl ExecutionRecord {
    fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    async fn settled_wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_settled() {
                return;
            }
            notified.await;
        }
    }

    fn status(&self) -> RunStatus {
        if self.is_settled() {
            RunStatus::Completed
        } else {
            RunStatus::Running
        }
    }
}

pub struct ExecutionRegistry {
    engine: Arc<PipelineEngine>,
    composer: Arc<VideoComposer>,
    executions: RwLock<HashMap<ExecutionId, Arc<ExecutionRecord>>>,
}

impl ExecutionRegistry {
    pub fn new(engine: Arc<PipelineEngine>, composer: Arc<VideoComposer>) -> Self {
        Self {
            engine,
            composer,
            executions: RwLock::new(HashMap::new()),
        }
    }

    /// Validate `template`, then start a run in the background.
    ///
    /// Must be called from within a Tokio runtime. Invalid templates are rejected
    /// before any provider is called.
    pub fn submit(
        &self,
        initial_input: impl Into<String>,
        template: &GraphTemplate,
    ) -> Result<ExecutionId, ApiError> {
        let compiled = template.compile()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ApiError::ConfigError(format!("No async runtime available: {}", e)))?;

        let execution_id = new_execution_id();
        let graph = ExecutionGraph::instantiate(
            ExecutionContext {
                execution_id: execution_id.clone(),
                initial_input: initial_input.into(),
            },
            compiled,
        );
        let record = Arc::new(ExecutionRecord {
            graph: Arc::new(Mutex::new(graph)),
            settled: AtomicBool::new(false),
            notify: Notify::new(),
        });
        self.executions
            .write()
            .insert(execution_id.clone(), Arc::clone(&record));

        info!(execution_id = %execution_id, "Execution submitted");

        let engine = Arc::clone(&self.engine);
        runtime.spawn(async move {
            let settle = SettleOnDrop(record);
            engine.run(Arc::clone(&settle.0.graph)).await;
        });

        Ok(execution_id)
    }

    fn record(&self, execution_id: &str) -> Result<Arc<ExecutionRecord>, ApiError> {
        self.executions
            .read()
            .get(execution_id)
            .cloned()
            .ok_or_else(|| ApiError::ExecutionNotFound(execution_id.to_string()))
    }

    /// Current per-node state. Read-only; safe to call at any rate.
    pub fn poll(&self, execution_id: &str) -> Result<ExecutionSnapshot, ApiError> {
        let record = self.record(execution_id)?;
        let status = record.status();
        let graph = record.graph.lock();
        Ok(ExecutionSnapshot::capture(&graph, status))
    }

    /// Suspend until the run settles, then return its final snapshot.
    pub async fn wait(&self, execution_id: &str) -> Result<ExecutionSnapshot, ApiError> {
        let record = self.record(execution_id)?;
        record.settled_wait().await;
        self.poll(execution_id)
    }

    /// Assemble the final video from an ordered scene list.
    ///
    /// Only settled executions can be composed; the generation graph is never touched.
    pub async fn compose(
        &self,
        execution_id: &str,
        scenes: &[Scene],
    ) -> Result<PathBuf, ApiError> {
        let record = self.record(execution_id)?;
        if !record.is_settled() {
            return Err(ApiError::ExecutionRunning(execution_id.to_string()));
        }
        Ok(self.composer.compose(execution_id, scenes).await?)
    }

    /// Release a settled execution record.
    pub fn discard(&self, execution_id: &str) -> Result<(), ApiError> {
        let mut executions = self.executions.write();
        let record = executions
            .get(execution_id)
            .ok_or_else(|| ApiError::ExecutionNotFound(execution_id.to_string()))?;
        if !record.is_settled() {
            return Err(ApiError::ExecutionRunning(execution_id.to_string()));
        }
        executions.remove(execution_id);
        info!(execution_id = %execution_id, "Execution discarded");
        Ok(())
    }

    pub fn execution_ids(&self) -> Vec<ExecutionId> {
        self.executions.read().keys().cloned().collect()
    }
}
