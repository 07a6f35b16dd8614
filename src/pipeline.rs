//! Pipeline domain: nodes, templates, prompt resolution, dynamic expansion,
//! the execution engine and the registry of runs.

pub mod executor;
pub mod expansion;
pub mod graph;
pub mod node;
pub mod parse;
pub mod prompt;
pub mod registry;
pub mod snapshot;
pub mod template;

pub use executor::{PipelineEngine, SharedGraph};
pub use expansion::{scene_node_id, ExpansionPlan, SceneRole};
pub use graph::{ExecutionContext, ExecutionGraph};
pub use node::{ArtifactInfo, Node, NodeBlueprint, Stage, StageKind};
pub use registry::ExecutionRegistry;
pub use snapshot::{ExecutionSnapshot, NodeSnapshot, RunStatus};
pub use template::{GraphTemplate, NodeTemplate};
