//! Dynamic tree expansion: one planning/image/audio group per scene.

use crate::pipeline::node::{Node, NodeBlueprint};
use crate::types::NodeId;

/// Output slot of a planning node that holds the image prompt
pub const IMAGE_PROMPT_SLOT: usize = 1;

/// Role of a generated node within its scene group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneRole {
    Planning,
    Image,
    Audio,
}

impl SceneRole {
    pub const ALL: [SceneRole; 3] = [SceneRole::Planning, SceneRole::Image, SceneRole::Audio];

    pub fn suffix(self) -> &'static str {
        match self {
            SceneRole::Planning => "planning",
            SceneRole::Image => "image",
            SceneRole::Audio => "audio",
        }
    }
}

/// Deterministic id of a generated node; scenes are numbered from 1.
pub fn scene_node_id(scene: usize, role: SceneRole) -> NodeId {
    format!("scene{}_{}", scene, role.suffix())
}

/// Whether `id` has the shape of a generated scene node id.
pub fn is_reserved_scene_id(id: &str) -> bool {
    let Some(rest) = id.strip_prefix("scene") else {
        return false;
    };
    let Some((number, role)) = rest.split_once('_') else {
        return false;
    };
    !number.is_empty()
        && number.bytes().all(|b| b.is_ascii_digit())
        && SceneRole::ALL.iter().any(|r| r.suffix() == role)
}

/// Prototypes for the nodes synthesized under the expansion root
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionPlan {
    pub root: NodeId,
    pub planning: NodeBlueprint,
    pub image: NodeBlueprint,
    pub audio: NodeBlueprint,
}

impl ExpansionPlan {
    /// Build the scene groups for `scene_count` scenes, parents before children.
    ///
    /// Planning and audio hang off the root at the scene's index; image hangs off
    /// planning at the image prompt slot.
    pub fn scene_nodes(&self, scene_count: usize) -> Vec<Node> {
        let mut nodes = Vec::with_capacity(scene_count * 3);
        for index in 0..scene_count {
            let scene = index + 1;
            let planning_id = scene_node_id(scene, SceneRole::Planning);
            nodes.push(Node::new(
                planning_id.clone(),
                self.scene_blueprint(&self.planning, scene),
                Some(self.root.clone()),
                index,
            ));
            nodes.push(Node::new(
                scene_node_id(scene, SceneRole::Image),
                self.scene_blueprint(&self.image, scene),
                Some(planning_id),
                IMAGE_PROMPT_SLOT,
            ));
            nodes.push(Node::new(
                scene_node_id(scene, SceneRole::Audio),
                self.scene_blueprint(&self.audio, scene),
                Some(self.root.clone()),
                index,
            ));
        }
        nodes
    }

    fn scene_blueprint(&self, prototype: &NodeBlueprint, scene: usize) -> NodeBlueprint {
        NodeBlueprint {
            name: format!("Scene {} {}", scene, prototype.name),
            ..prototype.clone()
        }
    }
}
