//! Scenes: per-index bundles of image, audio, caption and duration.

use crate::config::MediaConfig;
use crate::pipeline::expansion::{scene_node_id, SceneRole};
use crate::pipeline::node::ArtifactInfo;
use crate::pipeline::snapshot::{ExecutionSnapshot, NodeSnapshot};
use crate::types::NodeStatus;
use serde::{Deserialize, Serialize};

/// Narration pace used for duration estimates
pub const WORDS_PER_MINUTE: u64 = 150;

/// One clip's worth of inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Still image; a black frame is used when absent
    #[serde(default)]
    pub image_path: Option<String>,
    /// Narration; a silent track is used when absent
    #[serde(default)]
    pub audio_path: Option<String>,
    #[serde(default)]
    pub subtitle: String,
    /// Seconds
    pub duration: u32,
}

/// `ceil(words / 150 * 60)` seconds, or `None` for text with no words.
pub fn estimate_speech_secs(text: &str) -> Option<u32> {
    let words = text.split_whitespace().count() as u64;
    if words == 0 {
        return None;
    }
    let secs = (words * 60).div_ceil(WORDS_PER_MINUTE);
    Some(u32::try_from(secs).unwrap_or(u32::MAX))
}

/// Audio-backed scenes get at least `min_scene_secs`; scenes without an estimate get the default.
pub fn scene_duration(estimate: Option<u32>, media: &MediaConfig) -> u32 {
    match estimate {
        Some(secs) if secs > 0 => secs.max(media.min_scene_secs),
        _ => media.default_scene_secs,
    }
}

fn completed_output(node: &NodeSnapshot) -> Option<String> {
    if node.status != NodeStatus::Completed {
        return None;
    }
    node.output_array
        .first()
        .filter(|value| !value.is_empty())
        .cloned()
}

/// Zip `scene{n}_planning`, `_image` and `_audio` for n = 1.. until a group is incomplete.
///
/// Scenes whose nodes failed are still listed, with the missing parts left empty;
/// the caller decides whether they are usable.
pub fn collect_scenes(snapshot: &ExecutionSnapshot, media: &MediaConfig) -> Vec<Scene> {
    let mut scenes = Vec::new();

    for scene in 1.. {
        let (Some(planning), Some(image), Some(audio)) = (
            snapshot.node(&scene_node_id(scene, SceneRole::Planning)),
            snapshot.node(&scene_node_id(scene, SceneRole::Image)),
            snapshot.node(&scene_node_id(scene, SceneRole::Audio)),
        ) else {
            break;
        };

        let subtitle = completed_output(planning)
            .map(|caption| caption.trim().to_string())
            .unwrap_or_default();
        let estimate = match (&audio.status, &audio.artifact) {
            (NodeStatus::Completed, Some(ArtifactInfo::Speech { estimated_secs, .. })) => {
                *estimated_secs
            }
            _ => None,
        };

        scenes.push(Scene {
            image_path: completed_output(image),
            audio_path: completed_output(audio),
            subtitle,
            duration: scene_duration(estimate, media),
        });
    }

    scenes
}
