//! Graph templates: the serialized description of a pipeline and its validation.
//!
//! Field names follow the camelCase layout used by existing template files
//! (`nodeType`, `promptTemplate`, `parentId`, `parentArrayIndex`, ...).
//! `GraphTemplate::compile` validates a template and lowers it to typed nodes; no
//! provider is ever called for a template that fails here.

use crate::error::{ApiError, ValidationError};
use crate::pipeline::expansion::{is_reserved_scene_id, ExpansionPlan};
use crate::pipeline::node::{Node, NodeBlueprint, Stage, StageKind};
use crate::types::NodeId;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const DEFAULT_TEXT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
pub const DEFAULT_SPEECH_MODEL: &str = "tts-1";
pub const DEFAULT_PROMPT_TEMPLATE: &str = "{input}";
/// Separator used by text stages whose template omits `outputSeparator`
pub const DEFAULT_SEPARATOR: &str = "\n---\n";
/// Id of the root expanded when no root carries `expand: true`
pub const DEFAULT_EXPANSION_ROOT: &str = "root";

const SPEED_RANGE: std::ops::RangeInclusive<f32> = 0.25..=4.0;

/// A pipeline template as loaded from JSON or TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphTemplate {
    #[serde(default)]
    pub nodes: Vec<NodeTemplate>,

    /// Expand a root into scene groups once it completes
    #[serde(default)]
    pub dynamic_children: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_templates: Option<ExpansionTemplates>,
}

/// Prototypes for dynamically generated scene nodes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpansionTemplates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planning: Option<NodeTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<NodeTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<NodeTemplate>,
}

/// One node entry. Everything is optional at the serde level so that missing
/// fields surface as `ValidationError`s rather than parse errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_array_index: Option<usize>,
    /// Absent: default separator. Explicit `null` or `""`: no splitting.
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_separator: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Marks the root to expand when dynamic children are enabled
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub expand: bool,
}

/// Distinguishes an explicit `null` from an absent field.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl NodeTemplate {
    fn kind(&self, label: &str) -> Result<StageKind, ValidationError> {
        match self.node_type.as_deref() {
            None => Ok(StageKind::Text),
            Some(raw) => StageKind::parse(raw).ok_or_else(|| ValidationError::UnknownStageKind {
                node: label.to_string(),
                kind: raw.to_string(),
            }),
        }
    }

    /// Lower to a typed blueprint, applying per-kind defaults.
    pub fn blueprint(&self, label: &str) -> Result<NodeBlueprint, ValidationError> {
        let kind = self.kind(label)?;
        let model = match kind {
            StageKind::Text => non_empty(&self.model).unwrap_or(DEFAULT_TEXT_MODEL),
            StageKind::Image => non_empty(&self.model).unwrap_or(DEFAULT_IMAGE_MODEL),
            StageKind::Speech => non_empty(&self.tts_model)
                .or(non_empty(&self.model))
                .unwrap_or(DEFAULT_SPEECH_MODEL),
        }
        .to_string();

        let stage = match kind {
            StageKind::Text => Stage::Text {
                system_directive: non_empty(&self.system_message).map(str::to_string),
                separator: match &self.output_separator {
                    None => Some(DEFAULT_SEPARATOR.to_string()),
                    Some(None) => None,
                    Some(Some(sep)) if sep.is_empty() => None,
                    Some(Some(sep)) => Some(sep.clone()),
                },
            },
            StageKind::Image => Stage::Image {
                size: non_empty(&self.image_size)
                    .unwrap_or("1024x1792")
                    .to_string(),
                quality: non_empty(&self.image_quality)
                    .unwrap_or("standard")
                    .to_string(),
                style: Some(non_empty(&self.image_style).unwrap_or("vivid").to_string()),
            },
            StageKind::Speech => {
                let speed = self.speed.unwrap_or(1.0);
                if !SPEED_RANGE.contains(&speed) {
                    return Err(ValidationError::InvalidOption {
                        node: label.to_string(),
                        option: "speed",
                        reason: format!(
                            "{} is outside {}-{}",
                            speed,
                            SPEED_RANGE.start(),
                            SPEED_RANGE.end()
                        ),
                    });
                }
                Stage::Speech {
                    voice: non_empty(&self.voice).unwrap_or("alloy").to_string(),
                    speed,
                    format: non_empty(&self.format).unwrap_or("mp3").to_string(),
                }
            }
        };

        Ok(NodeBlueprint {
            name: non_empty(&self.name).unwrap_or(label).to_string(),
            model,
            stage,
            prompt_template: self
                .prompt_template
                .clone()
                .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string()),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// A validated template lowered to typed nodes
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    /// Static nodes in template order, children not yet wired
    pub nodes: Vec<Node>,
    pub expansion: Option<ExpansionPlan>,
}

impl CompiledTemplate {
    pub fn root_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_root())
            .map(|n| n.id.clone())
            .collect()
    }
}

impl GraphTemplate {
    pub fn from_json(text: &str) -> Result<Self, ApiError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_toml(text: &str) -> Result<Self, ApiError> {
        toml::from_str(text).map_err(|e| ApiError::Serialization(e.to_string()))
    }

    /// Load a template file; `.toml` files are TOML, everything else JSON.
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::from_toml(&text),
            _ => Self::from_json(&text),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, ApiError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate only.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.compile().map(|_| ())
    }

    /// Validate and lower to typed nodes.
    pub fn compile(&self) -> Result<CompiledTemplate, ValidationError> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut seen: HashSet<&str> = HashSet::new();

        for (position, entry) in self.nodes.iter().enumerate() {
            let id = non_empty(&entry.id).ok_or_else(|| ValidationError::MissingField {
                node: format!("#{}", position),
                field: "id",
            })?;
            if !seen.insert(id) {
                return Err(ValidationError::DuplicateNodeId(id.to_string()));
            }
            let blueprint = entry.blueprint(id)?;
            let parent = non_empty(&entry.parent_id).map(str::to_string);
            nodes.push(Node::new(
                id,
                blueprint,
                parent,
                entry.parent_array_index.unwrap_or(0),
            ));
        }

        if !nodes.iter().any(Node::is_root) {
            return Err(ValidationError::NoRoots);
        }
        check_parents(&nodes)?;

        let expansion = if self.dynamic_children {
            Some(self.expansion_plan(&nodes)?)
        } else {
            None
        };

        Ok(CompiledTemplate { nodes, expansion })
    }

    fn expansion_plan(&self, nodes: &[Node]) -> Result<ExpansionPlan, ValidationError> {
        if let Some(reserved) = nodes.iter().find(|n| is_reserved_scene_id(&n.id)) {
            return Err(ValidationError::ReservedNodeId(reserved.id.clone()));
        }

        let flagged: Vec<&NodeTemplate> = self.nodes.iter().filter(|n| n.expand).collect();
        if let Some(entry) = flagged.iter().find(|n| non_empty(&n.parent_id).is_some()) {
            return Err(ValidationError::InvalidOption {
                node: entry.id.clone().unwrap_or_default(),
                option: "expand",
                reason: "only root nodes can be expanded".to_string(),
            });
        }
        let root = match flagged.as_slice() {
            [] => nodes
                .iter()
                .find(|n| n.is_root() && n.id == DEFAULT_EXPANSION_ROOT)
                .map(|n| n.id.clone())
                .ok_or(ValidationError::NoExpansionRoot)?,
            [single] => non_empty(&single.id).unwrap_or_default().to_string(),
            many => {
                return Err(ValidationError::MultipleExpansionRoots(
                    many.iter().filter_map(|n| n.id.clone()).collect(),
                ))
            }
        };

        let templates = self.node_templates.clone().unwrap_or_default();
        let planning = templates
            .planning
            .ok_or(ValidationError::MissingExpansionTemplate("planning"))?;
        let image = templates
            .image
            .ok_or(ValidationError::MissingExpansionTemplate("image"))?;
        let audio = templates
            .audio
            .ok_or(ValidationError::MissingExpansionTemplate("audio"))?;

        Ok(ExpansionPlan {
            root,
            planning: planning.blueprint("planning")?,
            image: image.blueprint("image")?,
            audio: audio.blueprint("audio")?,
        })
    }
}

/// Every parent must exist and every parent chain must end at a root.
fn check_parents(nodes: &[Node]) -> Result<(), ValidationError> {
    let parents: HashMap<&str, Option<&str>> = nodes
        .iter()
        .map(|n| (n.id.as_str(), n.parent.as_deref()))
        .collect();

    for node in nodes {
        if let Some(parent) = node.parent.as_deref() {
            if !parents.contains_key(parent) {
                return Err(ValidationError::UnknownParent {
                    node: node.id.clone(),
                    parent: parent.to_string(),
                });
            }
        }
    }

    for node in nodes {
        let mut current = node.parent.as_deref();
        let mut steps = 0usize;
        while let Some(parent) = current {
            steps += 1;
            if steps > nodes.len() {
                return Err(ValidationError::CyclicParent(node.id.clone()));
            }
            current = parents.get(parent).copied().flatten();
        }
    }

    Ok(())
}
