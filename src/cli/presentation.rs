//! CLI presentation: text and json formatters for run, validate and compose results.

use crate::error::ApiError;
use crate::pipeline::template::CompiledTemplate;
use crate::pipeline::{ExecutionSnapshot, NodeSnapshot};
use crate::types::NodeStatus;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use std::path::Path;

const PREVIEW_CHARS: usize = 60;

/// Section heading with bold/underline.
fn heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn status_cell(status: NodeStatus) -> String {
    match status {
        NodeStatus::Completed => status.green().to_string(),
        NodeStatus::Failed => status.red().to_string(),
        NodeStatus::Running => status.yellow().to_string(),
        NodeStatus::Pending => status.dimmed().to_string(),
    }
}

/// First line of `text`, cut to a fixed width.
fn preview(text: &str) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    if line.chars().count() > PREVIEW_CHARS {
        let cut: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", cut)
    } else {
        line.to_string()
    }
}

fn result_cell(node: &NodeSnapshot) -> String {
    match node.status {
        NodeStatus::Failed => preview(node.error.as_deref().unwrap_or("")),
        NodeStatus::Completed if node.output_array.len() > 1 => format!(
            "[{} parts] {}",
            node.output_array.len(),
            preview(&node.output_array[0])
        ),
        NodeStatus::Completed => preview(node.output_array.first().map(String::as_str).unwrap_or("")),
        _ => String::new(),
    }
}

pub fn format_snapshot_text(snapshot: &ExecutionSnapshot) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Node", "Kind", "Status", "Result"]);
    for node in &snapshot.nodes {
        table.add_row(vec![
            node.id.clone(),
            node.kind.to_string(),
            status_cell(node.status),
            result_cell(node),
        ]);
    }

    format!(
        "{}\n  Execution: {}\n  Status: {:?}\n  Nodes: {} ({} completed, {} failed, {} pending)\n\n{}",
        heading("Execution"),
        snapshot.execution_id,
        snapshot.status,
        snapshot.nodes.len(),
        snapshot.count(NodeStatus::Completed),
        snapshot.count(NodeStatus::Failed),
        snapshot.count(NodeStatus::Pending),
        table
    )
}

pub fn format_snapshot_json(snapshot: &ExecutionSnapshot) -> Result<String, ApiError> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

pub fn format_template_summary(template: &CompiledTemplate) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Node", "Kind", "Model", "Parent", "Index"]);
    for node in &template.nodes {
        table.add_row(vec![
            node.id.clone(),
            node.kind().to_string(),
            node.model.clone(),
            node.parent.clone().unwrap_or_else(|| "-".to_string()),
            node.parent_index.to_string(),
        ]);
    }

    let mut out = format!(
        "Validation passed:\n  Nodes: {}\n  Roots: {}\n\n{}",
        template.nodes.len(),
        template.root_ids().join(", "),
        table
    );
    if let Some(plan) = &template.expansion {
        out.push_str(&format!(
            "\n\nDynamic expansion of '{}' per scene:\n  planning: {} ({})\n  image: {} ({})\n  audio: {} ({})",
            plan.root,
            plan.planning.stage.kind(),
            plan.planning.model,
            plan.image.stage.kind(),
            plan.image.model,
            plan.audio.stage.kind(),
            plan.audio.model,
        ));
    }
    out
}

pub fn format_composed(path: &Path, scene_count: usize) -> String {
    format!(
        "{}\n  Scenes: {}\n  Output: {}",
        heading("Video composed"),
        scene_count,
        path.display()
    )
}
