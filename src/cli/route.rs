//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::artifact::FsArtifactStore;
use crate::config::{ConfigLoader, ShortgenConfig};
use crate::error::ApiError;
use crate::pipeline::{ExecutionRegistry, GraphTemplate, PipelineEngine};
use crate::provider::Providers;
use crate::video::{collect_scenes, FfmpegEncoder, Scene, VideoComposer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_composed, format_snapshot_json, format_snapshot_text, format_template_summary,
};

const STATIC_EXAMPLE: &str = include_str!("../../templates/ideas.json");
const DYNAMIC_EXAMPLE: &str = include_str!("../../templates/shorts.json");

/// Runtime context for CLI execution: workspace, merged config and the async runtime.
pub struct RunContext {
    workspace_root: PathBuf,
    config: ShortgenConfig,
    runtime: tokio::runtime::Runtime,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        config.ensure_valid()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to start async runtime: {}", e)))?;

        Ok(Self {
            workspace_root,
            config,
            runtime,
        })
    }

    pub fn config(&self) -> &ShortgenConfig {
        &self.config
    }

    /// Resolve a configured path against the workspace unless it is absolute.
    fn in_workspace(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    /// Artifact root
    pub fn output_dir(&self) -> PathBuf {
        self.in_workspace(&self.config.storage.output_dir)
    }

    fn composer(&self) -> VideoComposer {
        VideoComposer::new(
            Arc::new(FfmpegEncoder::new(self.config.media.clone())),
            self.in_workspace(&self.config.storage.videos_dir()),
        )
    }

    fn registry(&self) -> Result<ExecutionRegistry, ApiError> {
        let providers = Providers::openai(&self.config.provider)?;
        let store = FsArtifactStore::new(self.output_dir())?;
        let engine = Arc::new(PipelineEngine::new(providers, Arc::new(store)));
        Ok(ExecutionRegistry::new(engine, Arc::new(self.composer())))
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Run {
                template,
                input,
                text,
                compose,
                format,
            } => {
                let initial_input = match (input, text) {
                    (Some(path), _) => std::fs::read_to_string(path)?,
                    (None, Some(text)) => text.clone(),
                    (None, None) => {
                        return Err(ApiError::ConfigError(
                            "Provide --input FILE or --text STRING".to_string(),
                        ))
                    }
                };
                self.handle_run(template, initial_input, *compose, format)
            }
            Commands::Validate { template } => {
                let compiled = GraphTemplate::load(template)?.compile()?;
                Ok(format_template_summary(&compiled))
            }
            Commands::Example { dynamic } => {
                let source = if *dynamic { DYNAMIC_EXAMPLE } else { STATIC_EXAMPLE };
                GraphTemplate::from_json(source)?.to_json_pretty()
            }
            Commands::Compose {
                execution_id,
                scenes,
            } => {
                let scenes: Vec<Scene> =
                    serde_json::from_str(&std::fs::read_to_string(scenes)?)?;
                let composer = self.composer();
                let path = self
                    .runtime
                    .block_on(composer.compose(execution_id, &scenes))?;
                Ok(format_composed(&path, scenes.len()))
            }
        }
    }

    fn handle_run(
        &self,
        template_path: &Path,
        initial_input: String,
        compose: bool,
        format: &str,
    ) -> Result<String, ApiError> {
        let template = GraphTemplate::load(template_path)?;
        let registry = self.registry()?;

        self.runtime.block_on(async {
            let execution_id = registry.submit(initial_input, &template)?;
            let snapshot = registry.wait(&execution_id).await?;
            info!(execution_id = %execution_id, "Run finished");

            let mut out = match format {
                "json" => format_snapshot_json(&snapshot)?,
                _ => format_snapshot_text(&snapshot),
            };

            if compose {
                let scenes = collect_scenes(&snapshot, &self.config.media);
                let path = registry.compose(&execution_id, &scenes).await?;
                out.push_str("\n\n");
                out.push_str(&format_composed(&path, scenes.len()));
            }

            registry.discard(&execution_id)?;
            Ok::<String, ApiError>(out)
        })
    }
}
