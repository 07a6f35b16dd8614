//! Shared test doubles for integration tests
//!
//! Scripted providers stand in for the remote APIs; artifacts are written to a
//! temporary directory through the real filesystem store.

use async_trait::async_trait;
use shortgen::artifact::{ArtifactKind, ArtifactStore, FsArtifactStore};
use shortgen::error::{ArtifactError, CompositionError, ProviderError};
use shortgen::pipeline::{ExecutionRegistry, PipelineEngine};
use shortgen::provider::{
    GeneratedImage, ImageGenerator, ImageRequest, Providers, SpeechRequest, SpeechSynthesizer,
    TextGenerator, TextRequest,
};
use shortgen::video::{MediaEncoder, Scene, VideoComposer};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::{Barrier, Semaphore};

/// Marker that makes the scripted planner fail
pub const PLANNING_FAILURE: &str = "CAPTION_FAIL";

/// Text provider answering the bundled templates' prompts.
///
/// - script prompts (root of the shorts template) return `script` joined by `---`
/// - idea prompts (root of the ideas template) return `ideas` joined by `---`
/// - scene planning prompts return `Caption: {narration}` and an image prompt
/// - prompts starting with `FAIL` are rejected
/// - anything else is echoed back as `expanded: {prompt}`
pub struct ScriptedText {
    pub script: Vec<String>,
    pub ideas: Vec<String>,
    pub calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    rendezvous: Option<(String, Arc<Barrier>)>,
}

impl ScriptedText {
    pub fn new(script: &[&str], ideas: &[&str]) -> Self {
        Self {
            script: script.iter().map(|s| s.to_string()).collect(),
            ideas: ideas.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
            gate: None,
            rendezvous: None,
        }
    }

    /// Every call waits until `gate` has a permit before answering.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Calls whose prompt contains `marker` block on `barrier` before answering,
    /// so they only return once every party is in flight at the same time.
    pub fn meeting_at(mut self, marker: &str, barrier: Arc<Barrier>) -> Self {
        self.rendezvous = Some((marker.to_string(), barrier));
        self
    }
}

fn narration_of(prompt: &str) -> &str {
    prompt.lines().nth(1).unwrap_or("").trim()
}

#[async_trait]
impl TextGenerator for ScriptedText {
    async fn generate_text(&self, request: &TextRequest) -> Result<String, ProviderError> {
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        let prompt = request.prompt.as_str();
        if let Some((marker, barrier)) = &self.rendezvous {
            if prompt.contains(marker.as_str()) {
                barrier.wait().await;
            }
        }
        if prompt.starts_with("FAIL") {
            return Err(ProviderError::RequestFailed("scripted failure".to_string()));
        }
        if prompt.contains("Shorts script") {
            return Ok(self.script.join("\n---\n"));
        }
        if prompt.contains("distinct ideas") {
            return Ok(self.ideas.join("\n---\n"));
        }
        if prompt.starts_with("Scene ") && prompt.contains("===IMAGE===") {
            if prompt.contains(PLANNING_FAILURE) {
                return Err(ProviderError::RequestFailed(
                    "planner rejected the scene".to_string(),
                ));
            }
            let narration = narration_of(prompt);
            return Ok(format!(
                "Caption: {}\n===IMAGE===\nIllustration of {}",
                narration, narration
            ));
        }
        Ok(format!("expanded: {}", prompt))
    }
}

/// Image provider returning a fixed host and the prompt length
pub struct CountingImage;

#[async_trait]
impl ImageGenerator for CountingImage {
    async fn generate_image(&self, request: &ImageRequest) -> Result<GeneratedImage, ProviderError> {
        Ok(GeneratedImage {
            url: format!("https://img.test/{}.png", request.prompt.len()),
            revised_prompt: None,
        })
    }
}

/// Speech provider returning the narration bytes
pub struct EchoSpeech;

#[async_trait]
impl SpeechSynthesizer for EchoSpeech {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, ProviderError> {
        Ok(request.text.as_bytes().to_vec())
    }
}

/// Filesystem store whose downloads are served locally: the fetched bytes are the URL.
pub struct OfflineStore {
    inner: FsArtifactStore,
}

impl OfflineStore {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: FsArtifactStore::new(root).unwrap(),
        }
    }
}

#[async_trait]
impl ArtifactStore for OfflineStore {
    async fn persist(
        &self,
        execution_id: &str,
        node_id: &str,
        kind: ArtifactKind,
        extension: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, ArtifactError> {
        self.inner
            .persist(execution_id, node_id, kind, extension, bytes)
            .await
    }

    async fn fetch(
        &self,
        execution_id: &str,
        node_id: &str,
        kind: ArtifactKind,
        url: &str,
        extension: &str,
    ) -> Result<PathBuf, ArtifactError> {
        self.inner
            .persist(execution_id, node_id, kind, extension, url.as_bytes())
            .await
    }
}

/// Encoder that writes placeholder files and records what it was asked to do.
#[derive(Default)]
pub struct RecordingEncoder {
    pub rendered: Mutex<Vec<(Scene, PathBuf)>>,
    pub concatenated: Mutex<Vec<PathBuf>>,
    /// 1-based scene number whose clip fails
    pub fail_scene: Option<usize>,
}

impl RecordingEncoder {
    pub fn failing_at(scene: usize) -> Self {
        Self {
            fail_scene: Some(scene),
            ..Self::default()
        }
    }
}

#[async_trait]
impl MediaEncoder for RecordingEncoder {
    async fn render_clip(&self, scene: &Scene, output: &Path) -> Result<(), CompositionError> {
        let number = self.rendered.lock().len() + 1;
        self.rendered
            .lock()
            .push((scene.clone(), output.to_path_buf()));
        if self.fail_scene == Some(number) {
            return Err(CompositionError::Toolchain("encoder crashed".to_string()));
        }
        tokio::fs::write(output, b"clip").await?;
        Ok(())
    }

    async fn concat(&self, clips: &[PathBuf], output: &Path) -> Result<(), CompositionError> {
        for clip in clips {
            assert!(clip.exists(), "clip missing before concat: {}", clip.display());
        }
        *self.concatenated.lock() = clips.to_vec();
        tokio::fs::write(output, b"video").await?;
        Ok(())
    }
}

/// A registry wired to scripted providers, an offline store and a recording encoder.
pub struct Harness {
    pub temp: TempDir,
    pub text: Arc<ScriptedText>,
    pub encoder: Arc<RecordingEncoder>,
    pub registry: ExecutionRegistry,
}

impl Harness {
    pub fn new(text: ScriptedText) -> Self {
        Self::with_encoder(text, RecordingEncoder::default())
    }

    pub fn with_encoder(text: ScriptedText, encoder: RecordingEncoder) -> Self {
        let temp = TempDir::new().unwrap();
        let text = Arc::new(text);
        let encoder = Arc::new(encoder);

        let providers = Providers::new(
            Arc::clone(&text) as Arc<dyn TextGenerator>,
            Arc::new(CountingImage),
            Arc::new(EchoSpeech),
        );
        let store = OfflineStore::new(temp.path());
        let engine = Arc::new(PipelineEngine::new(providers, Arc::new(store)));
        let composer = VideoComposer::new(
            Arc::clone(&encoder) as Arc<dyn MediaEncoder>,
            temp.path().join("videos"),
        );
        let registry = ExecutionRegistry::new(engine, Arc::new(composer));

        Self {
            temp,
            text,
            encoder,
            registry,
        }
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.temp.path().join("videos")
    }
}

pub fn shorts_template() -> shortgen::pipeline::GraphTemplate {
    shortgen::pipeline::GraphTemplate::from_json(include_str!("../../templates/shorts.json"))
        .unwrap()
}

pub fn ideas_template() -> shortgen::pipeline::GraphTemplate {
    shortgen::pipeline::GraphTemplate::from_json(include_str!("../../templates/ideas.json"))
        .unwrap()
}
