//! Artifact store: persists generated binaries under execution-scoped names.

use crate::error::ArtifactError;
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use tracing::debug;

/// Which subdirectory an artifact belongs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Audio,
}

impl ArtifactKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            ArtifactKind::Image => "images",
            ArtifactKind::Audio => "audio",
        }
    }
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write `bytes` and return the local path.
    async fn persist(
        &self,
        execution_id: &str,
        node_id: &str,
        kind: ArtifactKind,
        extension: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, ArtifactError>;

    /// Download a remote artifact and persist it.
    async fn fetch(
        &self,
        execution_id: &str,
        node_id: &str,
        kind: ArtifactKind,
        url: &str,
        extension: &str,
    ) -> Result<PathBuf, ArtifactError>;
}

/// Filesystem store: `{root}/{images|audio}/{execution}_{node}_{millis}.{ext}`
pub struct FsArtifactStore {
    root: PathBuf,
    client: Client,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let client = crate::provider::build_provider_http_client()
            .map_err(|e| ArtifactError::Download(e.to_string()))?;
        Ok(Self {
            root: root.into(),
            client,
        })
    }

    fn artifact_path(
        &self,
        execution_id: &str,
        node_id: &str,
        kind: ArtifactKind,
        extension: &str,
    ) -> PathBuf {
        let millis = chrono::Utc::now().timestamp_millis();
        self.root.join(kind.dir_name()).join(format!(
            "{}_{}_{}.{}",
            execution_id, node_id, millis, extension
        ))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn persist(
        &self,
        execution_id: &str,
        node_id: &str,
        kind: ArtifactKind,
        extension: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.artifact_path(execution_id, node_id, kind, extension);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Artifact persisted");
        Ok(path)
    }

    async fn fetch(
        &self,
        execution_id: &str,
        node_id: &str,
        kind: ArtifactKind,
        url: &str,
        extension: &str,
    ) -> Result<PathBuf, ArtifactError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ArtifactError::Download(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ArtifactError::Download(e.to_string()))?;
        self.persist(execution_id, node_id, kind, extension, &bytes)
            .await
    }
}
