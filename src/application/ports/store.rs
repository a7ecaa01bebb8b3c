//! Artifact persistence port

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::artifact::RecordingArtifact;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Failed to create recordings directory '{path}': {reason}")]
    CreateDir { path: String, reason: String },

    #[error("Failed to write recording '{path}': {reason}")]
    Write { path: String, reason: String },
}

/// Port for keeping finished artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist `artifact`, returning where it was written
    async fn save(&self, artifact: &RecordingArtifact, prefix: &str) -> Result<PathBuf, StoreError>;

    /// Directory artifacts are written to
    fn location(&self) -> PathBuf;
}
