//! On-disk artifact storage

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use tokio::fs;
use tracing::info;

use crate::application::ports::{ArtifactStore, StoreError};
use crate::domain::artifact::RecordingArtifact;
use crate::infrastructure::config::APP_DIR;

/// Writes each artifact to its own timestamped file in one directory
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$XDG_DATA_HOME/scribe-capture/recordings`
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("recordings")
    }

    fn file_name(prefix: &str, artifact: &RecordingArtifact) -> String {
        format!(
            "{}-{}.{}",
            prefix,
            Local::now().format("%Y%m%d-%H%M%S-%3f"),
            artifact.mime_type().extension()
        )
    }

    /// First free path for `name`, adding a counter on collision
    fn unique_path(dir: &Path, name: &str) -> PathBuf {
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }

        let (stem, ext) = name.rsplit_once('.').unwrap_or((name, ""));
        (1..)
            .map(|n| dir.join(format!("{}-{}.{}", stem, n, ext)))
            .find(|path| !path.exists())
            .unwrap_or(candidate)
    }
}

impl Default for FileArtifactStore {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn save(&self, artifact: &RecordingArtifact, prefix: &str) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::CreateDir {
                path: self.dir.display().to_string(),
                reason: e.to_string(),
            })?;

        let path = Self::unique_path(&self.dir, &Self::file_name(prefix, artifact));
        fs::write(&path, artifact.data())
            .await
            .map_err(|e| StoreError::Write {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        info!(path = %path.display(), size = %artifact.human_readable_size(), "Saved recording");
        Ok(path)
    }

    fn location(&self) -> PathBuf {
        self.dir.clone()
    }
}
