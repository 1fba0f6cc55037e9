//! Filesystem home of canonical artifact JSON.
//!
//! Append-only per identifier: the first write wins and later writes for
//! the same identifier are no-ops. Every path is checked against the
//! allow-listed root before any filesystem access.

use crate::error::{ApiError, ApiResult};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> ApiResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| ApiError::AnchorSubmitFailed(format!("artifact dir: {e}")))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, artifact_id: &Uuid) -> ApiResult<PathBuf> {
        let path = self.root.join(format!("{artifact_id}.json"));
        ensure_within_root(&self.root, &path)?;
        Ok(path)
    }

    /// Write the canonical bytes unless a file already exists for this
    /// identifier. Returns whether a new file was created.
    pub fn write_if_absent(&self, artifact_id: &Uuid, bytes: &[u8]) -> ApiResult<bool> {
        let path = self.path_for(artifact_id)?;
        if path.exists() {
            return Ok(false);
        }
        std::fs::write(&path, bytes)
            .map_err(|e| ApiError::AnchorSubmitFailed(format!("artifact write: {e}")))?;
        Ok(true)
    }

    pub fn read(&self, artifact_id: &Uuid) -> ApiResult<Option<Vec<u8>>> {
        let path = self.path_for(artifact_id)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ApiError::AnchorSubmitFailed(format!("artifact read: {e}"))),
        }
    }
}

/// Reject any candidate that lexically escapes the allow-listed root.
pub fn ensure_within_root(root: &Path, candidate: &Path) -> ApiResult<()> {
    if candidate
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ApiError::PathNotAllowed);
    }
    if !candidate.starts_with(root) {
        return Err(ApiError::PathNotAllowed);
    }
    Ok(())
}
