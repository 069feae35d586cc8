use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

/// An uploaded video staged on disk for the duration of one request.
///
/// Each staging gets its own randomly named directory under the scratch
/// root, and the file name carries a fresh UUID, so concurrent requests
/// never share a path. The directory and everything in it is removed when
/// the guard is dropped.
pub struct ScratchVideo {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchVideo {
    pub async fn stage(root: &Path, client_filename: Option<&str>, bytes: &[u8]) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("video-qa-")
            .tempdir_in(root)
            .map_err(|e| {
                Error::staging(format!(
                    "Failed to create scratch directory under {}: {}",
                    root.display(),
                    e
                ))
            })?;

        let file_name = format!(
            "{}_{}",
            Uuid::new_v4().simple(),
            sanitize_filename(client_filename)
        );
        let path = dir.path().join(file_name);

        // Build the guard first so a failed write still removes the directory.
        let scratch = Self {
            dir: Some(dir),
            path,
        };

        tokio::fs::write(&scratch.path, bytes).await.map_err(|e| {
            Error::staging(format!(
                "Failed to write {}: {}",
                scratch.path.display(),
                e
            ))
        })?;

        debug!("Staged {} bytes at {}", bytes.len(), scratch.path.display());
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchVideo {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let dir_path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!("Removed scratch directory {}", dir_path.display()),
                Err(e) => warn!(
                    "Failed to clean up scratch directory {}: {}",
                    dir_path.display(),
                    e
                ),
            }
        }
    }
}

/// Keeps only the final path component of a client-supplied name.
fn sanitize_filename(name: Option<&str>) -> String {
    name.and_then(|n| Path::new(n).file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .unwrap_or("upload")
        .to_string()
}
