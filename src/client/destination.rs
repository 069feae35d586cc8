use super::transcode::TranscodeSettings;
use crate::Result;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, warn};

/// Where the transcoded artifact is written.
///
/// A `Temporary` destination is deleted when dropped, on every path out
/// of a run. A `Persistent` one is left on disk.
pub enum Destination {
    Persistent(PathBuf),
    Temporary(Option<TempPath>),
}

impl Destination {
    /// `<output_dir>/<stem>_proc_<w>x<h>_<fps>fps.mp4`; creates the directory.
    pub fn persistent(
        output_dir: &Path,
        input: &Path,
        settings: &TranscodeSettings,
    ) -> Result<Self> {
        std::fs::create_dir_all(output_dir)?;
        Ok(Self::Persistent(
            output_dir.join(processed_file_name(input, settings)),
        ))
    }

    pub fn temporary() -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("video-qa-")
            .suffix(".mp4")
            .tempfile()?;
        Ok(Self::Temporary(Some(file.into_temp_path())))
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Persistent(path) => path,
            Self::Temporary(Some(path)) => path,
            // Only reachable mid-drop.
            Self::Temporary(None) => Path::new(""),
        }
    }

}

impl Drop for Destination {
    fn drop(&mut self) {
        if let Self::Temporary(slot) = self {
            if let Some(path) = slot.take() {
                let shown = path.display().to_string();
                match path.close() {
                    Ok(()) => debug!("Temporary file cleaned up: {}", shown),
                    Err(e) => warn!("Failed to remove temporary file {}: {}", shown, e),
                }
            }
        }
    }
}

/// Deterministic name for a processed copy of `input`.
pub fn processed_file_name(input: &Path, settings: &TranscodeSettings) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    format!(
        "{}_proc_{}x{}_{}fps.mp4",
        stem, settings.width, settings.height, settings.fps
    )
}
