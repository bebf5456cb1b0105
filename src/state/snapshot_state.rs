use std::io;
use std::path::{Path, PathBuf};

use compio::fs;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use tracing::{debug, info, warn};

use crate::ext::BestEffortPathExt;
use crate::snapshot::Entry;

/// The metadata tree of the last successful pack, which the next pack of the
/// same root is diffed against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotState {
    /// Absolute form of the directory that was packed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<Entry>,
}

impl SnapshotState {
    /// Reads the recorded state. A missing or unreadable file means no
    /// previous state.
    pub async fn read(path: &Path) -> Self {
        debug!("Reading snapshot state from {}", path.best_effort_path_display());
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("No recorded snapshot state found, capturing everything");
                return Self::default();
            }
            Err(err) => {
                warn!(
                    "Failed to read snapshot state from {}: {}",
                    path.best_effort_path_display(),
                    err
                );
                return Self::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(err) => {
                warn!("Ignoring corrupt snapshot state: {}", err);
                Self::default()
            }
        }
    }

    /// The recorded tree, provided it was packed from `root_path`. State left
    /// by a pack of another directory is ignored.
    pub fn previous_for(&self, root_path: &Path) -> Option<&Entry> {
        let root = self.root.as_ref()?;
        let requested = root_path.best_effort_absolute_path();
        if self.root_path.as_deref() != Some(requested.as_path()) {
            warn!(
                "Recorded state belongs to {}, not {}; capturing everything",
                self.root_path
                    .as_deref()
                    .map_or_else(|| "an unknown root".to_string(), |recorded| {
                        recorded.display().to_string()
                    }),
                requested.display()
            );
            return None;
        }
        Some(root)
    }

    pub fn record(&mut self, root_path: &Path, root: Entry) {
        self.root_path = Some(root_path.best_effort_absolute_path());
        self.root = Some(root);
    }

    pub async fn write(&self, path: &Path) -> Result<(), SnapshotStateError> {
        if self.root.is_none() {
            debug!("No snapshot state to write");
            return Ok(());
        }

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.context(WriteSnafu { path })?;
        }
        let bytes = serde_json::to_vec(self).context(EncodeSnafu)?;
        fs::write(path, bytes).await.0.context(WriteSnafu { path })?;
        debug!("Wrote snapshot state to {}", path.best_effort_path_display());
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum SnapshotStateError {
    #[snafu(display("Failed to encode snapshot state"))]
    EncodeError { source: serde_json::Error },
    #[snafu(display("Failed to write snapshot state to {}", path.best_effort_path_display()))]
    WriteError { path: PathBuf, source: io::Error },
}
