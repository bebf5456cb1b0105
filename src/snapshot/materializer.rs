use std::io;
use std::path::{Component, Path, PathBuf};

use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tracing::{debug, info, trace, warn};

use crate::codec::Contents;
use crate::ext::BestEffortPathExt;
use crate::filesystem::Filesystem;
use crate::snapshot::{Entry, EntryKind, Snapshot};

/// What to do with a destination path whose entry is marked deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletionPolicy {
    /// Remove the file or folder at the path, if any.
    #[default]
    Remove,
    /// Leave the destination untouched.
    Skip,
}

/// Rebuilds a directory tree from a snapshot.
///
/// Only paths named by the snapshot are touched. Files without a content index
/// are assumed to already hold their content from an earlier transfer.
pub struct SnapshotMaterializer<'a, F> {
    filesystem: &'a F,
    deletion_policy: DeletionPolicy,
}

impl<'a, F: Filesystem> SnapshotMaterializer<'a, F> {
    pub fn new(filesystem: &'a F) -> Self {
        Self {
            filesystem,
            deletion_policy: DeletionPolicy::default(),
        }
    }

    pub fn with_deletion_policy(mut self, deletion_policy: DeletionPolicy) -> Self {
        self.deletion_policy = deletion_policy;
        self
    }

    pub async fn materialize(
        &self,
        destination: &Path,
        snapshot: &Snapshot,
    ) -> Result<(), MaterializeError> {
        self.materialize_entry(destination, snapshot.root(), snapshot.contents())
            .await?;
        info!("Materialized snapshot into {}", destination.best_effort_path_display());
        Ok(())
    }

    pub async fn materialize_entry(
        &self,
        destination: &Path,
        entry: &Entry,
        contents: &[Contents],
    ) -> Result<(), MaterializeError> {
        if entry.is_deleted {
            return self.replay_deletion(destination).await;
        }

        match &entry.kind {
            EntryKind::Folder { children } => {
                if !self.clear_other_kind(destination, true).await? {
                    return Ok(());
                }
                self.filesystem
                    .create_directory_recursive(destination)
                    .await
                    .context(CreateDirectorySnafu { path: destination })?;
                for (name, child) in children {
                    ensure!(is_plain_name(name), InvalidNameSnafu { name });
                    let child_destination = destination.join(name);
                    Box::pin(self.materialize_entry(&child_destination, child, contents)).await?;
                }
            }
            EntryKind::File {
                content_index: Some(index),
            } => {
                let data = contents.get(*index).context(IndexOutOfRangeSnafu {
                    path: destination,
                    index: *index,
                    len: contents.len(),
                })?;
                if !self.clear_other_kind(destination, false).await? {
                    return Ok(());
                }
                self.filesystem
                    .write_file(destination, data.to_vec())
                    .await
                    .context(WriteSnafu { path: destination })?;
                trace!("Wrote {} bytes to {}", data.len(), destination.display());
            }
            EntryKind::File {
                content_index: None,
            } => {
                let stat = self
                    .filesystem
                    .stat(destination)
                    .await
                    .context(StatSnafu { path: destination })?;
                if stat.is_none() {
                    warn!(
                        "{} is listed as unchanged but does not exist at the destination",
                        destination.best_effort_path_display()
                    );
                } else {
                    trace!("{} is unchanged, leaving it in place", destination.display());
                }
            }
        }

        Ok(())
    }

    /// Makes room for an entry whose kind differs from what is on disk, as when
    /// a folder was replaced by a file since the last transfer. Returns `false`
    /// when the deletion policy keeps the existing node and the entry must be
    /// skipped.
    async fn clear_other_kind(
        &self,
        destination: &Path,
        want_directory: bool,
    ) -> Result<bool, MaterializeError> {
        let stat = self
            .filesystem
            .stat(destination)
            .await
            .context(StatSnafu { path: destination })?;
        let Some(stat) = stat.filter(|stat| stat.is_directory != want_directory) else {
            return Ok(true);
        };

        match self.deletion_policy {
            DeletionPolicy::Remove => {
                debug!("Replacing {} with a node of the other kind", destination.display());
                self.filesystem
                    .remove(destination)
                    .await
                    .context(RemoveSnafu { path: destination })?;
                Ok(true)
            }
            DeletionPolicy::Skip => {
                warn!(
                    "Keeping existing {} at {}, the snapshot has a {} there",
                    if stat.is_directory { "folder" } else { "file" },
                    destination.best_effort_path_display(),
                    if want_directory { "folder" } else { "file" },
                );
                Ok(false)
            }
        }
    }

    async fn replay_deletion(&self, destination: &Path) -> Result<(), MaterializeError> {
        match self.deletion_policy {
            DeletionPolicy::Remove => {
                debug!("Removing deleted {}", destination.display());
                self.filesystem
                    .remove(destination)
                    .await
                    .context(RemoveSnafu { path: destination })
            }
            DeletionPolicy::Skip => {
                debug!("Leaving deleted {} in place", destination.display());
                Ok(())
            }
        }
    }
}

/// A child name must stay inside its parent folder.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(std::path::is_separator)
}

#[derive(Debug, Snafu)]
pub enum MaterializeError {
    #[snafu(display("Failed to inspect {}", path.best_effort_path_display()))]
    StatError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to create directory {}", path.best_effort_path_display()))]
    CreateDirectoryError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to write file {}", path.best_effort_path_display()))]
    WriteError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to remove {}", path.best_effort_path_display()))]
    RemoveError { path: PathBuf, source: io::Error },
    #[snafu(display(
        "Content index {} for {} is out of range, the snapshot holds {} payloads",
        index,
        path.best_effort_path_display(),
        len
    ))]
    IndexOutOfRange {
        path: PathBuf,
        index: usize,
        len: usize,
    },
    #[snafu(display("Entry name {:?} does not name a single path component", name))]
    InvalidName { name: String },
}
