use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use snafu::{OptionExt, ResultExt, Snafu};
use tracing::{debug, info, trace};

use crate::codec::Contents;
use crate::ext::BestEffortPathExt;
use crate::filesystem::{FileStat, Filesystem};
use crate::snapshot::{Entry, Snapshot};

/// Captures a directory tree relative to a previous snapshot of it.
///
/// Files whose modification time did not move past the previously recorded
/// one are listed without content. Paths that disappeared since the previous
/// snapshot come back as tombstones.
pub struct SnapshotDiffer<'a, F> {
    filesystem: &'a F,
    excluded_names: HashSet<String>,
}

impl<'a, F: Filesystem> SnapshotDiffer<'a, F> {
    pub fn new(filesystem: &'a F) -> Self {
        Self {
            filesystem,
            excluded_names: HashSet::new(),
        }
    }

    /// Names that are skipped at every depth, as if they did not exist.
    pub fn with_excluded_names(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.excluded_names.extend(names);
        self
    }

    /// Diffs the tree at `root` against `previous`, the root entry of the
    /// last snapshot of the same tree, if any.
    pub async fn diff(&self, root: &Path, previous: Option<&Entry>) -> Result<Snapshot, DiffError> {
        let mut contents = Vec::new();
        let root_entry = self
            .diff_path(root.to_path_buf(), previous, &mut contents)
            .await?
            .context(RootNotFoundSnafu {
                path: root.to_path_buf(),
            })?;

        let summary = root_entry.summarize();
        info!(
            "Captured {} ({} captured, {} unchanged, {} deleted)",
            root.best_effort_path_display(),
            summary.captured_files,
            summary.unchanged_files,
            summary.deleted
        );
        Ok(Snapshot::new(root_entry, contents))
    }

    /// Returns `None` when the path is absent and there is nothing to report
    /// about it.
    async fn diff_path(
        &self,
        path: PathBuf,
        previous: Option<&Entry>,
        contents: &mut Vec<Contents>,
    ) -> Result<Option<Entry>, DiffError> {
        let previous = previous.filter(|entry| !entry.is_deleted);
        let stat = self
            .filesystem
            .stat(&path)
            .await
            .context(StatSnafu { path: path.clone() })?;

        let Some(stat) = stat else {
            if previous.is_some() {
                debug!("{} was deleted", path.display());
            }
            return Ok(previous.map(Entry::tombstone));
        };

        let mut entry = if stat.is_directory {
            self.diff_folder(&path, stat, previous, contents).await?
        } else {
            self.diff_file(&path, stat, previous, contents).await?
        };

        if let Some(previous) = previous {
            retain_later_timestamp(&mut entry, previous);
        }
        Ok(Some(entry))
    }

    async fn diff_file(
        &self,
        path: &Path,
        stat: FileStat,
        previous: Option<&Entry>,
        contents: &mut Vec<Contents>,
    ) -> Result<Entry, DiffError> {
        if is_unchanged(previous, stat.modified_at) {
            trace!("{} is unchanged", path.display());
            return Ok(Entry::file(stat.modified_at, None));
        }

        let data = self
            .filesystem
            .read_file(path)
            .await
            .context(ReadSnafu { path })?;
        contents.push(Contents::from(data));
        let index = contents.len() - 1;
        debug!("Captured {} as payload {}", path.display(), index);

        Ok(Entry::file(stat.modified_at, Some(index)))
    }

    async fn diff_folder(
        &self,
        path: &Path,
        stat: FileStat,
        previous: Option<&Entry>,
        contents: &mut Vec<Contents>,
    ) -> Result<Entry, DiffError> {
        let names = self
            .filesystem
            .list_directory(path)
            .await
            .context(ListSnafu { path })?;
        let previous_children = previous.and_then(Entry::children);

        let mut children = BTreeMap::new();
        for name in names {
            if self.excluded_names.contains(&name) {
                trace!("Skipping excluded {}", path.join(&name).display());
                continue;
            }
            let previous_child = previous_children.and_then(|previous| previous.get(&name));
            let child = Box::pin(self.diff_path(path.join(&name), previous_child, contents)).await?;
            if let Some(child) = child {
                children.insert(name, child);
            }
        }

        for (name, previous_child) in previous_children.into_iter().flatten() {
            if previous_child.is_deleted
                || children.contains_key(name)
                || self.excluded_names.contains(name)
            {
                continue;
            }
            debug!("{} was deleted", path.join(name).display());
            children.insert(name.clone(), previous_child.tombstone());
        }

        Ok(Entry::folder(stat.modified_at, children))
    }
}

/// A file is unchanged when it was a live file in the previous snapshot with a
/// recorded time and its current time is not strictly after that.
fn is_unchanged(previous: Option<&Entry>, modified_at: Option<SystemTime>) -> bool {
    let Some(previous) = previous else {
        return false;
    };
    if previous.is_folder() {
        return false;
    }
    match (previous.modified_at, modified_at) {
        (Some(recorded), Some(current)) => current <= recorded,
        _ => false,
    }
}

/// Recorded modification times never move backward between snapshots.
fn retain_later_timestamp(entry: &mut Entry, previous: &Entry) {
    if entry.modified_at < previous.modified_at {
        trace!("Keeping later recorded modification time");
        entry.modified_at = previous.modified_at;
    }
}

#[derive(Debug, Snafu)]
pub enum DiffError {
    #[snafu(display("Failed to stat {}", path.best_effort_path_display()))]
    StatError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to list directory {}", path.best_effort_path_display()))]
    ListError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to read file {}", path.best_effort_path_display()))]
    ReadError { path: PathBuf, source: io::Error },
    #[snafu(display(
        "Snapshot root {} does not exist and was never captured",
        path.best_effort_path_display()
    ))]
    RootNotFound { path: PathBuf },
}
