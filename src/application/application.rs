use std::io;
use std::path::{Path, PathBuf};

use colored::{ColoredString, Colorize};
use compio::fs;
use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::RuntimeConfig;
use crate::cli::Command;
use crate::config::{Config, ConfigCreationError};
use crate::ext::BestEffortPathExt;
use crate::filesystem::LocalFilesystem;
use crate::snapshot::{
    ContainerError, DiffError, Entry, EntryKind, JsonMetadataCodec, MaterializeError, Snapshot,
    SnapshotDiffer, SnapshotMaterializer,
};
use crate::state::{SnapshotState, SnapshotStateError};

pub struct Application;

impl Application {
    pub async fn run(runtime_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let runtime_config: RuntimeConfig = runtime_config.into();
        let config = Config::read(&runtime_config.config_path)
            .await
            .context(ConfigSnafu)?;
        debug!("Loaded config: {:?}", config);

        match runtime_config.command {
            Command::Pack { root, output, full } => Self::pack(&config, &root, &output, full).await,
            Command::Unpack { input, destination } => {
                Self::unpack(&config, &input, &destination).await
            }
            Command::Inspect { input } => {
                let snapshot = Self::read_snapshot(&input).await?;
                for line in render_tree(&snapshot) {
                    println!("{line}");
                }
                Ok(())
            }
        }
    }

    async fn pack(
        config: &Config,
        root: &Path,
        output: &Path,
        full: bool,
    ) -> Result<(), ApplicationError> {
        let mut state = if full {
            info!("Capturing every file, ignoring recorded state");
            SnapshotState::default()
        } else {
            SnapshotState::read(&config.state_path).await
        };

        let snapshot = SnapshotDiffer::new(&LocalFilesystem)
            .with_excluded_names(config.exclude.iter().cloned())
            .diff(root, state.previous_for(root))
            .await
            .context(CaptureSnafu)?;

        let bytes = snapshot.to_bytes(&JsonMetadataCodec).context(EncodeSnafu)?;
        let size = bytes.len();
        fs::write(output, bytes)
            .await
            .0
            .context(WriteSnapshotSnafu { path: output })?;
        info!(
            "Wrote {} bytes to {}",
            size,
            output.best_effort_path_display()
        );

        let (root_entry, _) = snapshot.into_parts();
        state.record(root, root_entry);
        state.write(&config.state_path).await.context(StateSnafu)?;
        Ok(())
    }

    async fn unpack(
        config: &Config,
        input: &Path,
        destination: &Path,
    ) -> Result<(), ApplicationError> {
        let snapshot = Self::read_snapshot(input).await?;

        SnapshotMaterializer::new(&LocalFilesystem)
            .with_deletion_policy(config.deletions)
            .materialize(destination, &snapshot)
            .await
            .context(RestoreSnafu)
    }

    async fn read_snapshot(input: &Path) -> Result<Snapshot, ApplicationError> {
        let bytes = fs::read(input)
            .await
            .context(ReadSnapshotSnafu { path: input })?;
        Snapshot::from_bytes(&JsonMetadataCodec, &bytes).context(DecodeSnafu { path: input })
    }
}

/// One line per entry, depth-first, followed by a summary line.
fn render_tree(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = Vec::new();
    render_entry(".", snapshot.root(), snapshot, 0, &mut lines);

    let summary = snapshot.root().summarize();
    lines.push(format!(
        "{} folders, {} captured, {} unchanged, {} deleted",
        summary.folders, summary.captured_files, summary.unchanged_files, summary.deleted
    ));
    lines
}

fn render_entry(
    name: &str,
    entry: &Entry,
    snapshot: &Snapshot,
    depth: usize,
    lines: &mut Vec<String>,
) {
    let indent = "  ".repeat(depth);
    let (marker, label, detail): (ColoredString, ColoredString, String) = match &entry.kind {
        _ if entry.is_deleted => ("-".red(), name.red(), String::new()),
        EntryKind::Folder { .. } => (" ".normal(), format!("{name}/").blue().bold(), String::new()),
        EntryKind::File {
            content_index: Some(index),
        } => {
            let size = snapshot
                .contents()
                .get(*index)
                .map(|payload| format!(" ({} bytes)", payload.len()))
                .unwrap_or_else(|| " (missing payload)".to_string());
            ("+".green(), name.green(), size)
        }
        EntryKind::File {
            content_index: None,
        } => ("=".dimmed(), name.normal(), String::new()),
    };
    lines.push(format!("{indent}{marker} {label}{detail}"));

    if entry.is_deleted {
        return;
    }
    for (child_name, child) in entry.children().into_iter().flatten() {
        render_entry(child_name, child, snapshot, depth + 1, lines);
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigError { source: ConfigCreationError },
    #[snafu(display("Failed to capture the directory tree"))]
    CaptureError { source: DiffError },
    #[snafu(display("Failed to encode the snapshot"))]
    EncodeError { source: ContainerError },
    #[snafu(display("Failed to write the snapshot to {}", path.best_effort_path_display()))]
    WriteSnapshotError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to read the snapshot from {}", path.best_effort_path_display()))]
    ReadSnapshotError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to decode the snapshot in {}", path.best_effort_path_display()))]
    DecodeError { path: PathBuf, source: ContainerError },
    #[snafu(display("Failed to record the packed state"))]
    StateError { source: SnapshotStateError },
    #[snafu(display("Failed to rebuild the directory tree"))]
    RestoreError { source: MaterializeError },
}
