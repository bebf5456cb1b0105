use std::io::{self, ErrorKind};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use compio::fs;
use tracing::{debug, warn};

use crate::ext::BestEffortPathExt;
use crate::filesystem::{FileStat, Filesystem};

/// The host's own disk, through compio.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    async fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        match path.metadata() {
            Ok(metadata) => Ok(Some(FileStat {
                is_directory: metadata.is_dir(),
                modified_at: recordable_time(metadata.modified().ok(), path),
            })),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn list_directory(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in path.read_dir()? {
            let name = entry?.file_name();
            match name.into_string() {
                Ok(name) => names.push(name),
                Err(name) => warn!(
                    "Skipping non UTF-8 entry {:?} in {}",
                    name,
                    path.best_effort_path_display()
                ),
            }
        }
        names.sort_unstable();
        Ok(names)
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path).await
    }

    async fn write_file(&self, path: &Path, data: Vec<u8>) -> io::Result<()> {
        fs::write(path, data).await.0
    }

    async fn create_directory_recursive(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        let metadata = match path.symlink_metadata() {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("Nothing to remove at {}", path.display());
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        if metadata.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            fs::remove_file(path).await
        }
    }
}

/// Times before the epoch cannot be recorded and count as unknown, so the
/// file is always captured.
fn recordable_time(modified_at: Option<SystemTime>, path: &Path) -> Option<SystemTime> {
    modified_at.filter(|time| {
        let recordable = *time >= UNIX_EPOCH;
        if !recordable {
            debug!("Ignoring pre-epoch modification time of {}", path.display());
        }
        recordable
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[compio::test]
    async fn stat_reports_missing_path_as_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let stat = LocalFilesystem
            .stat(&temp_dir.path().join("missing"))
            .await
            .expect("Stat of a missing path should not fail");

        assert_eq!(stat, None);
    }

    #[compio::test]
    async fn stat_distinguishes_files_and_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, "content").expect("Failed to write file");

        let dir_stat = LocalFilesystem.stat(temp_dir.path()).await.unwrap().unwrap();
        let file_stat = LocalFilesystem.stat(&file).await.unwrap().unwrap();

        assert!(dir_stat.is_directory);
        assert!(!file_stat.is_directory);
        assert!(file_stat.modified_at.is_some());
    }

    #[compio::test]
    async fn list_directory_returns_sorted_names() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        for name in ["b.txt", "a.txt", "c"] {
            std::fs::write(temp_dir.path().join(name), "").expect("Failed to write file");
        }

        let names = LocalFilesystem.list_directory(temp_dir.path()).await.unwrap();

        assert_eq!(names, vec!["a.txt", "b.txt", "c"]);
    }

    #[compio::test]
    async fn write_then_read_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("data.bin");

        LocalFilesystem
            .write_file(&file, b"payload".to_vec())
            .await
            .expect("Failed to write file");
        let data = LocalFilesystem.read_file(&file).await.expect("Failed to read file");

        assert_eq!(data, b"payload");
    }

    #[compio::test]
    async fn remove_handles_files_directories_and_missing_paths() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("dir/inner");
        std::fs::create_dir_all(&nested).expect("Failed to create directories");
        std::fs::write(nested.join("file.txt"), "x").expect("Failed to write file");
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, "x").expect("Failed to write file");

        LocalFilesystem.remove(&temp_dir.path().join("dir")).await.unwrap();
        LocalFilesystem.remove(&file).await.unwrap();
        LocalFilesystem.remove(&temp_dir.path().join("missing")).await.unwrap();

        assert!(!temp_dir.path().join("dir").exists());
        assert!(!file.exists());
    }

    #[test]
    fn pre_epoch_times_are_unknown() {
        let path = Path::new("old.txt");
        let before = UNIX_EPOCH - std::time::Duration::from_secs(86_400);
        let after = UNIX_EPOCH + std::time::Duration::from_secs(86_400);

        assert_eq!(recordable_time(Some(before), path), None);
        assert_eq!(recordable_time(Some(UNIX_EPOCH), path), Some(UNIX_EPOCH));
        assert_eq!(recordable_time(Some(after), path), Some(after));
        assert_eq!(recordable_time(None, path), None);
    }

    #[compio::test]
    async fn file_from_before_the_epoch_is_stat_without_a_time() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("old.txt");
        std::fs::write(&file, "vintage").expect("Failed to write file");
        let before = UNIX_EPOCH - std::time::Duration::from_secs(86_400);
        let applied = std::fs::File::options()
            .write(true)
            .open(&file)
            .and_then(|handle| handle.set_modified(before));
        if applied.is_err() || std::fs::metadata(&file).unwrap().modified().unwrap() >= UNIX_EPOCH {
            // The filesystem cannot hold pre-epoch times.
            return;
        }

        let stat = LocalFilesystem.stat(&file).await.unwrap().unwrap();

        assert_eq!(stat.modified_at, None);
    }
}
