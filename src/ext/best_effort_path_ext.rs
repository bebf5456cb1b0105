use std::path::{Component, Path, PathBuf};

/// Absolute form of `path`: canonical when it exists, otherwise joined onto
/// the current directory with `.` and `..` folded away.
pub fn best_effort_absolute_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = match std::env::current_dir() {
        Ok(current_dir) if path.is_relative() => current_dir.join(path),
        _ => path.to_path_buf(),
    };
    lexically_normalize(&absolute)
}

fn lexically_normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            other => components.push(other),
        }
    }

    components.iter().collect()
}

pub trait BestEffortPathExt {
    fn best_effort_absolute_path(&self) -> PathBuf;

    fn best_effort_path_display(&self) -> String {
        self.best_effort_absolute_path().display().to_string()
    }
}

impl BestEffortPathExt for Path {
    fn best_effort_absolute_path(&self) -> PathBuf {
        best_effort_absolute_path(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_absolute_path_is_normalized() {
        let path = Path::new("/definitely/not/./here/../there.txt");

        assert_eq!(
            path.best_effort_path_display(),
            "/definitely/not/there.txt"
        );
    }

    #[test]
    fn parent_of_root_stays_root() {
        assert_eq!(lexically_normalize(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn relative_path_is_anchored_at_current_directory() {
        let current_dir = std::env::current_dir().unwrap();

        assert_eq!(
            Path::new("not-here/../also-not-here").best_effort_absolute_path(),
            current_dir.join("also-not-here")
        );
    }

    #[test]
    fn existing_path_is_canonicalized() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let canonical = temp_dir.path().canonicalize().unwrap();

        assert_eq!(
            temp_dir.path().join(".").best_effort_path_display(),
            canonical.display().to_string()
        );
    }
}
