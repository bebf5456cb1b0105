use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::{debug, info};

use crate::ext::BestEffortPathExt;
use crate::snapshot::DeletionPolicy;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "treepack.yaml";
const DEFAULT_STATE_PATH: &str = ".treepack/state.json";
const STATE_DIRECTORY_NAME: &str = ".treepack";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Entry names skipped at every depth of a packed tree.
    pub exclude: Vec<String>,
    pub deletions: DeletionPolicy,
    /// Where the root entry of the last pack is kept.
    pub state_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude: vec![STATE_DIRECTORY_NAME.to_string()],
            deletions: DeletionPolicy::default(),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
        }
    }
}

impl Config {
    /// Reads the config file at `path`, falling back to defaults when it does not exist.
    pub async fn read(path: &Path) -> Result<Self, ConfigCreationError> {
        debug!("Opening config file: {}", path.best_effort_path_display());
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).context(ReadSnafu {
                    file_path: path.best_effort_path_display(),
                });
            }
        };

        let contents = String::from_utf8(bytes).map_err(|_| ConfigCreationError::NotUtf8 {
            file_path: path.best_effort_path_display(),
        })?;
        contents.as_str().try_into()
    }

    fn parse_exclude(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Vec<String>, ConfigCreationError> {
        let Some(value) = top_level.get(&key("exclude")) else {
            return Ok(Self::default().exclude);
        };
        if matches!(value, Yaml::Value(Scalar::Null)) {
            return Ok(Vec::new());
        }

        value
            .as_sequence()
            .context(ExcludeNotListSnafu)?
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .context(ExcludeNotListSnafu)
            })
            .collect()
    }

    fn parse_deletions(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<DeletionPolicy, ConfigCreationError> {
        let Some(value) = top_level.get(&key("deletions")) else {
            return Ok(DeletionPolicy::default());
        };

        match value.as_str() {
            Some("remove") => Ok(DeletionPolicy::Remove),
            Some("skip") => Ok(DeletionPolicy::Skip),
            other => UnknownDeletionPolicySnafu {
                value: format!("{:?}", other.unwrap_or_default()),
            }
            .fail(),
        }
    }

    fn parse_state_path(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<PathBuf, ConfigCreationError> {
        match top_level.get(&key("state")) {
            None => Ok(PathBuf::from(DEFAULT_STATE_PATH)),
            Some(value) => value
                .as_str()
                .map(PathBuf::from)
                .context(StateNotStringSnafu),
        }
    }
}

fn key(name: &'static str) -> Yaml<'static> {
    Yaml::Value(Scalar::String(Cow::Borrowed(name)))
}

impl TryFrom<&str> for Config {
    type Error = ConfigCreationError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let Some(document) = documents.first() else {
            debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        };

        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;

        Ok(Self {
            exclude: Self::parse_exclude(top_level)?,
            deletions: Self::parse_deletions(top_level)?,
            state_path: Self::parse_state_path(top_level)?,
        })
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigCreationError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("The config file {} is not valid UTF-8", file_path))]
    NotUtf8 { file_path: String },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("'exclude' should be a list of names"))]
    ExcludeNotList,
    #[snafu(display("'deletions' should be 'remove' or 'skip', got {}", value))]
    UnknownDeletionPolicy { value: String },
    #[snafu(display("'state' should be a path"))]
    StateNotString,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn parse(contents: &str) -> Result<Config, ConfigCreationError> {
        contents.try_into()
    }

    #[compio::test]
    async fn missing_file_yields_defaults() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");

        let config = Config::read(&temp_dir.path().join(DEFAULT_CONFIG_FILE_NAME))
            .await
            .expect("Missing config should not fail");

        assert_eq!(config, Config::default());
    }

    #[compio::test]
    async fn config_is_read_from_disk() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join(DEFAULT_CONFIG_FILE_NAME);
        std::fs::write(&path, "deletions: skip\n").unwrap();

        let config = Config::read(&path).await.expect("Failed to read config");

        assert_eq!(config.deletions, DeletionPolicy::Skip);
    }

    #[test]
    fn full_config_is_parsed() {
        let config = parse(
            r#"
exclude:
  - .git
  - target
deletions: skip
state: /var/lib/treepack/state.json
"#,
        )
        .expect("Failed to parse config");

        assert_eq!(config.exclude, vec![".git", "target"]);
        assert_eq!(config.deletions, DeletionPolicy::Skip);
        assert_eq!(config.state_path, PathBuf::from("/var/lib/treepack/state.json"));
    }

    #[rstest]
    #[case("")]
    #[case("unrelated: value")]
    fn absent_settings_fall_back_to_defaults(#[case] contents: &str) {
        assert_eq!(parse(contents).unwrap(), Config::default());
    }

    #[test]
    fn null_exclude_means_no_exclusions() {
        assert!(parse("exclude:").unwrap().exclude.is_empty());
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        assert!(matches!(
            parse("invalid: yaml: content: [unclosed"),
            Err(ConfigCreationError::ParseError { .. })
        ));
    }

    #[rstest]
    #[case("- item1\n- item2")]
    #[case("just a string")]
    fn non_map_top_level_is_rejected(#[case] contents: &str) {
        assert!(matches!(
            parse(contents),
            Err(ConfigCreationError::TopLevelNotMap)
        ));
    }

    #[rstest]
    #[case("exclude: .git")]
    #[case("exclude:\n  - nested:\n      - list")]
    fn exclude_must_be_a_list_of_names(#[case] contents: &str) {
        assert!(matches!(
            parse(contents),
            Err(ConfigCreationError::ExcludeNotList)
        ));
    }

    #[rstest]
    #[case("deletions: recreate")]
    #[case("deletions: [remove]")]
    fn unknown_deletion_policy_is_rejected(#[case] contents: &str) {
        assert!(matches!(
            parse(contents),
            Err(ConfigCreationError::UnknownDeletionPolicy { .. })
        ));
    }

    #[test]
    fn state_must_be_a_string() {
        assert!(matches!(
            parse("state:\n  nested: map"),
            Err(ConfigCreationError::StateNotString)
        ));
    }
}
