use std::{
    borrow::Cow,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::{debug, info};

use crate::ext::{AsyncTryFrom, BestEffortPathExt};

const CONFIG_FILE_NAME: &str = ".dirtrack.yaml";
const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_millis(1000);

const TRACKER_SECTION: &str = "tracker";
const WATCH_SECTION: &str = "watch";
const WORKER_THREADS_KEY: &str = "workerThreads";
const INTERVAL_KEY: &str = "intervalMs";

/// Settings for the tracker itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Size of the reconciler worker pool; `None` uses available parallelism.
    pub worker_threads: Option<NonZeroUsize>,
}

/// Settings for the CLI `watch` subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_WATCH_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtrackConfig {
    pub tracker: TrackerConfig,
    pub watch: WatchConfig,
}

impl DirtrackConfig {
    pub fn default_path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE_NAME)
    }

    /// Reads `<root>/.dirtrack.yaml`, falling back to defaults when the file
    /// does not exist.
    pub async fn read(root: &Path) -> Result<Self, ConfigError> {
        let path = Self::default_path(root);
        if !path.exists() {
            info!(
                "No config file at {}, using defaults",
                path.best_effort_path_display()
            );
            return Ok(Self::default());
        }
        Self::from_path(&path).await
    }

    pub async fn from_path(path: &Path) -> Result<Self, ConfigError> {
        Self::async_try_from(path).await
    }

    fn parse_tracker_section(
        section: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<TrackerConfig, ConfigError> {
        let worker_threads = positive_integer(section, TRACKER_SECTION, WORKER_THREADS_KEY)?
            .and_then(|n| usize::try_from(n).ok())
            .and_then(NonZeroUsize::new);
        Ok(TrackerConfig { worker_threads })
    }

    fn parse_watch_section(section: &LinkedHashMap<Yaml, Yaml>) -> Result<WatchConfig, ConfigError> {
        let interval = positive_integer(section, WATCH_SECTION, INTERVAL_KEY)?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_WATCH_INTERVAL);
        Ok(WatchConfig { interval })
    }
}

impl AsyncTryFrom<&Path> for DirtrackConfig {
    type Error = ConfigError;

    async fn async_try_from(path: &Path) -> Result<Self, Self::Error> {
        debug!("Reading config file: {}", path.best_effort_path_display());
        let bytes = compio::fs::read(path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        debug!("Successfully read config file: {} bytes", bytes.len());

        let contents = String::from_utf8(bytes).context(Utf8Snafu {
            file_path: path.best_effort_path_display(),
        })?;
        contents.as_str().try_into()
    }
}

impl TryFrom<&str> for DirtrackConfig {
    type Error = ConfigError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents =
            Yaml::load_from_str(contents).map_err(|e| ConfigError::ParseError { source: e })?;
        let Some(document) = documents.first() else {
            return Ok(Self::default());
        };
        if matches!(document, Yaml::Value(Scalar::Null)) {
            return Ok(Self::default());
        }

        let top_level = document.as_mapping().ok_or(ConfigError::TopLevelNotMap)?;

        let tracker = match section(top_level, TRACKER_SECTION)? {
            Some(tracker) => Self::parse_tracker_section(tracker)?,
            None => TrackerConfig::default(),
        };
        let watch = match section(top_level, WATCH_SECTION)? {
            Some(watch) => Self::parse_watch_section(watch)?,
            None => WatchConfig::default(),
        };

        Ok(DirtrackConfig { tracker, watch })
    }
}

fn key(name: &'static str) -> Yaml<'static> {
    Yaml::Value(Scalar::String(Cow::Borrowed(name)))
}

fn section<'a, 'input>(
    top_level: &'a LinkedHashMap<Yaml<'input>, Yaml<'input>>,
    name: &'static str,
) -> Result<Option<&'a LinkedHashMap<Yaml<'input>, Yaml<'input>>>, ConfigError> {
    match top_level.get(&key(name)) {
        None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
        Some(value) => value
            .as_mapping()
            .map(Some)
            .ok_or(ConfigError::SectionNotMap { section: name }),
    }
}

fn positive_integer(
    section: &LinkedHashMap<Yaml, Yaml>,
    section_name: &'static str,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match section.get(&key(name)) {
        None => Ok(None),
        Some(Yaml::Value(Scalar::Integer(value))) if *value > 0 => Ok(Some(*value as u64)),
        Some(_) => Err(ConfigError::InvalidValue {
            section: section_name,
            key: name,
        }),
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Config file {} is not valid UTF-8", file_path))]
    Utf8Error {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Section '{}' should be a map", section))]
    SectionNotMap { section: &'static str },
    #[snafu(display("'{}.{}' should be a positive integer", section, key))]
    InvalidValue {
        section: &'static str,
        key: &'static str,
    },
}
