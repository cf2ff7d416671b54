mod dirtrack_config;

pub use dirtrack_config::{ConfigError, DirtrackConfig, TrackerConfig, WatchConfig};
