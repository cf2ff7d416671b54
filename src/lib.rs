//! Live view of the directories under a root, plus a symlink-aware relative
//! path resolver.

#![allow(clippy::enum_variant_names)]
#![allow(clippy::module_inception)]

pub mod config;
mod ext;
pub mod filesystem;
pub mod paths;
pub mod reconciler;
pub mod resolver;
pub mod store;
pub mod tracker;

pub use config::{ConfigError, DirtrackConfig, TrackerConfig, WatchConfig};
pub use paths::LogicalPath;
pub use resolver::{ResolveError, rel_sym};
pub use tracker::{Tracker, WatchError};
