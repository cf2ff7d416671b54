use std::collections::BTreeSet;
use std::path::Path;

use dirtrack::{DirtrackConfig, Tracker, WatchConfig};
use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::RuntimeConfig;
use crate::application::data::ListingChange;
use crate::cli::Command;

pub struct Application;

impl Application {
    pub async fn run(runtime_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let runtime_config: RuntimeConfig = runtime_config.into();
        let config = Self::load_config(&runtime_config).await?;
        debug!("Loaded config: {:?}", config);

        match &runtime_config.command {
            Command::List { root } => {
                let tracker = Self::start(root, &config)?;
                for directory in tracker.list() {
                    println!("{directory}");
                }
            }
            Command::Contains { root, path } => {
                let tracker = Self::start(root, &config)?;
                println!("{}", tracker.contains(path));
            }
            Command::Watch { root } => {
                let tracker = Self::start(root, &config)?;
                Self::watch(&tracker, &config.watch).await;
            }
            Command::Relsym { base, target } => {
                let relative = dirtrack::rel_sym(base, target).context(ResolveSnafu)?;
                println!("{}", relative.display());
            }
        }

        Ok(())
    }

    async fn load_config(runtime_config: &RuntimeConfig) -> Result<DirtrackConfig, ApplicationError> {
        let config = match (&runtime_config.config_path, runtime_config.command.root()) {
            (Some(path), _) => DirtrackConfig::from_path(path).await,
            (None, Some(root)) => DirtrackConfig::read(root).await,
            (None, None) => Ok(DirtrackConfig::default()),
        };
        config.context(ConfigSnafu)
    }

    fn start(root: &Path, config: &DirtrackConfig) -> Result<Tracker, ApplicationError> {
        Tracker::watch_with_config(root, &config.tracker).context(WatchSnafu)
    }

    async fn watch(tracker: &Tracker, config: &WatchConfig) {
        let mut previous: BTreeSet<_> = tracker.list().into_iter().collect();
        for directory in &previous {
            println!("{directory}");
        }
        info!(
            "Watching {} every {:?}",
            tracker.root().display(),
            config.interval
        );

        while !tracker.is_closed() {
            compio::time::sleep(config.interval).await;
            let current: BTreeSet<_> = tracker.list().into_iter().collect();
            for change in ListingChange::between(&previous, &current) {
                println!("{change}");
            }
            previous = current;
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigError { source: dirtrack::ConfigError },
    #[snafu(display("Failed to start tracking the root directory"))]
    WatchError { source: dirtrack::WatchError },
    #[snafu(display("Failed to resolve the relative path"))]
    ResolveError { source: dirtrack::ResolveError },
}
