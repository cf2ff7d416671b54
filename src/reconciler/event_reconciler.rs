use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::thread::available_parallelism;

use compio::dispatcher::{Dispatcher, DispatcherBuilder};
use futures::StreamExt;
use futures_channel::mpsc::UnboundedReceiver;
use snafu::{ResultExt, Snafu};
use tracing::{debug, trace, warn};

use crate::filesystem::collect_directories;
use crate::paths::{LogicalPath, PathNormalizer};
use crate::reconciler::{RawEvent, RawEventKind};
use crate::store::MembershipStore;

/// Default number of worker threads when unable to determine system parallelism
const DEFAULT_WORKER_THREADS: usize = 1;

/// What applying a single event did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The directory (and `added - 1` newly seen descendants) became tracked.
    Inserted { path: LogicalPath, added: usize },
    /// The directory and its tracked descendants were dropped.
    Removed { path: LogicalPath, removed: usize },
    /// Not a directory, raced with a later mutation, or outside the root.
    Discarded,
}

/// Drains raw events and applies each one to the store on a worker pool.
///
/// Events are handled independently of each other: two events for the same
/// path that arrive close together may be applied in either order. The store
/// converges once no further events for that path arrive.
pub struct Reconciler {
    dispatcher: Dispatcher,
    store: Arc<MembershipStore>,
    normalizer: Arc<PathNormalizer>,
}

impl Reconciler {
    pub fn new(
        store: Arc<MembershipStore>,
        normalizer: Arc<PathNormalizer>,
        worker_threads: Option<NonZeroUsize>,
    ) -> Result<Self, ReconcilerCreationError> {
        let workers_num = worker_threads.unwrap_or_else(Self::determine_worker_count);
        debug!("Using {} worker threads for event reconciliation", workers_num);

        let dispatcher = DispatcherBuilder::new()
            .worker_threads(workers_num)
            .build()
            .context(DispatcherSnafu)?;

        Ok(Self {
            dispatcher,
            store,
            normalizer,
        })
    }

    fn determine_worker_count() -> NonZeroUsize {
        available_parallelism()
            .ok()
            .or_else(|| NonZeroUsize::new(DEFAULT_WORKER_THREADS))
            .unwrap_or(NonZeroUsize::MIN)
    }

    /// Consumes events until every sender is gone. Handlers still in flight
    /// when the stream ends are not awaited.
    pub async fn run(self, mut events: UnboundedReceiver<RawEvent>) {
        debug!("Reconciler started for {}", self.normalizer.root().display());
        while let Some(event) = events.next().await {
            self.dispatch_event(event);
        }
        debug!("Event stream closed, reconciler stopping");
    }

    fn dispatch_event(&self, event: RawEvent) {
        let store = self.store.clone();
        let normalizer = self.normalizer.clone();
        let description = format!("{} of {}", event.kind, event.path.display());

        let dispatched = self.dispatcher.dispatch(move || async move {
            apply_event(&store, &normalizer, event).await
        });
        match dispatched {
            Ok(_) => trace!("Dispatched {}", description),
            Err(error) => warn!("Failed to dispatch {}: {}", description, error),
        }
    }
}

/// Classifies one event against the filesystem and mutates the store.
///
/// Renames are delivered once for the old name and once for the new one;
/// re-stat'ing the reported path tells them apart. A mutation landing between
/// delivery and the stat can make this guess wrong until the next event for
/// the path arrives.
pub async fn apply_event(
    store: &MembershipStore,
    normalizer: &PathNormalizer,
    event: RawEvent,
) -> EventOutcome {
    trace!("Applying {} event for {}", event.kind, event.path.display());

    match event.kind {
        RawEventKind::Create => match stat_is_dir(&event.path).await {
            Some(true) => insert_directory(store, normalizer, &event.path),
            _ => EventOutcome::Discarded,
        },
        RawEventKind::Remove => remove_directory(store, normalizer, &event.path),
        RawEventKind::Rename => match stat_is_dir(&event.path).await {
            None => remove_directory(store, normalizer, &event.path),
            Some(true) => insert_directory(store, normalizer, &event.path),
            Some(false) => EventOutcome::Discarded,
        },
    }
}

async fn stat_is_dir(path: &Path) -> Option<bool> {
    compio::fs::metadata(path)
        .await
        .ok()
        .map(|metadata| metadata.is_dir())
}

fn insert_directory(
    store: &MembershipStore,
    normalizer: &PathNormalizer,
    path: &Path,
) -> EventOutcome {
    let resolved = match normalizer.resolve(path) {
        Ok(resolved) => resolved,
        Err(error) => {
            trace!("Dropping event: {}", error);
            return EventOutcome::Discarded;
        }
    };
    let logical = match normalizer.map_resolved(&resolved) {
        Ok(logical) => logical,
        Err(error) => {
            trace!("Dropping event: {}", error);
            return EventOutcome::Discarded;
        }
    };

    // Children created before the watch on this directory was registered
    // never produce events of their own.
    let directories = match collect_directories(&resolved, normalizer) {
        Ok(directories) => directories,
        Err(error) => {
            trace!("Subtree scan of {} failed: {}", logical, error);
            vec![logical.clone()]
        }
    };

    let added = store.insert_all(directories);
    EventOutcome::Inserted {
        path: logical,
        added,
    }
}

fn remove_directory(
    store: &MembershipStore,
    normalizer: &PathNormalizer,
    path: &Path,
) -> EventOutcome {
    match normalizer.normalize(path) {
        Ok(logical) => {
            let removed = store.delete_subtree(&logical);
            EventOutcome::Removed {
                path: logical,
                removed,
            }
        }
        Err(error) => {
            trace!("Dropping event: {}", error);
            EventOutcome::Discarded
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ReconcilerCreationError {
    #[snafu(display("Failed to create event dispatcher"))]
    DispatcherError { source: std::io::Error },
}
