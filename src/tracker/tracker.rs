use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use futures_channel::mpsc::{self, UnboundedSender};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use snafu::{ResultExt, Snafu, ensure};
use tracing::{debug, info, trace, warn};

use crate::config::TrackerConfig;
use crate::ext::BestEffortPathExt;
use crate::filesystem::{DirectoryWalkError, collect_directories};
use crate::paths::{LogicalPath, PathNormalizer};
use crate::reconciler::{RawEvent, Reconciler, ReconcilerCreationError};
use crate::store::MembershipStore;

const CONSUMER_THREAD_NAME: &str = "dirtrack-reconciler";

/// Tracks every directory under a root, as if the root were `/`.
///
/// The tree is walked once when watching starts; afterwards filesystem
/// notifications keep the view current with a platform specific delay of up
/// to a few seconds. Close the tracker (or drop it) when done.
pub struct Tracker {
    root: PathBuf,
    store: Arc<MembershipStore>,
    subscription: Mutex<Option<RecommendedWatcher>>,
}

impl Tracker {
    /// Starts tracking `root` with default settings. The returned tracker can
    /// be queried immediately.
    pub fn watch(root: impl AsRef<Path>) -> Result<Self, WatchError> {
        Self::watch_with_config(root, &TrackerConfig::default())
    }

    pub fn watch_with_config(
        root: impl AsRef<Path>,
        config: &TrackerConfig,
    ) -> Result<Self, WatchError> {
        let requested = root.as_ref();
        let metadata = std::fs::metadata(requested).context(RootMetadataSnafu {
            path: requested.to_path_buf(),
        })?;
        ensure!(
            metadata.is_dir(),
            NotADirectorySnafu {
                path: requested.to_path_buf(),
            }
        );

        let canonical_root = requested.canonicalize().context(CanonicalizeRootSnafu {
            path: requested.to_path_buf(),
        })?;
        debug!("Watching {}", canonical_root.display());

        let normalizer = Arc::new(PathNormalizer::new(canonical_root.clone()));
        let store = Arc::new(MembershipStore::new());

        // Subscribe before walking so nothing created during the walk is
        // missed; events queue up until the reconciler starts.
        let (sender, receiver) = mpsc::unbounded::<RawEvent>();
        let watcher = Self::subscribe(&canonical_root, sender)?;

        let seeded = collect_directories(&canonical_root, &normalizer).context(SeedWalkSnafu {
            path: canonical_root.clone(),
        })?;
        let seeded_count = store.insert_all(seeded);
        info!(
            "Tracking {} directories under {}",
            seeded_count,
            canonical_root.display()
        );

        let reconciler = Reconciler::new(store.clone(), normalizer, config.worker_threads)
            .context(ReconcilerCreationSnafu)?;
        thread::Builder::new()
            .name(CONSUMER_THREAD_NAME.to_string())
            .spawn(move || futures::executor::block_on(reconciler.run(receiver)))
            .context(ConsumerSpawnSnafu)?;

        Ok(Self {
            root: canonical_root,
            store,
            subscription: Mutex::new(Some(watcher)),
        })
    }

    fn subscribe(
        root: &Path,
        sender: UnboundedSender<RawEvent>,
    ) -> Result<RecommendedWatcher, WatchError> {
        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    for raw_event in RawEvent::from_notify(event) {
                        if sender.unbounded_send(raw_event).is_err() {
                            trace!("Reconciler is gone, dropping event");
                            return;
                        }
                    }
                }
                Err(error) => warn!("Filesystem notification error: {}", error),
            })
            .context(SubscribeSnafu {
                path: root.to_path_buf(),
            })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .context(SubscribeSnafu {
                path: root.to_path_buf(),
            })?;
        Ok(watcher)
    }

    /// The canonical (symlink resolved) root being tracked.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path`, given relative to the root (`/a/b`), is a tracked
    /// directory. Relative input never matches; no symlinks are resolved.
    pub fn contains(&self, path: &str) -> bool {
        LogicalPath::parse(path).is_some_and(|logical| self.store.contains(&logical))
    }

    /// Every tracked directory, sorted. Empty once closed.
    pub fn list(&self) -> Vec<LogicalPath> {
        self.store.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.store.is_closed()
    }

    /// Stops tracking. The notification subscription is released on the
    /// first call; later calls only re-mark the store as closed. Event
    /// handlers already running are not waited for.
    pub fn close(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(mut watcher) = subscription {
            if let Err(error) = watcher.unwatch(&self.root) {
                warn!(
                    "Failed to unwatch {}: {}",
                    self.root.best_effort_path_display(),
                    error
                );
            }
            drop(watcher);
            debug!("Stopped watching {}", self.root.display());
        }
        self.store.close();
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug, Snafu)]
pub enum WatchError {
    #[snafu(display("Failed to stat root {}", path.best_effort_path_display()))]
    RootMetadataError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Root {} is not a directory", path.best_effort_path_display()))]
    NotADirectoryError { path: PathBuf },
    #[snafu(display("Failed to resolve root {}", path.best_effort_path_display()))]
    CanonicalizeRootError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to subscribe to changes under {}", path.display()))]
    SubscribeError { path: PathBuf, source: notify::Error },
    #[snafu(display("Failed to walk the initial tree under {}", path.display()))]
    SeedWalkError {
        path: PathBuf,
        source: DirectoryWalkError,
    },
    #[snafu(display("Failed to create the event reconciler"))]
    ReconcilerCreationError { source: ReconcilerCreationError },
    #[snafu(display("Failed to start the event consumer thread"))]
    ConsumerSpawnError { source: std::io::Error },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    const NOTIFY_TIMEOUT: Duration = Duration::from_secs(15);

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + NOTIFY_TIMEOUT;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(50));
        }
        condition()
    }

    fn listed(tracker: &Tracker) -> Vec<String> {
        tracker.list().iter().map(|p| p.to_string()).collect()
    }

    /// Independent recursive listing, used to cross-check the seed walk.
    fn read_dir_recursive(root: &Path, relative: &str, found: &mut BTreeSet<String>) {
        found.insert(if relative.is_empty() {
            "/".to_string()
        } else {
            relative.to_string()
        });
        for entry in fs::read_dir(root.join(relative.trim_start_matches('/'))).unwrap() {
            let entry = entry.unwrap();
            if entry.file_type().unwrap().is_dir() {
                let child = format!("{}/{}", relative, entry.file_name().to_string_lossy());
                read_dir_recursive(root, &child, found);
            }
        }
    }

    fn testdata() -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        for dir in [
            "topA/middleA/deepA",
            "topA/middleB",
            "topB/middleA",
            "topC/middleC/deepC/deeperC",
        ] {
            fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
        }
        fs::write(temp_dir.path().join("topA/readme.txt"), "hello").unwrap();
        temp_dir
    }

    #[test]
    fn test_contains_after_watch() {
        let temp_dir = testdata();
        let tracker = Tracker::watch(temp_dir.path()).expect("Failed to watch");

        assert!(tracker.contains("/topA/middleB"));
        assert!(tracker.contains("/"));
        assert!(tracker.contains("/topA/middleB/"));
        assert!(!tracker.contains("/nope"));
        assert!(!tracker.contains("topA"));
        assert!(!tracker.contains("/topA/readme.txt"));
    }

    #[test]
    fn test_list_matches_independent_walk() {
        let temp_dir = testdata();
        let tracker = Tracker::watch(temp_dir.path()).expect("Failed to watch");

        let mut expected = BTreeSet::new();
        read_dir_recursive(tracker.root(), "", &mut expected);

        assert_eq!(listed(&tracker), expected.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_watch_rejects_missing_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = Tracker::watch(temp_dir.path().join("missing"));
        assert!(matches!(result, Err(WatchError::RootMetadataError { .. })));
    }

    #[test]
    fn test_watch_rejects_file_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "not a directory").unwrap();

        let result = Tracker::watch(&file);
        assert!(matches!(result, Err(WatchError::NotADirectoryError { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_watch_through_symlinked_root() {
        let temp_dir = testdata();
        let link_parent = TempDir::new().expect("Failed to create temp directory");
        let link = link_parent.path().join("tracked");
        std::os::unix::fs::symlink(temp_dir.path(), &link).unwrap();

        let tracker = Tracker::watch(&link).expect("Failed to watch");

        assert_eq!(tracker.root(), temp_dir.path().canonicalize().unwrap());
        assert!(tracker.contains("/topC/middleC/deepC/deeperC"));
    }

    #[test]
    fn test_close_hides_state_and_is_repeatable() {
        let temp_dir = testdata();
        let tracker = Tracker::watch(temp_dir.path()).expect("Failed to watch");
        assert!(!tracker.list().is_empty());

        tracker.close();
        tracker.close();

        assert!(tracker.is_closed());
        assert!(!tracker.contains("/"));
        assert!(!tracker.contains("/topA/middleB"));
        assert!(tracker.list().is_empty());
    }

    #[test]
    fn test_trackers_are_independent() {
        let first_dir = testdata();
        let second_dir = testdata();
        let first = Tracker::watch(first_dir.path()).expect("Failed to watch");
        let second = Tracker::watch(second_dir.path()).expect("Failed to watch");

        first.close();

        assert!(first.list().is_empty());
        assert!(second.contains("/topB/middleA"));
    }

    #[test]
    fn test_live_creation_is_picked_up() {
        let folders = ["/apple", "/banana", "/carrot", "/carrot/celery", "/dog/dolphin"];
        let not_folders = ["/apricot", "/bubble", "celery", "/junkfile"];

        let base = TempDir::new().expect("Failed to create temp directory");
        let tracker = Tracker::watch(base.path()).expect("Failed to watch");

        for folder in folders {
            fs::create_dir_all(base.path().join(folder.trim_start_matches('/')))
                .expect("Failed to create directory");
        }
        fs::write(base.path().join("junkfile"), "junk").expect("Failed creating a file");

        assert!(
            wait_until(|| folders.iter().all(|folder| tracker.contains(folder))),
            "directories never showed up: {:?}",
            listed(&tracker)
        );
        for folder in not_folders {
            assert!(!tracker.contains(folder), "{} should not be tracked", folder);
        }

        // Ancestor invariant at quiescence.
        for path in tracker.list() {
            if let Some(parent) = path.parent() {
                assert!(tracker.contains(parent.as_str()), "{} has no parent", path);
            }
        }
    }

    #[test]
    fn test_live_removal_and_rename_are_picked_up() {
        let base = testdata();
        let tracker = Tracker::watch(base.path()).expect("Failed to watch");

        fs::remove_dir_all(base.path().join("topC")).unwrap();
        fs::rename(base.path().join("topB"), base.path().join("renamedB")).unwrap();

        assert!(
            wait_until(|| !tracker.contains("/topC")
                && !tracker.contains("/topC/middleC/deepC/deeperC")
                && !tracker.contains("/topB")
                && tracker.contains("/renamedB/middleA")),
            "tracker never converged: {:?}",
            listed(&tracker)
        );
        assert!(!tracker.contains("/topB/middleA"));
    }
}
