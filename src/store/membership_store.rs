use std::collections::BTreeSet;

use parking_lot::RwLock;
use tracing::trace;

use crate::paths::LogicalPath;

#[derive(Debug, Default)]
struct StoreState {
    dirs: BTreeSet<LogicalPath>,
    closed: bool,
}

/// The set of directories currently known to exist under the tracked root.
///
/// Readers share the lock; `insert`/`delete` take it exclusively. Once the
/// store is closed it reports nothing and ignores further mutations.
#[derive(Debug, Default)]
pub struct MembershipStore {
    state: RwLock<StoreState>,
}

impl MembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &LogicalPath) -> bool {
        let state = self.state.read();
        !state.closed && state.dirs.contains(path)
    }

    /// Sorted copy of every tracked path, empty once closed.
    pub fn snapshot(&self) -> Vec<LogicalPath> {
        let state = self.state.read();
        if state.closed {
            return Vec::new();
        }
        state.dirs.iter().cloned().collect()
    }

    /// Returns `true` when the path was not tracked before.
    pub fn insert(&self, path: LogicalPath) -> bool {
        let mut state = self.state.write();
        if state.closed {
            trace!("Ignoring insert of {} into a closed store", path);
            return false;
        }
        state.dirs.insert(path)
    }

    /// Inserts every path from `paths` under a single write lock.
    pub fn insert_all(&self, paths: impl IntoIterator<Item = LogicalPath>) -> usize {
        let mut state = self.state.write();
        if state.closed {
            return 0;
        }
        paths
            .into_iter()
            .filter(|path| state.dirs.insert(path.clone()))
            .count()
    }

    /// Returns `true` when the path was tracked. Deleting an absent path is a
    /// no-op.
    pub fn delete(&self, path: &LogicalPath) -> bool {
        let mut state = self.state.write();
        if state.closed {
            return false;
        }
        state.dirs.remove(path)
    }

    /// Deletes `path` and everything tracked beneath it, returning how many
    /// entries went away.
    pub fn delete_subtree(&self, path: &LogicalPath) -> usize {
        let mut state = self.state.write();
        if state.closed {
            return 0;
        }
        let doomed: Vec<LogicalPath> = state
            .dirs
            .range(path.clone()..)
            .take_while(|candidate| candidate.as_str().starts_with(path.as_str()))
            .filter(|candidate| candidate.is_within(path))
            .cloned()
            .collect();
        for candidate in &doomed {
            state.dirs.remove(candidate);
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        let state = self.state.read();
        if state.closed { 0 } else { state.dirs.len() }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn close(&self) {
        self.state.write().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }
}
