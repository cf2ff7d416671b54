use std::collections::BTreeSet;
use std::fmt;

use colored::Colorize;
use dirtrack::LogicalPath;

/// One line of `watch` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingChange {
    Added(LogicalPath),
    Removed(LogicalPath),
}

impl ListingChange {
    /// Removals first, then additions, each in path order.
    pub fn between(previous: &BTreeSet<LogicalPath>, current: &BTreeSet<LogicalPath>) -> Vec<Self> {
        let removed = previous
            .difference(current)
            .cloned()
            .map(ListingChange::Removed);
        let added = current.difference(previous).cloned().map(ListingChange::Added);
        removed.chain(added).collect()
    }

    fn plain(&self) -> String {
        match self {
            ListingChange::Added(path) => format!("+ {path}"),
            ListingChange::Removed(path) => format!("- {path}"),
        }
    }
}

impl fmt::Display for ListingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingChange::Added(_) => write!(f, "{}", self.plain().green()),
            ListingChange::Removed(_) => write!(f, "{}", self.plain().red()),
        }
    }
}
