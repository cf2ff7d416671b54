use std::path::PathBuf;

use derive_more::Display;
use notify::event::ModifyKind;
use notify::{Event, EventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RawEventKind {
    #[display("create")]
    Create,
    #[display("remove")]
    Remove,
    #[display("rename")]
    Rename,
}

/// One notification naming a single path. Consumed exactly once by the
/// reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: RawEventKind,
    pub path: PathBuf,
}

impl RawEvent {
    pub fn new(kind: RawEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Splits a notify event into one raw event per path.
    ///
    /// Renames keep their kind even when the backend pairs both names into a
    /// single event: every name is re-stat'ed later, which tells the old
    /// name from the new one. Access and content/metadata modifications carry
    /// no membership information and yield nothing.
    pub fn from_notify(event: Event) -> Vec<RawEvent> {
        let kind = match event.kind {
            EventKind::Create(_) => RawEventKind::Create,
            EventKind::Remove(_) => RawEventKind::Remove,
            EventKind::Modify(ModifyKind::Name(_)) => RawEventKind::Rename,
            _ => return Vec::new(),
        };

        event
            .paths
            .into_iter()
            .map(|path| RawEvent { kind, path })
            .collect()
    }
}
