//! Translates raw filesystem notifications into membership store mutations.

mod event_reconciler;
mod raw_event;

pub use event_reconciler::{EventOutcome, Reconciler, ReconcilerCreationError, apply_event};
pub use raw_event::{RawEvent, RawEventKind};
