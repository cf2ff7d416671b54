//! Live, chroot-like view of the directories under a root.

mod tracker;

pub use tracker::{Tracker, WatchError};
