//! Recursive directory enumeration used to seed the tracker and to pick up
//! subtrees that appear in a single event.

mod directory_walk;

pub use directory_walk::{DirectoryWalkError, collect_directories, walk_entries};
