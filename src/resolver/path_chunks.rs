use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

use crate::ext::lexical_clean;

pub(crate) const PARENT: &str = "..";

/// The not-yet-consumed segments of one side of a resolution, root dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PathChunks {
    segments: VecDeque<OsString>,
}

impl PathChunks {
    /// Segments of an absolute path, without its prefix or root.
    pub(crate) fn from_path(path: &Path) -> Self {
        path.components().filter_map(segment_of).collect()
    }

    /// Segments that replace a symlink found `depth` segments below the
    /// filesystem root.
    ///
    /// Relative destinations are spliced in as they are. Absolute ones climb
    /// back to the root first, so the comparison restarts from there.
    pub(crate) fn from_link(destination: &Path, depth: usize) -> Self {
        if destination.has_root() {
            let climb = std::iter::repeat_n(OsString::from(PARENT), depth);
            let cleaned = lexical_clean(destination);
            let descend: Vec<OsString> = cleaned.components().filter_map(segment_of).collect();
            climb.chain(descend).collect()
        } else {
            Self::from_path(destination)
        }
    }

    pub(crate) fn front(&self) -> Option<&OsStr> {
        self.segments.front().map(OsString::as_os_str)
    }

    pub(crate) fn pop_front(&mut self) -> Option<OsString> {
        self.segments.pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of consecutive `..` segments at the front.
    pub(crate) fn leading_parents(&self) -> usize {
        self.segments
            .iter()
            .take_while(|segment| segment.as_os_str() == PARENT)
            .count()
    }

    pub(crate) fn skip(&mut self, count: usize) {
        self.segments.drain(..count.min(self.segments.len()));
    }

    pub(crate) fn prepend(&mut self, front: impl IntoIterator<Item = OsString>) {
        let mut joined: VecDeque<OsString> = front.into_iter().collect();
        joined.append(&mut self.segments);
        self.segments = joined;
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &OsStr> {
        self.segments.iter().map(OsString::as_os_str)
    }

    /// Replaces the segments up to and including `index` with the segments
    /// before it followed by `replacement`.
    pub(crate) fn replace_through(&mut self, index: usize, replacement: PathChunks) {
        let rest = self.segments.split_off((index + 1).min(self.segments.len()));
        self.segments.truncate(index);
        self.segments.extend(replacement.segments);
        self.segments.extend(rest);
    }

    pub(crate) fn to_path(&self) -> PathBuf {
        self.segments.iter().collect()
    }
}

impl FromIterator<OsString> for PathChunks {
    fn from_iter<I: IntoIterator<Item = OsString>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

fn segment_of(component: Component) -> Option<OsString> {
    match component {
        Component::Normal(name) => Some(name.to_os_string()),
        Component::ParentDir => Some(OsString::from(PARENT)),
        Component::Prefix(_) | Component::RootDir | Component::CurDir => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(chunks: &PathChunks) -> Vec<String> {
        chunks
            .segments
            .iter()
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_from_path_drops_root() {
        let chunks = PathChunks::from_path(Path::new("/testdata/TopA/MiddleA"));
        assert_eq!(segments(&chunks), vec!["testdata", "TopA", "MiddleA"]);
    }

    #[test]
    fn test_from_link_relative_is_kept() {
        let chunks = PathChunks::from_link(Path::new("../TopB/./MiddleA"), 3);
        assert_eq!(segments(&chunks), vec!["..", "TopB", "MiddleA"]);
        assert_eq!(chunks.leading_parents(), 1);
    }

    #[test]
    fn test_from_link_absolute_climbs_to_root() {
        let chunks = PathChunks::from_link(Path::new("/data/../srv/TopB"), 2);
        assert_eq!(segments(&chunks), vec!["..", "..", "srv", "TopB"]);
        assert_eq!(chunks.leading_parents(), 2);
    }

    #[test]
    fn test_prepend_and_skip() {
        let mut chunks = PathChunks::from_path(Path::new("/c/d"));
        chunks.prepend([OsString::from("a"), OsString::from("b")]);
        assert_eq!(segments(&chunks), vec!["a", "b", "c", "d"]);

        chunks.replace_through(1, PathChunks::from_path(Path::new("x/y")));
        assert_eq!(segments(&chunks), vec!["a", "x", "y", "c", "d"]);

        chunks.skip(4);
        assert_eq!(chunks.front(), Some(OsStr::new("d")));
        chunks.skip(5);
        assert!(chunks.is_empty());
        assert_eq!(chunks.to_path(), PathBuf::new());
    }
}
