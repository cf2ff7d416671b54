use std::path::{Component, Path};

use derive_more::Display;

const SEPARATOR: char = '/';

/// A root-relative, slash separated directory path such as `/a/b`.
///
/// The canonical form has no `.` or `..` segments and no trailing slash,
/// except for the root itself which is `/`. Ordering is plain string
/// ordering, which is what sorted listings use.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub struct LogicalPath(String);

impl LogicalPath {
    pub fn root() -> Self {
        LogicalPath(SEPARATOR.to_string())
    }

    /// Cleans a caller supplied root-relative path.
    ///
    /// Returns `None` for relative input: a path that does not start at the
    /// tracked root cannot name a tracked directory.
    pub fn parse(path: &str) -> Option<Self> {
        if !path.starts_with(SEPARATOR) {
            return None;
        }
        Some(Self::from_segments(path.split(SEPARATOR)))
    }

    /// Builds a logical path from a path that is already relative to the
    /// root (for example the result of `strip_prefix`).
    pub fn from_relative(relative: &Path) -> Self {
        let segments = relative.components().filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        });
        Self::from_segments(segments)
    }

    fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kept: Vec<String> = Vec::new();
        for segment in segments {
            match segment.as_ref() {
                "" | "." => {}
                ".." => {
                    kept.pop();
                }
                name => kept.push(name.to_string()),
            }
        }

        let mut canonical = String::with_capacity(kept.iter().map(|s| s.len() + 1).sum());
        for segment in &kept {
            canonical.push(SEPARATOR);
            canonical.push_str(segment);
        }
        if canonical.is_empty() {
            canonical.push(SEPARATOR);
        }
        LogicalPath(canonical)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    pub fn parent(&self) -> Option<LogicalPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) => Some(Self::root()),
            Some(index) => Some(LogicalPath(self.0[..index].to_string())),
            None => None,
        }
    }

    /// True when `self` is `other` or lies somewhere beneath it.
    pub fn is_within(&self, other: &LogicalPath) -> bool {
        if other.is_root() || self == other {
            return true;
        }
        self.0
            .strip_prefix(other.as_str())
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
    }

    pub fn join(&self, name: &str) -> LogicalPath {
        Self::from_segments(self.0.split(SEPARATOR).chain(name.split(SEPARATOR)))
    }
}

impl AsRef<str> for LogicalPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
