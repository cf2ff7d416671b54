use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu, ensure};

use crate::ext::{BestEffortPathExt, lexical_clean};
use crate::paths::LogicalPath;

/// Maps filesystem paths under a fixed root onto [`LogicalPath`]s.
///
/// The root is canonicalized by the caller once, when watching starts; every
/// path handed to [`PathNormalizer::normalize`] is resolved against that
/// anchor.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    root: PathBuf,
}

impl PathNormalizer {
    pub fn new(canonical_root: PathBuf) -> Self {
        Self {
            root: canonical_root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `path` (symlinks included) and expresses it relative to the
    /// root.
    ///
    /// A path that no longer exists is resolved through its deepest existing
    /// ancestor with the missing tail appended as-is, so removals still map
    /// onto the logical path that was tracked.
    pub fn normalize(&self, path: &Path) -> Result<LogicalPath, NormalizeError> {
        let resolved = self.resolve(path)?;
        self.relative_to_root(&resolved)
    }

    /// The symlink free location of `path` on disk, checked to be under the
    /// root.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf, NormalizeError> {
        let absolute = std::path::absolute(path).context(AbsoluteSnafu {
            path: path.to_path_buf(),
        })?;
        let resolved = resolve_best_effort(&lexical_clean(&absolute));
        ensure!(
            resolved.starts_with(&self.root),
            OutsideRootSnafu {
                path: resolved,
                root: self.root.clone(),
            }
        );
        Ok(resolved)
    }

    /// Maps a path that is already symlink free, such as one produced by
    /// walking the canonical root, without touching the filesystem.
    pub fn map_resolved(&self, resolved: &Path) -> Result<LogicalPath, NormalizeError> {
        self.relative_to_root(resolved)
    }

    fn relative_to_root(&self, resolved: &Path) -> Result<LogicalPath, NormalizeError> {
        resolved
            .strip_prefix(&self.root)
            .map(LogicalPath::from_relative)
            .map_err(|_| NormalizeError::OutsideRootError {
                path: resolved.to_path_buf(),
                root: self.root.clone(),
            })
    }
}

fn resolve_best_effort(absolute: &Path) -> PathBuf {
    if let Ok(canonical) = absolute.canonicalize() {
        return canonical;
    }

    let mut missing = Vec::new();
    let mut current = absolute;
    while let Some(parent) = current.parent() {
        if let Some(name) = current.file_name() {
            missing.push(name.to_os_string());
        }
        if let Ok(mut canonical) = parent.canonicalize() {
            canonical.extend(missing.iter().rev());
            return canonical;
        }
        current = parent;
    }

    absolute.to_path_buf()
}

#[derive(Debug, Snafu)]
pub enum NormalizeError {
    #[snafu(display("Failed to make {} absolute", path.display()))]
    AbsoluteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "Path {} is outside of the tracked root {}",
        path.display(),
        root.best_effort_path_display()
    ))]
    OutsideRootError { path: PathBuf, root: PathBuf },
}
