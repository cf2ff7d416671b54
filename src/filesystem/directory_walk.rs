use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tracing::trace;
use walkdir::WalkDir;

use crate::ext::BestEffortPathExt;
use crate::paths::{LogicalPath, NormalizeError, PathNormalizer};

/// Visits every entry below `start` (and `start` itself), telling the
/// visitor whether it is a directory. Symlinks are reported as
/// non-directories and never followed. The first error from the walk or from
/// the visitor stops the walk and is returned.
pub fn walk_entries<F>(start: &Path, mut visit: F) -> Result<(), DirectoryWalkError>
where
    F: FnMut(&Path, bool) -> Result<(), DirectoryWalkError>,
{
    for entry in WalkDir::new(start).follow_links(false) {
        let entry = entry.context(WalkSnafu {
            start: start.to_path_buf(),
        })?;
        visit(entry.path(), entry.file_type().is_dir())?;
    }
    Ok(())
}

/// Collects the logical path of every directory below `start`, including
/// `start` itself. `start` must live under the normalizer's root and must
/// already be symlink free.
pub fn collect_directories(
    start: &Path,
    normalizer: &PathNormalizer,
) -> Result<Vec<LogicalPath>, DirectoryWalkError> {
    let mut directories = Vec::new();
    walk_entries(start, |path, is_dir| {
        if !is_dir {
            return Ok(());
        }
        let logical = normalizer
            .map_resolved(path)
            .context(NormalizeSnafu {
                path: path.to_path_buf(),
            })?;
        trace!("Discovered directory {}", logical);
        directories.push(logical);
        Ok(())
    })?;
    Ok(directories)
}

#[derive(Debug, Snafu)]
pub enum DirectoryWalkError {
    #[snafu(display("Failed to walk directories under {}", start.best_effort_path_display()))]
    WalkError {
        start: PathBuf,
        source: walkdir::Error,
    },
    #[snafu(display("Failed to map {} onto the tracked root", path.display()))]
    NormalizeError {
        path: PathBuf,
        source: NormalizeError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_directories_skips_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("topA/middleB")).unwrap();
        fs::create_dir_all(root.join("topB")).unwrap();
        fs::write(root.join("topA/junkfile"), "junk").unwrap();

        let normalizer = PathNormalizer::new(root.clone());
        let mut directories: Vec<String> = collect_directories(&root, &normalizer)
            .unwrap()
            .iter()
            .map(|p| p.to_string())
            .collect();
        directories.sort();

        assert_eq!(directories, vec!["/", "/topA", "/topA/middleB", "/topB"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_does_not_follow_symlinks() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("real/inner")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("alias")).unwrap();

        let mut seen = Vec::new();
        walk_entries(&root, |path, is_dir| {
            seen.push((path.to_path_buf(), is_dir));
            Ok(())
        })
        .unwrap();

        assert!(seen.contains(&(root.join("alias"), false)));
        assert!(!seen.iter().any(|(path, _)| path.starts_with(root.join("alias/inner"))));
    }

    #[test]
    fn test_walk_of_missing_start_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let missing = temp_dir.path().join("missing");

        let result = walk_entries(&missing, |_, _| Ok(()));
        assert!(matches!(result, Err(DirectoryWalkError::WalkError { .. })));
    }

    #[test]
    fn test_visitor_error_stops_walk() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("a/b/c")).unwrap();

        let mut visits = 0;
        let result = walk_entries(&root, |path, _| {
            visits += 1;
            Err(DirectoryWalkError::NormalizeError {
                path: path.to_path_buf(),
                source: NormalizeError::OutsideRootError {
                    path: path.to_path_buf(),
                    root: PathBuf::from("/elsewhere"),
                },
            })
        });

        assert!(result.is_err());
        assert_eq!(visits, 1);
    }
}
