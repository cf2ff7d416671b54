use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use snafu::{ResultExt, Snafu, ensure};
use tracing::{debug, trace};

use crate::ext::{BestEffortPathExt, lexical_clean};
use crate::resolver::path_chunks::{PARENT, PathChunks};

/// Upper bound on symlinks followed during one resolution, matching the
/// Linux kernel's limit.
const MAX_SYMLINK_HOPS: usize = 40;

/// Expresses `target` relative to `base`, seeing through symlinks that alias
/// parts of the tree.
///
/// Both paths are walked segment by segment. Where they diverge, a symlink at
/// the diverging entry of either side is replaced by its destination and the
/// walk carries on. Failing that, the first symlink further down the base,
/// then the target, is expanded, so an alias that reconnects the two trees
/// anywhere along either path still resolves. The result uses the platform
/// separator and is `.` when both paths name the same directory.
pub fn rel_sym(base: impl AsRef<Path>, target: impl AsRef<Path>) -> Result<PathBuf, ResolveError> {
    let base = absolute_clean(base.as_ref())?;
    let target = absolute_clean(target.as_ref())?;
    ensure!(
        root_prefix(&base) == root_prefix(&target),
        MismatchedRootsSnafu {
            base: base.clone(),
            target: target.clone(),
        }
    );

    debug!(
        "Resolving {} relative to {}",
        target.display(),
        base.display()
    );
    Resolution::new(&base, &target).run()
}

fn absolute_clean(path: &Path) -> Result<PathBuf, ResolveError> {
    let absolute = std::path::absolute(path).context(AbsoluteSnafu {
        path: path.to_path_buf(),
    })?;
    Ok(lexical_clean(&absolute))
}

/// Drive letter (or other prefix) of a path, compared case-insensitively.
fn root_prefix(path: &Path) -> Option<String> {
    match path.components().next() {
        Some(Component::Prefix(prefix)) => {
            Some(prefix.as_os_str().to_string_lossy().to_lowercase())
        }
        _ => None,
    }
}

fn anchor_of(path: &Path) -> PathBuf {
    path.components()
        .take_while(|component| matches!(component, Component::Prefix(_) | Component::RootDir))
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Base,
    Target,
}

struct Resolution {
    base_input: PathBuf,
    target_input: PathBuf,
    anchor: PathBuf,
    walked: Vec<OsString>,
    base: PathChunks,
    target: PathChunks,
    hops: usize,
}

impl Resolution {
    fn new(base: &Path, target: &Path) -> Self {
        Self {
            base_input: base.to_path_buf(),
            target_input: target.to_path_buf(),
            anchor: anchor_of(base),
            walked: Vec::new(),
            base: PathChunks::from_path(base),
            target: PathChunks::from_path(target),
            hops: 0,
        }
    }

    fn run(mut self) -> Result<PathBuf, ResolveError> {
        loop {
            trace!(
                "walked {:?}, base {:?}, target {:?}",
                self.walked_path(),
                self.base.to_path(),
                self.target.to_path()
            );

            let parents = self.base.leading_parents();
            if parents > 0 {
                let climbed = self.climb(parents)?;
                self.base.skip(parents);
                self.target.prepend(climbed);
                continue;
            }

            let parents = self.target.leading_parents();
            if parents > 0 {
                let climbed = self.climb(parents)?;
                self.target.skip(parents);
                self.base.prepend(climbed);
                continue;
            }

            let Some(base_next) = self.base.front().map(OsStr::to_os_string) else {
                return self.finish();
            };

            let Some(target_next) = self.target.front().map(OsStr::to_os_string) else {
                // The base sits below the target unless a link on the base
                // side leads back up.
                if self.expand_first_link(Side::Base)? {
                    continue;
                }
                return TargetAboveBaseSnafu {
                    base: self.base_input.clone(),
                    target: self.target_input.clone(),
                }
                .fail();
            };

            if base_next == target_next {
                self.base.pop_front();
                self.target.pop_front();
                self.walked.push(base_next);
                continue;
            }

            // Links at the point of divergence are expanded on both sides
            // before the next comparison.
            let base_expanded = self.expand_link_at(Side::Base, &base_next)?;
            let target_expanded = self.expand_link_at(Side::Target, &target_next)?;
            if base_expanded || target_expanded {
                continue;
            }
            // A link further down either side can still bring the two paths
            // back together.
            if self.expand_first_link(Side::Base)? || self.expand_first_link(Side::Target)? {
                continue;
            }
            return DivergedSnafu {
                base: self.walked_path().join(&base_next),
                target: self.walked_path().join(&target_next),
            }
            .fail();
        }
    }

    fn walked_path(&self) -> PathBuf {
        let mut path = self.anchor.clone();
        path.extend(&self.walked);
        path
    }

    fn chunks(&self, side: Side) -> &PathChunks {
        match side {
            Side::Base => &self.base,
            Side::Target => &self.target,
        }
    }

    fn chunks_mut(&mut self, side: Side) -> &mut PathChunks {
        match side {
            Side::Base => &mut self.base,
            Side::Target => &mut self.target,
        }
    }

    /// Pops `count` segments off the walked stack, returning them in order.
    fn climb(&mut self, count: usize) -> Result<Vec<OsString>, ResolveError> {
        ensure!(
            count <= self.walked.len(),
            ClimbAboveRootSnafu {
                path: self.walked_path(),
                climb: count,
            }
        );
        Ok(self.walked.split_off(self.walked.len() - count))
    }

    /// Expands the front segment of `side` if it names a symlink.
    fn expand_link_at(&mut self, side: Side, name: &OsStr) -> Result<bool, ResolveError> {
        let path = self.walked_path().join(name);
        match lstat_entry(&path)? {
            Entry::Link(destination) => {
                self.splice(side, 0, &path, &destination)?;
                Ok(true)
            }
            Entry::Missing | Entry::Plain => Ok(false),
        }
    }

    /// Expands the first symlink among the remaining segments of `side`. The
    /// search stops at a missing entry or a `..`.
    fn expand_first_link(&mut self, side: Side) -> Result<bool, ResolveError> {
        let mut path = self.walked_path();
        let mut found = None;
        for (index, segment) in self.chunks(side).iter().enumerate() {
            if segment == PARENT {
                break;
            }
            path.push(segment);
            match lstat_entry(&path)? {
                Entry::Link(destination) => {
                    found = Some((index, destination));
                    break;
                }
                Entry::Plain => {}
                Entry::Missing => break,
            }
        }

        match found {
            Some((index, destination)) => {
                self.splice(side, index, &path, &destination)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replaces the link at `index` of `side` with its destination.
    fn splice(
        &mut self,
        side: Side,
        index: usize,
        link: &Path,
        destination: &Path,
    ) -> Result<(), ResolveError> {
        self.hops += 1;
        ensure!(
            self.hops <= MAX_SYMLINK_HOPS,
            SymlinkCycleSnafu {
                path: link.to_path_buf(),
                hops: MAX_SYMLINK_HOPS,
            }
        );
        trace!("{} links to {}", link.display(), destination.display());

        let replacement = PathChunks::from_link(destination, self.walked.len() + index);
        self.chunks_mut(side).replace_through(index, replacement);
        self.collapse_parents(side)
    }

    /// Folds every `name/..` pair of `side` whose `name` is not a symlink.
    /// Pairs behind a link stay until the link itself is expanded.
    fn collapse_parents(&mut self, side: Side) -> Result<(), ResolveError> {
        let mut path = self.walked_path();
        let mut kept: Vec<OsString> = Vec::new();
        for segment in self.chunks(side).iter() {
            let folds = segment == PARENT
                && kept.last().is_some_and(|last| last != PARENT)
                && !matches!(lstat_entry(&path)?, Entry::Link(_));
            if folds {
                kept.pop();
                path.pop();
            } else {
                path.push(segment);
                kept.push(segment.to_os_string());
            }
        }
        *self.chunks_mut(side) = kept.into_iter().collect();
        Ok(())
    }

    fn finish(self) -> Result<PathBuf, ResolveError> {
        if self.target.is_empty() {
            return Ok(PathBuf::from("."));
        }
        let remaining = lexical_clean(&self.target.to_path());
        if remaining.starts_with(PARENT) {
            return TargetAboveBaseSnafu {
                base: self.base_input,
                target: self.target_input,
            }
            .fail();
        }
        if remaining.as_os_str().is_empty() {
            return Ok(PathBuf::from("."));
        }
        Ok(remaining)
    }
}

enum Entry {
    Missing,
    Plain,
    Link(PathBuf),
}

/// Lstats `path`, reading its destination if it is a symlink.
fn lstat_entry(path: &Path) -> Result<Entry, ResolveError> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Entry::Missing),
        Err(error) => {
            return Err(error).context(StatSnafu {
                path: path.to_path_buf(),
            });
        }
    };
    if !metadata.file_type().is_symlink() {
        return Ok(Entry::Plain);
    }

    let destination = std::fs::read_link(path).context(ReadLinkSnafu {
        path: path.to_path_buf(),
    })?;
    Ok(Entry::Link(destination))
}

#[derive(Debug, Snafu)]
pub enum ResolveError {
    #[snafu(display("Failed to make {} absolute", path.display()))]
    AbsoluteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "{} and {} live under different roots",
        base.display(),
        target.display()
    ))]
    MismatchedRootsError { base: PathBuf, target: PathBuf },
    #[snafu(display("Cannot climb {} levels above {}", climb, path.display()))]
    ClimbAboveRootError { path: PathBuf, climb: usize },
    #[snafu(display(
        "Target {} is above base {}",
        target.best_effort_path_display(),
        base.best_effort_path_display()
    ))]
    TargetAboveBaseError { base: PathBuf, target: PathBuf },
    #[snafu(display(
        "Base {} is not a part of target {}",
        base.display(),
        target.display()
    ))]
    DivergedError { base: PathBuf, target: PathBuf },
    #[snafu(display("Failed to stat {}", path.display()))]
    StatError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to read link {}", path.display()))]
    ReadLinkError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Gave up after {} symlinks at {}", hops, path.display()))]
    SymlinkCycleError { path: PathBuf, hops: usize },
}
