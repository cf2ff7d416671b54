//! Root-relative logical paths and the normalizer that produces them from
//! filesystem paths.

mod logical_path;
mod normalizer;

pub use logical_path::LogicalPath;
pub use normalizer::{NormalizeError, PathNormalizer};
