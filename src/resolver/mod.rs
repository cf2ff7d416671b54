mod path_chunks;
mod rel_sym;

pub use rel_sym::{ResolveError, rel_sym};
