//! Evidence search: snippet windows and source text scanning

mod snippet;
mod source;

pub use snippet::{build_snippet, DEFAULT_CONTEXT_CHARS};
pub use source::{search_flat, search_pages, PageHit};
