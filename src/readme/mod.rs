//! Markdown document rendering and output

pub mod fallback;
pub mod format;
pub mod profile;
pub mod writer;

pub use fallback::{render_fallback, render_minimal, DEFAULT_FALLBACK_MESSAGE};
pub use profile::render_profile;
pub use writer::write_document;
