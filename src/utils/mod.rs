//! Utility functions

mod filename;

pub use filename::render_file_stem;
