//! Input processors: JSON value translation and document translation

pub mod document;
pub mod json;
