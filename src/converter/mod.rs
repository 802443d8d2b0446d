//! Manifest converter for writing manifests in other formats

mod writer;

pub use writer::*;
