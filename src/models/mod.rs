//! Data models for manifest representation

mod hash;
mod manifest;
mod requirement;
mod version;

pub use hash::*;
pub use manifest::*;
pub use requirement::*;
pub use version::*;
