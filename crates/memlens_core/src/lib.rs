//! Typed views, renderers and cross-view detectors over raw memory images.

/// Cross-view detectors such as hidden kernel module checks.
pub mod detect;
/// Memory images, profiles and typed object handles.
pub mod image;
/// Type-directed renderers, cells and tables.
pub mod render;

mod error;

pub use error::{MemlensError, Result};
