//! Discourse-marker catalog and detection.

pub mod catalog;
pub mod detector;

pub use catalog::MarkerCatalog;
pub use detector::{MarkerHit, detect};
