//! Solver configuration.

pub mod options;
pub use options::PicardOptions;
