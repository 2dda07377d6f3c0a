//! Core abstractions: scalar types, vector kernels and the assembler seam.

pub mod traits;
pub mod wrappers;

pub use traits::{Assembler, FactorizationHint, Scalar};
