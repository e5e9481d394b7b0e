//! Core traits and their implementations for dense faer matrices and plain vectors.

pub mod traits;
pub mod wrappers;

pub use traits::{InnerProduct, MatShape, MatVec, Operator, RowPattern, SubmatrixExtract};
