//! Matrix module: dense operator support and CSR sparse storage.

pub mod dense;
pub mod sparse;
pub use sparse::CsrMatrix;
