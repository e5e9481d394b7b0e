//! schwarz-pc: two-level additive Schwarz preconditioning over Faer
//!
//! This crate builds subspace-correction preconditioners for finite-element systems: an
//! additive overlapping patch smoother with exact (or Jacobi) local solves, a coarse-space
//! correction through a user-supplied prolongation, and a composite that sums weighted
//! corrections. A preconditioned conjugate gradient solver is included to drive them.

pub mod config;
pub mod core;
pub mod error;
pub mod matrix;
pub mod mesh;
pub mod partition;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use crate::core::*;
pub use error::*;
pub use matrix::*;
pub use mesh::{DofLayout, MeshTopology};
pub use partition::*;
pub use preconditioner::*;
pub use solver::*;
pub use utils::*;
