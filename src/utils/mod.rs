//! Solver and partitioning utilities.

pub mod convergence;
pub mod graph;

pub use convergence::{Convergence, SolveStats};
