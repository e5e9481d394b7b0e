//! Subspace-correction preconditioners.
//!
//! This module defines the `Preconditioner` trait and the pieces of a two-level additive
//! Schwarz method: exact or approximate local solvers, the additive patch smoother, the
//! coarse-space correction, and the composite preconditioner that sums them.

use crate::error::PcError;

/// A preconditioner M ≈ A⁻¹.
pub trait Preconditioner<M, V> {
    /// Apply M⁻¹ to r, writing z = M⁻¹ r
    fn apply(&self, r: &V, z: &mut V) -> Result<(), PcError>;
    /// Build internal state from A, replacing any previous state.
    fn setup(&mut self, _a: &M) -> Result<(), PcError> {
        Ok(())
    }
}

pub mod coarse;
pub mod composite;
pub mod local;
pub mod patch;

pub use coarse::{CoarseOperator, CoarseSpacePreconditioner, constant_prolongation};
pub use composite::{CompositePreconditioner, Discretization, Phase};
pub use local::LocalSolver;
pub use patch::{PatchPreconditioner, PatchSource};

/// Map `f` over `items`, on the Rayon pool when `parallel` is set. The output keeps the
/// input order either way.
pub(crate) fn map_ordered<T, R, F>(items: &[T], parallel: bool, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        if parallel {
            use rayon::prelude::*;
            return items.par_iter().map(f).collect();
        }
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;
    items.iter().map(f).collect()
}

/// Return the first error in order, or all values.
pub(crate) fn first_error<R>(results: Vec<Result<R, PcError>>) -> Result<Vec<R>, PcError> {
    results.into_iter().collect()
}
