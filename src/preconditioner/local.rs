//! Local solvers for patch and coarse systems.
//!
//! A `LocalSolver` owns the factorization (or diagonal inverse) of one small dense system,
//! built once at setup and reused by every apply. Errors carry the subspace the solver
//! belongs to.

use crate::config::SubSolverKind;
use crate::core::traits::SubmatrixExtract;
use crate::error::{PcError, Subspace};
use crate::partition::Patch;
use crate::solver::LuSolver;
use faer::Mat;

enum LocalMethod {
    Direct(LuSolver),
    Jacobi(Vec<f64>),
}

pub struct LocalSolver {
    subspace: Subspace,
    dim: usize,
    method: LocalMethod,
}

impl LocalSolver {
    /// Prepare a solver for `a_local`.
    pub fn from_matrix(a_local: &Mat<f64>, kind: SubSolverKind, subspace: Subspace) -> Result<Self, PcError> {
        let dim = a_local.nrows();
        if a_local.ncols() != dim {
            return Err(PcError::mismatch(subspace, dim, a_local.ncols()));
        }
        let method = match kind {
            SubSolverKind::Direct => {
                let mut lu = LuSolver::new();
                lu.factor(a_local).map_err(|e| e.at(subspace))?;
                LocalMethod::Direct(lu)
            }
            SubSolverKind::Jacobi => {
                let inv_diag = (0..dim)
                    .map(|i| {
                        let d = a_local[(i, i)];
                        if d != 0.0 && d.is_finite() {
                            Ok(1.0 / d)
                        } else {
                            Err(PcError::singular(subspace, format!("diagonal entry {d} at local row {i}")))
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                LocalMethod::Jacobi(inv_diag)
            }
        };
        Ok(Self { subspace, dim, method })
    }

    /// Extract `R_patch A R_patchᵀ` from the global operator and prepare its solver.
    pub fn for_patch<M: SubmatrixExtract + ?Sized>(a: &M, patch: &Patch, kind: SubSolverKind) -> Result<Self, PcError> {
        let a_patch = a.submatrix(patch.dofs());
        Self::from_matrix(&a_patch, kind, Subspace::Patch(patch.index()))
    }

    pub fn subspace(&self) -> Subspace {
        self.subspace
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn kind(&self) -> SubSolverKind {
        match self.method {
            LocalMethod::Direct(_) => SubSolverKind::Direct,
            LocalMethod::Jacobi(_) => SubSolverKind::Jacobi,
        }
    }

    /// Local correction for a local residual.
    pub fn apply(&self, local_residual: &[f64]) -> Result<Vec<f64>, PcError> {
        if local_residual.len() != self.dim {
            return Err(PcError::mismatch(self.subspace, self.dim, local_residual.len()));
        }
        match &self.method {
            LocalMethod::Direct(lu) => {
                let mut x = vec![0.0; self.dim];
                lu.solve_cached(local_residual, &mut x).map_err(|e| e.at(self.subspace))?;
                Ok(x)
            }
            LocalMethod::Jacobi(inv_diag) => {
                Ok(local_residual.iter().zip(inv_diag).map(|(r, d)| r * d).collect())
            }
        }
    }
}
