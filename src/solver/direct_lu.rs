//! Direct dense solver using Faer: LU with full pivoting.
//!
//! `LuSolver` factors a (small) dense matrix once and then solves for any number of
//! right-hand sides. Patch-local and coarse systems are solved this way. Singular or
//! numerically singular matrices are rejected at factorization time by inspecting the
//! pivots, and any non-finite solution is rejected at solve time.
//!
//! # References
//! - Faer documentation: https://github.com/sarah-ek/faer-rs
//! - Golub & Van Loan, Matrix Computations, §3.4

use crate::error::{PcError, Subspace};
use crate::preconditioner::Preconditioner;
use crate::solver::LinearSolver;
use crate::utils::convergence::SolveStats;
use faer::linalg::solvers::{FullPivLu, SolveCore};
use faer::{Conj, Mat, MatMut};

/// LU solver using full pivoting from Faer.
///
/// Stores the LU factorization for reuse. Errors are attributed to `Subspace::Global`;
/// callers that serve a particular subspace re-tag them with [`PcError::at`].
pub struct LuSolver {
    /// Cached LU factorization (if computed)
    factor: Option<FullPivLu<f64>>,
    dim: usize,
    factored: bool,
    /// Relative pivot threshold; `None` means `dim · ε`.
    pivot_tol: Option<f64>,
}

impl LuSolver {
    /// Create a new LU solver (no factorization yet).
    pub fn new() -> Self {
        LuSolver { factor: None, dim: 0, factored: false, pivot_tol: None }
    }

    /// Treat the matrix as singular when its smallest pivot is at most `tol` times the
    /// largest one.
    pub fn with_pivot_tolerance(mut self, tol: f64) -> Self {
        self.pivot_tol = Some(tol);
        self
    }

    pub fn is_factored(&self) -> bool {
        self.factored
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Factor `a`, replacing any previous factorization.
    pub fn factor(&mut self, a: &Mat<f64>) -> Result<(), PcError> {
        self.factor = None;
        self.factored = false;
        let n = a.nrows();
        if a.ncols() != n {
            return Err(PcError::mismatch(Subspace::Global, n, a.ncols()));
        }
        self.dim = n;
        if n == 0 {
            self.factored = true;
            return Ok(());
        }
        let factor = FullPivLu::new(a.as_ref());
        let u = factor.U();
        let pivots: Vec<f64> = (0..n).map(|i| u[(i, i)].abs()).collect();
        if let Some(i) = pivots.iter().position(|p| !p.is_finite()) {
            return Err(PcError::singular(Subspace::Global, format!("non-finite pivot at step {i}")));
        }
        let largest = pivots.iter().copied().fold(0.0, f64::max);
        let smallest = pivots.iter().copied().fold(f64::INFINITY, f64::min);
        let tol = self.pivot_tol.unwrap_or(n as f64 * f64::EPSILON);
        if largest == 0.0 || smallest <= tol * largest {
            return Err(PcError::singular(
                Subspace::Global,
                format!("{n}x{n} matrix has pivot {smallest:e} against largest pivot {largest:e}"),
            ));
        }
        self.factor = Some(factor);
        self.factored = true;
        Ok(())
    }

    /// Solve using the cached LU factorization.
    ///
    /// # Arguments
    /// * `b` - Right-hand side vector
    /// * `x` - Output vector (solution)
    pub fn solve_cached(&self, b: &[f64], x: &mut [f64]) -> Result<(), PcError> {
        if !self.factored {
            return Err(PcError::config(Subspace::Global, "LU solve requested before factorization"));
        }
        if b.len() != self.dim {
            return Err(PcError::mismatch(Subspace::Global, self.dim, b.len()));
        }
        if x.len() != self.dim {
            return Err(PcError::mismatch(Subspace::Global, self.dim, x.len()));
        }
        let Some(factor) = &self.factor else {
            return Ok(());
        };
        let n = b.len();
        x.copy_from_slice(b);
        let x_mat = MatMut::from_column_major_slice_mut(x, n, 1);
        factor.solve_in_place_with_conj(Conj::No, x_mat);
        if x.iter().any(|v| !v.is_finite()) {
            return Err(PcError::singular(Subspace::Global, "LU solve produced non-finite values"));
        }
        Ok(())
    }
}

impl LinearSolver<Mat<f64>, Vec<f64>> for LuSolver {
    type Error = PcError;
    type Scalar = f64;

    /// Solve Ax = b using LU factorization (full pivoting).
    ///
    /// # Returns
    /// * `Ok(SolveStats)` (always converged in 1 iteration)
    fn solve(
        &mut self,
        a: &Mat<f64>,
        pc: Option<&dyn Preconditioner<Mat<f64>, Vec<f64>>>,
        b: &Vec<f64>,
        x: &mut Vec<f64>,
    ) -> Result<SolveStats<f64>, PcError> {
        let _ = pc; // Direct solvers do not use preconditioner
        self.factor(a)?;
        x.resize(b.len(), 0.0);
        self.solve_cached(b, x)?;
        Ok(SolveStats { iterations: 1, final_residual: 0.0, converged: true })
    }
}

impl Default for LuSolver {
    fn default() -> Self {
        Self::new()
    }
}
