//! Coarse-space correction.
//!
//! Given a prolongation `P` (fine × coarse) the coarse correction is
//! `z = P A_c⁻¹ Pᵀ r`. The coarse operator is either the Galerkin product `Pᵀ A P`, formed
//! at setup one column at a time from operator applications, or a matrix assembled
//! directly on the coarse discretization.

use crate::config::{CoarseConfig, CoarseOperatorKind, SubSolverKind};
use crate::core::traits::{MatShape, MatVec, Operator};
use crate::error::{PcError, Subspace};
use crate::matrix::CsrMatrix;
use crate::preconditioner::Preconditioner;
use crate::preconditioner::local::LocalSolver;
use faer::Mat;
use log::{debug, trace};

#[derive(Debug, Clone)]
pub enum CoarseOperator {
    /// `Pᵀ A P`, recomputed at every setup.
    Galerkin,
    /// Fixed coarse matrix; must be `n_coarse × n_coarse`.
    Assembled(CsrMatrix<f64>),
}

pub struct CoarseSpacePreconditioner {
    prolongation: CsrMatrix<f64>,
    operator: CoarseOperator,
    sub_solver: SubSolverKind,
    solver: Option<LocalSolver>,
}

impl CoarseSpacePreconditioner {
    /// Coarse correction with a Galerkin coarse operator.
    ///
    /// Every column of `prolongation` must have at least one nonzero entry, otherwise the
    /// coarse operator is singular for every fine operator.
    pub fn galerkin(prolongation: CsrMatrix<f64>, sub_solver: SubSolverKind) -> Result<Self, PcError> {
        check_column_support(&prolongation)?;
        Ok(Self { prolongation, operator: CoarseOperator::Galerkin, sub_solver, solver: None })
    }

    /// Coarse correction with a directly assembled coarse operator.
    pub fn assembled(
        prolongation: CsrMatrix<f64>,
        coarse: CsrMatrix<f64>,
        sub_solver: SubSolverKind,
    ) -> Result<Self, PcError> {
        check_column_support(&prolongation)?;
        let nc = prolongation.ncols();
        if coarse.nrows() != nc {
            return Err(PcError::mismatch(Subspace::Coarse, nc, coarse.nrows()));
        }
        if coarse.ncols() != nc {
            return Err(PcError::mismatch(Subspace::Coarse, nc, coarse.ncols()));
        }
        Ok(Self { prolongation, operator: CoarseOperator::Assembled(coarse), sub_solver, solver: None })
    }

    pub fn from_config(
        prolongation: CsrMatrix<f64>,
        coarse: Option<CsrMatrix<f64>>,
        config: &CoarseConfig,
    ) -> Result<Self, PcError> {
        match (config.operator, coarse) {
            (CoarseOperatorKind::Galerkin, _) => Self::galerkin(prolongation, config.sub_solver),
            (CoarseOperatorKind::Assembled, Some(coarse)) => Self::assembled(prolongation, coarse, config.sub_solver),
            (CoarseOperatorKind::Assembled, None) => Err(PcError::config(
                Subspace::Coarse,
                "an assembled coarse operator was requested but none was supplied",
            )),
        }
    }

    pub fn fine_dim(&self) -> usize {
        self.prolongation.nrows()
    }

    pub fn coarse_dim(&self) -> usize {
        self.prolongation.ncols()
    }

    pub fn prolongation(&self) -> &CsrMatrix<f64> {
        &self.prolongation
    }

    pub fn operator(&self) -> &CoarseOperator {
        &self.operator
    }

    pub fn is_ready(&self) -> bool {
        self.solver.is_some()
    }

    /// The dense coarse matrix for fine operator `a`.
    pub fn coarse_matrix<M: MatVec<Vec<f64>> + MatShape>(&self, a: &M) -> Result<Mat<f64>, PcError> {
        let (nf, nc) = (self.fine_dim(), self.coarse_dim());
        if a.nrows() != nf || a.ncols() != nf {
            return Err(PcError::mismatch(Subspace::Coarse, nf, a.nrows()));
        }
        match &self.operator {
            CoarseOperator::Assembled(coarse) => Ok(coarse.to_dense()),
            CoarseOperator::Galerkin => {
                let pt = self.prolongation.transpose();
                let mut p_col = vec![0.0; nf];
                let mut ap_col = vec![0.0; nf];
                let mut columns = Vec::with_capacity(nc);
                for j in 0..nc {
                    // Column j of P is row j of Pᵀ.
                    p_col.iter_mut().for_each(|v| *v = 0.0);
                    for (i, v) in pt.row(j) {
                        p_col[i] = v;
                    }
                    a.matvec(&p_col, &mut ap_col);
                    let mut col = vec![0.0; nc];
                    self.prolongation.spmv_transpose(&ap_col, &mut col);
                    columns.push(col);
                }
                Ok(Mat::from_fn(nc, nc, |i, j| columns[j][i]))
            }
        }
    }

    /// Form and factorize the coarse operator for `a`.
    pub fn setup_with<M: MatVec<Vec<f64>> + MatShape>(&mut self, a: &M) -> Result<(), PcError> {
        self.solver = None;
        let a_coarse = self.coarse_matrix(a)?;
        self.solver = Some(LocalSolver::from_matrix(&a_coarse, self.sub_solver, Subspace::Coarse)?);
        debug!(
            "coarse setup: {} coarse DoFs for {} fine DoFs, {:?} operator, {:?} solve",
            self.coarse_dim(),
            self.fine_dim(),
            self.operator_kind(),
            self.sub_solver
        );
        Ok(())
    }

    fn operator_kind(&self) -> CoarseOperatorKind {
        match self.operator {
            CoarseOperator::Galerkin => CoarseOperatorKind::Galerkin,
            CoarseOperator::Assembled(_) => CoarseOperatorKind::Assembled,
        }
    }

    fn apply_slice(&self, r: &[f64], z: &mut [f64]) -> Result<(), PcError> {
        let solver = self
            .solver
            .as_ref()
            .ok_or_else(|| PcError::config(Subspace::Coarse, "coarse correction applied before setup"))?;
        let nf = self.fine_dim();
        if r.len() != nf {
            return Err(PcError::mismatch(Subspace::Coarse, nf, r.len()));
        }
        if z.len() != nf {
            return Err(PcError::mismatch(Subspace::Coarse, nf, z.len()));
        }
        let mut r_coarse = vec![0.0; self.coarse_dim()];
        self.prolongation.spmv_transpose(r, &mut r_coarse);
        let y = solver.apply(&r_coarse)?;
        self.prolongation.spmv(&y, z);
        trace!("coarse apply: {} coarse DoFs", y.len());
        Ok(())
    }
}

impl<M: Operator> Preconditioner<M, Vec<f64>> for CoarseSpacePreconditioner {
    fn apply(&self, r: &Vec<f64>, z: &mut Vec<f64>) -> Result<(), PcError> {
        self.apply_slice(r, z)
    }

    fn setup(&mut self, a: &M) -> Result<(), PcError> {
        self.setup_with(a)
    }
}

fn check_column_support(p: &CsrMatrix<f64>) -> Result<(), PcError> {
    let mut supported = vec![false; p.ncols()];
    for i in 0..p.nrows() {
        for (j, v) in p.row(i) {
            if v != 0.0 {
                supported[j] = true;
            }
        }
    }
    match supported.iter().position(|&s| !s) {
        Some(j) => Err(PcError::config(Subspace::Coarse, format!("coarse basis function {j} has no support"))),
        None => Ok(()),
    }
}

/// Prolongation of the single constant coarse function: an `n × 1` matrix with every
/// entry equal to `scale`.
pub fn constant_prolongation(n: usize, scale: f64) -> Result<CsrMatrix<f64>, PcError> {
    CsrMatrix::from_csr(n, 1, (0..=n).collect(), vec![0; n], vec![scale; n])
}
