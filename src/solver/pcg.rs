//! Preconditioned Conjugate Gradient (PCG) per Saad §9.2
//!
//! The outer iterative solver: it asks the preconditioner for `z = M⁻¹ r` once per
//! iteration. With an SPD operator and an SPD preconditioner the error decreases
//! monotonically in the energy norm; a non-positive curvature `pᵀAp` or a negative
//! `rᵀz` ratio signals that one of them is not SPD.

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::PcError;
use crate::preconditioner::Preconditioner;
use crate::solver::LinearSolver;
use crate::utils::convergence::{Convergence, SolveStats};

/// Norm monitored for convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgNormType {
    /// ‖z‖ = ‖M⁻¹ r‖
    Preconditioned,
    /// ‖r‖
    Unpreconditioned,
    /// √(rᵀ M⁻¹ r)
    Natural,
}

pub struct PcgSolver<T> {
    pub conv: Convergence<T>,
    pub norm_type: CgNormType,
    pub monitor: Option<Box<dyn FnMut(usize, T)>>,
    pub residual_history: Vec<T>,
}

impl<T: Copy + num_traits::Float> PcgSolver<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self {
            conv: Convergence { tol, max_iters },
            norm_type: CgNormType::Unpreconditioned,
            monitor: None,
            residual_history: Vec::new(),
        }
    }
    pub fn with_norm(mut self, norm_type: CgNormType) -> Self {
        self.norm_type = norm_type;
        self
    }
    pub fn with_monitor<F>(mut self, f: F) -> Self
    where
        F: FnMut(usize, T) + 'static,
    {
        self.monitor = Some(Box::new(f));
        self
    }
    pub fn clear_history(&mut self) {
        self.residual_history.clear();
    }

    fn record(&mut self, i: usize, res_norm: T) {
        if let Some(ref mut monitor) = self.monitor {
            monitor(i, res_norm);
        }
        self.residual_history.push(res_norm);
    }
}

fn precondition<M, V: Clone>(pc: Option<&dyn Preconditioner<M, V>>, r: &V, z: &mut V) -> Result<(), PcError> {
    match pc {
        Some(pc) => pc.apply(r, z),
        None => {
            z.clone_from(r);
            Ok(())
        }
    }
}

impl<M, V, T> LinearSolver<M, V> for PcgSolver<T>
where
    M: MatVec<V>,
    (): InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: num_traits::Float + From<f64>,
{
    type Error = PcError;
    type Scalar = T;

    fn solve(
        &mut self,
        a: &M,
        pc: Option<&dyn Preconditioner<M, V>>,
        b: &V,
        x: &mut V,
    ) -> Result<SolveStats<T>, PcError> {
        let n = b.as_ref().len();
        let ip = ();
        let mut ap = V::from(vec![T::zero(); n]);
        a.matvec(x, &mut ap);
        let mut r = V::from(b.as_ref().iter().zip(ap.as_ref()).map(|(&bi, &axi)| bi - axi).collect::<Vec<T>>());
        let mut z = V::from(vec![T::zero(); n]);
        precondition(pc, &r, &mut z)?;

        let norm_type = self.norm_type;
        let norm = |r: &V, z: &V, rz: T| match norm_type {
            CgNormType::Preconditioned => ip.norm(z),
            CgNormType::Unpreconditioned => ip.norm(r),
            CgNormType::Natural => rz.abs().sqrt(),
        };
        let mut rz = ip.dot(&r, &z);
        let res0 = norm(&r, &z, rz);
        self.record(0, res0);
        let mut stats = SolveStats { iterations: 0, final_residual: res0, converged: res0 == T::zero() };
        if stats.converged {
            return Ok(stats);
        }

        let mut p = z.clone();
        for i in 1..=self.conv.max_iters {
            a.matvec(&p, &mut ap);
            let p_ap = ip.dot(&p, &ap);
            if p_ap <= T::zero() {
                return Err(PcError::IndefiniteMatrix);
            }
            let alpha = rz / p_ap;
            for (xj, &pj) in x.as_mut().iter_mut().zip(p.as_ref()) {
                *xj = *xj + alpha * pj;
            }
            for (rj, &apj) in r.as_mut().iter_mut().zip(ap.as_ref()) {
                *rj = *rj - alpha * apj;
            }
            precondition(pc, &r, &mut z)?;
            let rz_new = ip.dot(&r, &z);
            let res_norm = norm(&r, &z, rz_new);
            self.record(i, res_norm);
            let (stop, s) = self.conv.check(res_norm, res0, i);
            stats = s;
            if stop {
                return Ok(stats);
            }
            let beta = rz_new / rz;
            if beta < T::zero() {
                return Err(PcError::IndefinitePreconditioner);
            }
            for (pj, &zj) in p.as_mut().iter_mut().zip(z.as_ref()) {
                *pj = zj + beta * *pj;
            }
            rz = rz_new;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct DenseMat {
        data: Vec<Vec<f64>>,
    }
    impl MatVec<Vec<f64>> for DenseMat {
        fn matvec(&self, x: &Vec<f64>, y: &mut Vec<f64>) {
            for (i, row) in self.data.iter().enumerate() {
                y[i] = row.iter().zip(x.iter()).map(|(a, b)| a * b).sum();
            }
        }
    }
    struct DiagonalPC(Vec<f64>);
    impl Preconditioner<DenseMat, Vec<f64>> for DiagonalPC {
        fn apply(&self, r: &Vec<f64>, z: &mut Vec<f64>) -> Result<(), PcError> {
            for ((zi, ri), di) in z.iter_mut().zip(r).zip(&self.0) {
                *zi = ri / di;
            }
            Ok(())
        }
    }

    #[test]
    fn pcg_with_and_without_preconditioner() {
        // SPD system: [[4,1],[1,3]] x = [1,2]
        let a = DenseMat { data: vec![vec![4.0, 1.0], vec![1.0, 3.0]] };
        let b = vec![1.0, 2.0];
        let expected = vec![0.09090909090909091, 0.6363636363636364];
        let tol = 1e-8;

        let mut x = vec![0.0, 0.0];
        let stats = PcgSolver::new(1e-10, 20).solve(&a, None, &b, &mut x).unwrap();
        assert!(stats.converged, "CG did not converge");
        for (xi, ei) in x.iter().zip(expected.iter()) {
            assert!((xi - ei).abs() < tol, "xi = {}, expected = {}", xi, ei);
        }

        let pc = DiagonalPC(vec![4.0, 3.0]);
        let mut x = vec![0.0, 0.0];
        let mut solver = PcgSolver::new(1e-10, 20).with_norm(CgNormType::Natural);
        let stats = solver.solve(&a, Some(&pc), &b, &mut x).unwrap();
        assert!(stats.converged, "PCG did not converge");
        assert!(stats.iterations <= 2);
        assert_eq!(solver.residual_history.len(), stats.iterations + 1);
        for (xi, ei) in x.iter().zip(expected.iter()) {
            assert!((xi - ei).abs() < tol, "xi = {}, expected = {}", xi, ei);
        }
    }

    #[test]
    fn zero_rhs_returns_immediately() {
        let a = DenseMat { data: vec![vec![2.0]] };
        let mut x = vec![0.0];
        let stats = PcgSolver::new(1e-10, 5).solve(&a, None, &vec![0.0], &mut x).unwrap();
        assert!(stats.converged);
        assert_eq!(stats.iterations, 0);
    }

    #[test]
    fn indefinite_operator_detected() {
        let a = DenseMat { data: vec![vec![1.0, 0.0], vec![0.0, -1.0]] };
        let mut x = vec![0.0, 0.0];
        let err = PcgSolver::new(1e-10, 5).solve(&a, None, &vec![0.0, 1.0], &mut x).unwrap_err();
        assert_eq!(err, PcError::IndefiniteMatrix);
    }

    #[test]
    fn indefinite_preconditioner_detected() {
        // M⁻¹ = diag(1, -1): rᵀz changes sign after the first step.
        let a = DenseMat { data: vec![vec![1.0, 0.0], vec![0.0, 1.0]] };
        let pc = DiagonalPC(vec![1.0, -1.0]);
        let mut x = vec![0.0, 0.0];
        let err = PcgSolver::new(1e-10, 5).solve(&a, Some(&pc), &vec![1.0, 0.5], &mut x).unwrap_err();
        assert_eq!(err, PcError::IndefinitePreconditioner);
    }
}
