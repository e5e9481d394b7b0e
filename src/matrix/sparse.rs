//! Compressed sparse row storage for global operators and prolongations.
//!
//! `CsrMatrix` keeps validated raw CSR arrays (sorted, duplicate-free column indices per
//! row). The global operator of a finite-element discretization and the coarse-to-fine
//! prolongation are both stored this way.

use crate::core::traits::{MatShape, MatVec, RowPattern, SubmatrixExtract};
use crate::error::{PcError, Subspace};
use faer::Mat;
use num_traits::Float;

#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<T> {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
}

impl<T: Float> CsrMatrix<T> {
    /// Build a CSR from raw row‐ptr, col‐idx, and values.
    ///
    /// Column indices must be strictly increasing within each row.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, PcError> {
        let bad = |reason: String| Err(PcError::config(Subspace::Global, reason));
        if row_ptr.len() != nrows + 1 {
            return bad(format!("row_ptr has length {}, expected {}", row_ptr.len(), nrows + 1));
        }
        if row_ptr[0] != 0 || row_ptr[nrows] != col_idx.len() || col_idx.len() != values.len() {
            return bad(format!(
                "inconsistent CSR arrays: row_ptr ends at {}, {} column indices, {} values",
                row_ptr[nrows],
                col_idx.len(),
                values.len()
            ));
        }
        for i in 0..nrows {
            if row_ptr[i] > row_ptr[i + 1] {
                return bad(format!("row_ptr decreases at row {i}"));
            }
            if row_ptr[i + 1] > col_idx.len() {
                return bad(format!("row_ptr entry {} of row {i} exceeds {} entries", row_ptr[i + 1], col_idx.len()));
            }
            let cols = &col_idx[row_ptr[i]..row_ptr[i + 1]];
            if cols.windows(2).any(|w| w[0] >= w[1]) {
                return bad(format!("column indices of row {i} are not strictly increasing"));
            }
            if let Some(&j) = cols.last() {
                if j >= ncols {
                    return bad(format!("column index {j} in row {i} exceeds {ncols} columns"));
                }
            }
        }
        Ok(Self { nrows, ncols, row_ptr, col_idx, values })
    }

    /// Assemble from `(row, col, value)` triplets; duplicate positions are summed.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, T)],
    ) -> Result<Self, PcError> {
        if let Some(&(i, j, _)) = triplets.iter().find(|&&(i, j, _)| i >= nrows || j >= ncols) {
            return Err(PcError::config(
                Subspace::Global,
                format!("triplet ({i}, {j}) lies outside a {nrows}x{ncols} matrix"),
            ));
        }
        let mut sorted = triplets.to_vec();
        sorted.sort_by_key(|&(i, j, _)| (i, j));

        let mut row_ptr = vec![0; nrows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(sorted.len());
        let mut values: Vec<T> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;
        for (i, j, v) in sorted {
            if last == Some((i, j)) {
                if let Some(acc) = values.last_mut() {
                    *acc = *acc + v;
                }
                continue;
            }
            col_idx.push(j);
            values.push(v);
            row_ptr[i + 1] += 1;
            last = Some((i, j));
        }
        for i in 0..nrows {
            row_ptr[i + 1] += row_ptr[i];
        }
        Self::from_csr(nrows, ncols, row_ptr, col_idx, values)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Stored `(column, value)` pairs of row `i`, in increasing column order.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        self.col_idx[range.clone()].iter().copied().zip(self.values[range].iter().copied())
    }

    /// Entry `(i, j)`, zero when not stored.
    pub fn get(&self, i: usize, j: usize) -> T {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        match self.col_idx[range.clone()].binary_search(&j) {
            Ok(k) => self.values[range.start + k],
            Err(_) => T::zero(),
        }
    }

    /// Compute y = A * x.  `x.len() == ncols()`, `y.len() == nrows()`.
    pub fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols);
        assert_eq!(y.len(), self.nrows);
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = self.row(i).fold(T::zero(), |acc, (j, v)| acc + v * x[j]);
        }
    }

    /// Compute y = Aᵀ * x.  `x.len() == nrows()`, `y.len() == ncols()`.
    pub fn spmv_transpose(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.nrows);
        assert_eq!(y.len(), self.ncols);
        y.iter_mut().for_each(|yj| *yj = T::zero());
        for (i, &xi) in x.iter().enumerate() {
            for (j, v) in self.row(i) {
                y[j] = y[j] + v * xi;
            }
        }
    }

    pub fn transpose(&self) -> Self {
        let mut row_ptr = vec![0; self.ncols + 1];
        for &j in &self.col_idx {
            row_ptr[j + 1] += 1;
        }
        for j in 0..self.ncols {
            row_ptr[j + 1] += row_ptr[j];
        }
        let mut next = row_ptr.clone();
        let mut col_idx = vec![0; self.nnz()];
        let mut values = vec![T::zero(); self.nnz()];
        // Rows are visited in increasing order, so columns of the transpose stay sorted.
        for i in 0..self.nrows {
            for (j, v) in self.row(i) {
                col_idx[next[j]] = i;
                values[next[j]] = v;
                next[j] += 1;
            }
        }
        Self { nrows: self.ncols, ncols: self.nrows, row_ptr, col_idx, values }
    }

    /// Whether `|A_ij - A_ji| <= tol` for every stored entry.
    pub fn is_symmetric(&self, tol: T) -> bool {
        self.nrows == self.ncols
            && (0..self.nrows).all(|i| self.row(i).all(|(j, v)| (v - self.get(j, i)).abs() <= tol))
    }
}

impl CsrMatrix<f64> {
    pub fn to_dense(&self) -> Mat<f64> {
        Mat::from_fn(self.nrows, self.ncols, |i, j| self.get(i, j))
    }
}

#[cfg(feature = "rayon")]
impl<T: Float + Send + Sync> CsrMatrix<T> {
    /// Parallel SpMV using Rayon
    pub fn spmv_parallel(&self, x: &[T], y: &mut [T]) {
        use rayon::prelude::*;
        assert_eq!(x.len(), self.ncols);
        assert_eq!(y.len(), self.nrows);
        y.par_iter_mut().enumerate().for_each(|(i, yi)| {
            *yi = self.row(i).fold(T::zero(), |acc, (j, v)| acc + v * x[j]);
        });
    }
}

impl MatVec<Vec<f64>> for CsrMatrix<f64> {
    fn matvec(&self, x: &Vec<f64>, y: &mut Vec<f64>) {
        #[cfg(feature = "rayon")]
        self.spmv_parallel(x, y);
        #[cfg(not(feature = "rayon"))]
        self.spmv(x, y);
    }
}

impl<T> MatShape for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.nrows
    }
    fn ncols(&self) -> usize {
        self.ncols
    }
}

impl<T> RowPattern for CsrMatrix<T> {
    fn row_indices(&self, i: usize) -> Vec<usize> {
        self.col_idx[self.row_ptr[i]..self.row_ptr[i + 1]].to_vec()
    }
}

impl SubmatrixExtract for CsrMatrix<f64> {
    /// `indices` must be sorted ascending.
    fn submatrix(&self, indices: &[usize]) -> Mat<f64> {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        let n = indices.len();
        let mut data = vec![0.0; n * n];
        for (ii, &i) in indices.iter().enumerate() {
            for (j, v) in self.row(i) {
                if let Ok(jj) = indices.binary_search(&j) {
                    data[jj * n + ii] = v;
                }
            }
        }
        Mat::from_fn(n, n, |i, j| data[j * n + i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_spmv() {
        // 3×3 identity in CSR: row_ptr=[0,1,2,3], col_idx=[0,1,2], vals=[1,1,1]
        let m = CsrMatrix::from_csr(3, 3, vec![0, 1, 2, 3], vec![0, 1, 2], vec![1.0, 1.0, 1.0]).unwrap();
        let x = vec![2.0, 3.0, 5.0];
        let mut y = vec![0.0; 3];
        m.spmv(&x, &mut y);
        assert_eq!(y, x);
    }

    #[test]
    fn simple_pattern_and_transpose() {
        // 2×3 matrix [[1,2,0],[0,3,4]]
        let m = CsrMatrix::from_csr(2, 3, vec![0, 2, 4], vec![0, 1, 1, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut y = vec![0.0; 2];
        m.spmv(&[1.0, 1.0, 1.0], &mut y);
        assert_eq!(y, vec![3.0, 7.0]);

        let mut yt = vec![0.0; 3];
        m.spmv_transpose(&[1.0, 1.0], &mut yt);
        assert_eq!(yt, vec![1.0, 5.0, 4.0]);

        let t = m.transpose();
        assert_eq!((t.nrows(), t.ncols()), (3, 2));
        assert_eq!(t.get(1, 0), 2.0);
        assert_eq!(t.get(2, 1), 4.0);
        assert_eq!(t.get(2, 0), 0.0);
    }

    #[test]
    fn triplets_sum_duplicates() {
        let m = CsrMatrix::from_triplets(2, 2, &[(1, 1, 1.0), (0, 0, 2.0), (1, 1, 0.5), (0, 1, -1.0)]).unwrap();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.get(1, 1), 1.5);
        assert_eq!(m.row_indices(0), vec![0, 1]);
        assert!(!m.is_symmetric(1e-12));
    }

    #[test]
    fn rejects_malformed_arrays() {
        assert!(CsrMatrix::from_csr(2, 2, vec![0, 1], vec![0], vec![1.0]).is_err());
        assert!(CsrMatrix::from_csr(1, 2, vec![0, 2], vec![1, 0], vec![1.0, 1.0]).is_err());
        assert!(CsrMatrix::from_csr(1, 2, vec![0, 1], vec![2], vec![1.0]).is_err());
        assert!(CsrMatrix::from_csr(2, 2, vec![0, 5, 2], vec![0, 1], vec![1.0, 1.0]).is_err());
        assert!(CsrMatrix::<f64>::from_triplets(2, 2, &[(2, 0, 1.0)]).is_err());
    }

    #[test]
    fn submatrix_matches_dense() {
        let m = CsrMatrix::from_triplets(
            3,
            3,
            &[(0, 0, 4.0), (0, 1, -1.0), (1, 0, -1.0), (1, 1, 4.0), (1, 2, -1.0), (2, 1, -1.0), (2, 2, 4.0)],
        )
        .unwrap();
        let sub = m.submatrix(&[1, 2]);
        let dense = m.to_dense();
        for (ii, &i) in [1usize, 2].iter().enumerate() {
            for (jj, &j) in [1usize, 2].iter().enumerate() {
                assert_eq!(sub[(ii, jj)], dense[(i, j)]);
            }
        }
        assert!(m.is_symmetric(0.0));
    }
}
