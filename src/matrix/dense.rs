//! Dense operator API on top of Faer.
//!
//! Any `faer::Mat<f64>` can serve as the global operator: these impls give it the shape,
//! pattern and principal-submatrix access the subspace preconditioners rely on.

use crate::core::traits::{MatShape, RowPattern, SubmatrixExtract};
use faer::Mat;

impl SubmatrixExtract for Mat<f64> {
    fn submatrix(&self, indices: &[usize]) -> Mat<f64> {
        let n = indices.len();
        Mat::from_fn(n, n, |i, j| self[(indices[i], indices[j])])
    }
}

impl MatShape for Mat<f64> {
    fn nrows(&self) -> usize {
        self.nrows()
    }
    fn ncols(&self) -> usize {
        self.ncols()
    }
}

impl RowPattern for Mat<f64> {
    fn row_indices(&self, i: usize) -> Vec<usize> {
        (0..self.ncols()).filter(|&j| self[(i, j)] != 0.0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_submatrix_and_pattern() {
        let a = Mat::from_fn(3, 3, |i, j| if i == j { 2.0 } else if i + 1 == j { -1.0 } else { 0.0 });
        let sub = SubmatrixExtract::submatrix(&a, &[0, 2]);
        assert_eq!((sub.nrows(), sub.ncols()), (2, 2));
        assert_eq!(sub[(0, 0)], 2.0);
        assert_eq!(sub[(0, 1)], 0.0);
        assert_eq!(a.row_indices(0), vec![0, 1]);
        assert_eq!(a.row_indices(2), vec![2]);
    }
}
