//! Core linear-algebra traits for schwarz-pc.

use faer::Mat;

/// Matrix–vector product: y ← A x.
pub trait MatVec<V> {
    /// Compute y = A · x.
    fn matvec(&self, x: &V, y: &mut V);
}

/// Inner products & norms.
pub trait InnerProduct<V> {
    /// Associated scalar type.
    type Scalar: Copy + PartialOrd + From<f64>;
    /// Compute dot(x, y).
    fn dot(&self, x: &V, y: &V) -> Self::Scalar;
    /// Compute ‖x‖₂.
    fn norm(&self, x: &V) -> Self::Scalar;
}

/// Matrix dimensions.
pub trait MatShape {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;
}

/// Extraction of the principal submatrix `R A Rᵀ` for a sorted set of global indices,
/// returned densely for direct factorization.
pub trait SubmatrixExtract {
    fn submatrix(&self, indices: &[usize]) -> Mat<f64>;
}

/// Column indices of the stored (structurally nonzero) entries of a row.
pub trait RowPattern {
    fn row_indices(&self, i: usize) -> Vec<usize>;
}

/// Everything a subspace preconditioner needs from the global operator.
pub trait Operator: MatVec<Vec<f64>> + MatShape + SubmatrixExtract + RowPattern + Send + Sync {}

impl<M> Operator for M where M: MatVec<Vec<f64>> + MatShape + SubmatrixExtract + RowPattern + Send + Sync {}
