//! Overlapping patches from the operator's sparsity graph.

use crate::core::traits::{MatShape, RowPattern};
use crate::error::{PcError, Subspace};
use crate::partition::PatchSet;
use crate::utils::graph::{contiguous_blocks, extract_adjacency, grow_by_layers};
use log::debug;

/// Partition rows into `blocks` contiguous blocks, then grow each block by `overlap`
/// layers of the symmetrized adjacency graph of the operator.
///
/// With `blocks` equal to the number of rows and `overlap = 1`, each patch is the graph star
/// of one DoF, which for piecewise-linear elements is the vertex patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgebraicPartitioner {
    pub blocks: usize,
    pub overlap: usize,
}

impl AlgebraicPartitioner {
    pub fn new(blocks: usize, overlap: usize) -> Self {
        Self { blocks, overlap }
    }

    pub fn partition<M: MatShape + RowPattern>(&self, a: &M) -> Result<PatchSet, PcError> {
        if self.blocks == 0 {
            return Err(PcError::config(Subspace::Global, "algebraic partition needs at least one block"));
        }
        let n = a.nrows();
        if a.ncols() != n {
            return Err(PcError::mismatch(Subspace::Global, n, a.ncols()));
        }
        let adj = extract_adjacency(n, |i| a.row_indices(i));
        let sets: Vec<Vec<usize>> = contiguous_blocks(n, self.blocks)
            .into_iter()
            .filter(|block| !block.is_empty())
            .map(|block| grow_by_layers(&block, &adj, self.overlap))
            .collect();
        let set = PatchSet::from_index_sets(n, sets)?;
        debug!(
            "algebraic partition: {} patches (overlap {}) over {} DoFs, largest patch {}",
            set.len(),
            self.overlap,
            n,
            set.max_patch_len()
        );
        Ok(set)
    }
}
