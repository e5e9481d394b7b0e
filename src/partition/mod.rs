//! Overlapping patches of degrees of freedom.
//!
//! A [`Patch`] is a sorted set of global DoFs; its position in the set is its local
//! numbering, so `dofs()[k]` is the global DoF of local index `k` and the restriction
//! `R_patch` is the 0/1 selection of those rows. A [`PatchSet`] is a numbered collection of
//! patches over a fixed DoF count whose union is checked to cover every DoF. DoFs fixed by
//! essential boundary conditions may instead be marked exempt: they stay out of every patch
//! and the patch correction acts on them as the identity.
//!
//! Patches are produced either from mesh topology ([`VertexPatchPartitioner`], one patch per
//! vertex) or from the operator's sparsity graph ([`AlgebraicPartitioner`]).

use crate::error::{PcError, Subspace};

pub mod algebraic;
pub mod vertex;

pub use algebraic::AlgebraicPartitioner;
pub use vertex::{PatchIter, VertexPatchPartitioner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    index: usize,
    vertex: Option<usize>,
    dofs: Vec<usize>,
}

impl Patch {
    /// A patch over `dofs`; duplicates are removed and the set is sorted.
    pub fn new(index: usize, mut dofs: Vec<usize>) -> Self {
        dofs.sort_unstable();
        dofs.dedup();
        Self { index, vertex: None, dofs }
    }

    /// A patch built around mesh vertex `vertex`.
    pub fn around_vertex(index: usize, vertex: usize, dofs: Vec<usize>) -> Self {
        Self { vertex: Some(vertex), ..Self::new(index, dofs) }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The mesh vertex this patch was built around, if it came from mesh topology.
    pub fn vertex(&self) -> Option<usize> {
        self.vertex
    }

    /// Global DoFs in local order.
    pub fn dofs(&self) -> &[usize] {
        &self.dofs
    }

    pub fn len(&self) -> usize {
        self.dofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dofs.is_empty()
    }

    /// Local index of global DoF `dof`, if the patch contains it.
    pub fn local_index(&self, dof: usize) -> Option<usize> {
        self.dofs.binary_search(&dof).ok()
    }

    /// `R_patch · global`.
    pub fn restrict(&self, global: &[f64]) -> Vec<f64> {
        self.dofs.iter().map(|&d| global[d]).collect()
    }

    /// `global += R_patchᵀ · local`.
    pub fn add_prolonged(&self, local: &[f64], global: &mut [f64]) {
        debug_assert_eq!(local.len(), self.dofs.len());
        for (&d, &v) in self.dofs.iter().zip(local) {
            global[d] += v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSet {
    num_dofs: usize,
    patches: Vec<Patch>,
    exempt: Vec<bool>,
}

impl PatchSet {
    /// Patches whose union must cover all `num_dofs` DoFs.
    pub fn new(num_dofs: usize, patches: Vec<Patch>) -> Result<Self, PcError> {
        Self::with_exempt(num_dofs, patches, vec![false; num_dofs])
    }

    /// Patches whose union must cover every DoF not flagged in `exempt`.
    ///
    /// Exempt DoFs (those fixed by essential boundary conditions) must not appear in any
    /// patch. Patches are renumbered by position.
    pub fn with_exempt(num_dofs: usize, mut patches: Vec<Patch>, exempt: Vec<bool>) -> Result<Self, PcError> {
        if exempt.len() != num_dofs {
            return Err(PcError::mismatch(Subspace::Global, num_dofs, exempt.len()));
        }
        let mut covered = vec![false; num_dofs];
        for (k, patch) in patches.iter_mut().enumerate() {
            patch.index = k;
            if let Some(&d) = patch.dofs.last() {
                if d >= num_dofs {
                    return Err(PcError::config(
                        Subspace::Patch(k),
                        format!("DoF {d} is out of range for {num_dofs} DoFs"),
                    ));
                }
            }
            for &d in &patch.dofs {
                if exempt[d] {
                    return Err(PcError::config(
                        Subspace::Patch(k),
                        format!("DoF {d} is constrained and cannot belong to a patch"),
                    ));
                }
                covered[d] = true;
            }
        }
        if let Some(d) = (0..num_dofs).find(|&d| !covered[d] && !exempt[d]) {
            return Err(PcError::config(
                Subspace::Global,
                format!("DoF {d} is not covered by any patch"),
            ));
        }
        Ok(Self { num_dofs, patches, exempt })
    }

    /// Patches from plain index sets, numbered in the given order.
    pub fn from_index_sets(num_dofs: usize, sets: Vec<Vec<usize>>) -> Result<Self, PcError> {
        let patches = sets.into_iter().enumerate().map(|(k, dofs)| Patch::new(k, dofs)).collect();
        Self::new(num_dofs, patches)
    }

    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Patch> {
        self.patches.iter()
    }

    pub fn is_exempt(&self, dof: usize) -> bool {
        self.exempt[dof]
    }

    /// Exempt DoFs in increasing order.
    pub fn exempt_dofs(&self) -> impl Iterator<Item = usize> + '_ {
        self.exempt.iter().enumerate().filter_map(|(d, &e)| e.then_some(d))
    }

    /// Number of patches containing each DoF.
    pub fn multiplicity(&self) -> Vec<usize> {
        let mut count = vec![0; self.num_dofs];
        for patch in &self.patches {
            for &d in &patch.dofs {
                count[d] += 1;
            }
        }
        count
    }

    /// Size of the largest patch.
    pub fn max_patch_len(&self) -> usize {
        self.patches.iter().map(Patch::len).max().unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a PatchSet {
    type Item = &'a Patch;
    type IntoIter = std::slice::Iter<'a, Patch>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
