//! Vertex-star patches from mesh topology.

use crate::error::{PcError, Subspace};
use crate::mesh::{DofLayout, MeshTopology};
use crate::partition::{Patch, PatchSet};
use log::{debug, warn};

/// One patch per mesh vertex: the DoFs of every cell incident to that vertex.
pub struct VertexPatchPartitioner<'a> {
    mesh: &'a MeshTopology,
    layout: &'a DofLayout,
    include_boundary_dofs: bool,
}

impl<'a> VertexPatchPartitioner<'a> {
    /// `include_boundary_dofs = false` drops DoFs constrained by essential boundary
    /// conditions from every patch.
    pub fn new(
        mesh: &'a MeshTopology,
        layout: &'a DofLayout,
        include_boundary_dofs: bool,
    ) -> Result<Self, PcError> {
        if mesh.num_cells() != layout.num_cells() {
            return Err(PcError::mismatch(Subspace::Global, mesh.num_cells(), layout.num_cells()));
        }
        Ok(Self { mesh, layout, include_boundary_dofs })
    }

    /// Lazily yields the patches in vertex order.
    ///
    /// A vertex without incident cells yields an error and ends the sequence. Vertices
    /// whose patch is empty after boundary exclusion are skipped. Repeated calls produce
    /// the same patches in the same order.
    pub fn patches(&self) -> PatchIter<'a> {
        PatchIter {
            layout: self.layout,
            incidence: self.mesh.vertex_cells(),
            include_boundary_dofs: self.include_boundary_dofs,
            vertex: 0,
            next_index: 0,
        }
    }

    /// Collect all patches and check that they cover every DoF that needs a correction.
    pub fn partition(&self) -> Result<PatchSet, PcError> {
        let patches = self.patches().collect::<Result<Vec<_>, _>>()?;
        let exempt = if self.include_boundary_dofs {
            vec![false; self.layout.num_dofs()]
        } else {
            self.layout.constrained().to_vec()
        };
        let set = PatchSet::with_exempt(self.layout.num_dofs(), patches, exempt)?;
        debug!(
            "vertex partition: {} patches over {} DoFs, largest patch {}",
            set.len(),
            set.num_dofs(),
            set.max_patch_len()
        );
        Ok(set)
    }
}

pub struct PatchIter<'a> {
    layout: &'a DofLayout,
    incidence: Vec<Vec<usize>>,
    include_boundary_dofs: bool,
    vertex: usize,
    next_index: usize,
}

impl Iterator for PatchIter<'_> {
    type Item = Result<Patch, PcError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.vertex < self.incidence.len() {
            let v = self.vertex;
            self.vertex += 1;
            let cells = &self.incidence[v];
            if cells.is_empty() {
                self.vertex = self.incidence.len();
                return Some(Err(PcError::config(
                    Subspace::Global,
                    format!("vertex {v} has no incident cells"),
                )));
            }
            let dofs: Vec<usize> = cells
                .iter()
                .flat_map(|&c| self.layout.cell_dofs(c).iter().copied())
                .filter(|&d| self.include_boundary_dofs || !self.layout.is_constrained(d))
                .collect();
            if dofs.is_empty() {
                warn!("patch around vertex {v} is empty after excluding boundary DoFs; skipped");
                continue;
            }
            let patch = Patch::around_vertex(self.next_index, v, dofs);
            self.next_index += 1;
            return Some(Ok(patch));
        }
        None
    }
}

impl std::iter::FusedIterator for PatchIter<'_> {}
