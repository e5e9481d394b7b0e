//! Mesh connectivity and finite-element DoF layouts.
//!
//! These types carry exactly what the patch partitioner and the coarse-space prolongation
//! need from a discretization: which vertices each cell touches, which global DoFs each
//! cell owns, and which DoFs are constrained by essential boundary conditions.

use crate::error::{PcError, Subspace};
use crate::matrix::CsrMatrix;

/// Cell-to-vertex connectivity of a mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshTopology {
    num_vertices: usize,
    cells: Vec<Vec<usize>>,
}

impl MeshTopology {
    pub fn new(num_vertices: usize, cells: Vec<Vec<usize>>) -> Result<Self, PcError> {
        for (c, cell) in cells.iter().enumerate() {
            if let Some(&v) = cell.iter().find(|&&v| v >= num_vertices) {
                return Err(PcError::config(
                    Subspace::Global,
                    format!("cell {c} references vertex {v}, but the mesh has {num_vertices} vertices"),
                ));
            }
        }
        Ok(Self { num_vertices, cells })
    }

    /// Uniform 1-D mesh with `ncells` cells. Cell `c` joins vertices `c` and `c + 1`; on a
    /// periodic mesh the last cell wraps around to vertex 0 and there are `ncells` vertices.
    pub fn interval(ncells: usize, periodic: bool) -> Self {
        let num_vertices = if periodic { ncells } else { ncells + 1 };
        let cells = (0..ncells)
            .map(|c| vec![c, (c + 1) % num_vertices.max(1)])
            .collect();
        Self { num_vertices, cells }
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[Vec<usize>] {
        &self.cells
    }

    /// For each vertex, the cells incident to it in increasing order.
    pub fn vertex_cells(&self) -> Vec<Vec<usize>> {
        let mut incidence = vec![Vec::new(); self.num_vertices];
        for (c, cell) in self.cells.iter().enumerate() {
            for &v in cell {
                if incidence[v].last() != Some(&c) {
                    incidence[v].push(c);
                }
            }
        }
        incidence
    }
}

/// Cell-to-DoF map of a finite-element space, plus its constrained DoFs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DofLayout {
    num_dofs: usize,
    cell_dofs: Vec<Vec<usize>>,
    constrained: Vec<bool>,
}

impl DofLayout {
    pub fn new(num_dofs: usize, cell_dofs: Vec<Vec<usize>>) -> Result<Self, PcError> {
        for (c, dofs) in cell_dofs.iter().enumerate() {
            if let Some(&d) = dofs.iter().find(|&&d| d >= num_dofs) {
                return Err(PcError::config(
                    Subspace::Global,
                    format!("cell {c} references DoF {d}, but the space has {num_dofs} DoFs"),
                ));
            }
        }
        Ok(Self { num_dofs, cell_dofs, constrained: vec![false; num_dofs] })
    }

    /// Mark DoFs as constrained by essential boundary conditions.
    pub fn with_constrained(mut self, dofs: &[usize]) -> Result<Self, PcError> {
        for &d in dofs {
            let flag = self.constrained.get_mut(d).ok_or_else(|| {
                PcError::config(Subspace::Global, format!("constrained DoF {d} out of range"))
            })?;
            *flag = true;
        }
        Ok(self)
    }

    /// Continuous piecewise-linear Lagrange space: one DoF per vertex, numbered like the vertices.
    pub fn lagrange_p1(mesh: &MeshTopology) -> Self {
        Self {
            num_dofs: mesh.num_vertices(),
            cell_dofs: mesh.cells().to_vec(),
            constrained: vec![false; mesh.num_vertices()],
        }
    }

    /// Continuous piecewise-quadratic Lagrange space on an interval mesh.
    ///
    /// Vertex DoFs come first (numbered like the vertices), followed by one midpoint DoF per
    /// cell: cell `c` owns `[v0, v1, num_vertices + c]`.
    pub fn lagrange_p2_interval(mesh: &MeshTopology) -> Self {
        let nv = mesh.num_vertices();
        let cell_dofs = mesh
            .cells()
            .iter()
            .enumerate()
            .map(|(c, cell)| {
                let mut dofs = cell.clone();
                dofs.push(nv + c);
                dofs
            })
            .collect();
        let num_dofs = nv + mesh.num_cells();
        Self { num_dofs, cell_dofs, constrained: vec![false; num_dofs] }
    }

    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    pub fn num_cells(&self) -> usize {
        self.cell_dofs.len()
    }

    pub fn cell_dofs(&self, cell: usize) -> &[usize] {
        &self.cell_dofs[cell]
    }

    pub fn is_constrained(&self, dof: usize) -> bool {
        self.constrained[dof]
    }

    pub fn constrained(&self) -> &[bool] {
        &self.constrained
    }
}

/// Boundary vertices of a non-periodic interval mesh: the two endpoints.
pub fn interval_boundary_vertices(mesh: &MeshTopology) -> Vec<usize> {
    let incidence = mesh.vertex_cells();
    (0..mesh.num_vertices()).filter(|&v| incidence[v].len() == 1).collect()
}

/// Prolongation from the P1 space into the P2 space on the same interval mesh.
///
/// Each P1 hat function is interpolated at the P2 nodes: it is 1 at its own vertex DoF and
/// 1/2 at the midpoint DoF of every cell it touches.
pub fn p1_in_p2_interval_prolongation(mesh: &MeshTopology) -> Result<CsrMatrix<f64>, PcError> {
    let nv = mesh.num_vertices();
    let mut triplets: Vec<(usize, usize, f64)> = (0..nv).map(|v| (v, v, 1.0)).collect();
    for (c, cell) in mesh.cells().iter().enumerate() {
        if cell.len() != 2 {
            return Err(PcError::config(
                Subspace::Coarse,
                format!("cell {c} has {} vertices; interval cells have 2", cell.len()),
            ));
        }
        for &v in cell {
            triplets.push((nv + c, v, 0.5));
        }
    }
    CsrMatrix::from_triplets(nv + mesh.num_cells(), nv, &triplets)
}
