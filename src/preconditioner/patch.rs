//! Additive patch (overlapping Schwarz) correction.
//!
//! For a residual r the patch correction is
//!
//! ```text
//! z = Σ_i R_iᵀ A_i⁻¹ R_i r,   A_i = R_i A R_iᵀ
//! ```
//!
//! where `R_i` restricts a global vector to the DoFs of patch i. DoFs the patch set marks
//! exempt (constrained by essential boundary conditions) take `z_d = r_d`. Local systems are
//! factorized once at setup. The per-patch solves are independent and may run on the
//! Rayon pool; their prolongations are always summed serially in patch order, so the
//! result is the same with and without threads.

use crate::config::{PatchConfig, SubSolverKind};
use crate::core::traits::Operator;
use crate::error::{PcError, Subspace};
use crate::mesh::{DofLayout, MeshTopology};
use crate::partition::{AlgebraicPartitioner, Patch, PatchSet, VertexPatchPartitioner};
use crate::preconditioner::local::LocalSolver;
use crate::preconditioner::{Preconditioner, first_error, map_ordered};
use log::{debug, trace};

/// Where the patches come from.
#[derive(Debug, Clone)]
pub enum PatchSource {
    /// Patches fixed at construction (from the mesh or supplied by the caller).
    Fixed(PatchSet),
    /// Patches rebuilt from the operator's sparsity graph at every setup.
    Algebraic(AlgebraicPartitioner),
}

struct PatchState {
    patches: PatchSet,
    solvers: Vec<LocalSolver>,
}

pub struct PatchPreconditioner {
    source: PatchSource,
    sub_solver: SubSolverKind,
    parallel: bool,
    state: Option<PatchState>,
}

impl PatchPreconditioner {
    pub fn new(patches: PatchSet, sub_solver: SubSolverKind) -> Self {
        Self { source: PatchSource::Fixed(patches), sub_solver, parallel: true, state: None }
    }

    pub fn algebraic(partitioner: AlgebraicPartitioner, sub_solver: SubSolverKind) -> Self {
        Self { source: PatchSource::Algebraic(partitioner), sub_solver, parallel: true, state: None }
    }

    /// Vertex-star patches of `mesh` over the DoFs of `layout`.
    pub fn from_mesh(mesh: &MeshTopology, layout: &DofLayout, config: &PatchConfig) -> Result<Self, PcError> {
        let patches = VertexPatchPartitioner::new(mesh, layout, config.include_boundary_dofs)?.partition()?;
        Ok(Self::new(patches, config.sub_solver))
    }

    /// Solve patches on the Rayon pool (default `true`).
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn source(&self) -> &PatchSource {
        &self.source
    }

    pub fn sub_solver(&self) -> SubSolverKind {
        self.sub_solver
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_some()
    }

    /// The patches in use: the fixed set, or the set built at the last setup.
    pub fn patch_set(&self) -> Option<&PatchSet> {
        match (&self.state, &self.source) {
            (Some(state), _) => Some(&state.patches),
            (None, PatchSource::Fixed(patches)) => Some(patches),
            (None, PatchSource::Algebraic(_)) => None,
        }
    }

    /// Extract and factorize every local patch matrix of `a`.
    ///
    /// On error the previous state is discarded and the error names the first failing
    /// patch in patch order.
    pub fn setup_with<M: Operator>(&mut self, a: &M) -> Result<(), PcError> {
        self.state = None;
        let patches = match &self.source {
            PatchSource::Fixed(patches) => {
                if a.nrows() != patches.num_dofs() || a.ncols() != patches.num_dofs() {
                    return Err(PcError::mismatch(Subspace::Global, patches.num_dofs(), a.nrows()));
                }
                patches.clone()
            }
            PatchSource::Algebraic(partitioner) => partitioner.partition(a)?,
        };
        let kind = self.sub_solver;
        let solvers = first_error(map_ordered(patches.patches(), self.parallel, |patch| {
            LocalSolver::for_patch(a, patch, kind)
        }))?;
        debug!(
            "patch setup: {} patches, {:?} local solves, largest patch {}",
            solvers.len(),
            kind,
            patches.max_patch_len()
        );
        self.state = Some(PatchState { patches, solvers });
        Ok(())
    }

    /// Local corrections `A_i⁻¹ R_i r`, one per patch in patch order.
    pub fn patch_corrections(&self, r: &[f64]) -> Result<Vec<Vec<f64>>, PcError> {
        let state = self.ready_state()?;
        if r.len() != state.patches.num_dofs() {
            return Err(PcError::mismatch(Subspace::Global, state.patches.num_dofs(), r.len()));
        }
        let work: Vec<(&LocalSolver, &Patch)> =
            state.solvers.iter().zip(state.patches.iter()).collect();
        first_error(map_ordered(&work, self.parallel, |(solver, patch)| solver.apply(&patch.restrict(r))))
    }

    fn ready_state(&self) -> Result<&PatchState, PcError> {
        self.state
            .as_ref()
            .ok_or_else(|| PcError::config(Subspace::Global, "patch preconditioner applied before setup"))
    }

    fn apply_slice(&self, r: &[f64], z: &mut [f64]) -> Result<(), PcError> {
        if z.len() != r.len() {
            return Err(PcError::mismatch(Subspace::Global, r.len(), z.len()));
        }
        let corrections = self.patch_corrections(r)?;
        let state = self.ready_state()?;
        z.iter_mut().for_each(|zi| *zi = 0.0);
        for (patch, local) in state.patches.iter().zip(&corrections) {
            patch.add_prolonged(local, z);
        }
        for d in state.patches.exempt_dofs() {
            z[d] = r[d];
        }
        trace!("patch apply: {} corrections summed", corrections.len());
        Ok(())
    }
}

impl<M: Operator> Preconditioner<M, Vec<f64>> for PatchPreconditioner {
    fn apply(&self, r: &Vec<f64>, z: &mut Vec<f64>) -> Result<(), PcError> {
        self.apply_slice(r, z)
    }

    fn setup(&mut self, a: &M) -> Result<(), PcError> {
        self.setup_with(a)
    }
}
