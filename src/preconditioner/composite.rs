//! Additive composition of subspace corrections.
//!
//! `CompositePreconditioner` owns an ordered list of named, weighted components (patch
//! smoothers, coarse corrections, or any other `Preconditioner`) and applies
//!
//! ```text
//! z = Σ_k w_k M_k⁻¹ r
//! ```
//!
//! Components are evaluated independently from the same residual (on the Rayon pool when
//! enabled) and summed serially in registration order.
//!
//! The assembled state sits behind an `RwLock`. Any number of threads may apply the
//! preconditioner at once; `update` replaces the operator and marks the state stale, and
//! the next apply rebuilds it under the write lock before proceeding. Setup and apply
//! therefore never interleave.

use crate::config::{
    CompositeType, PcConfig, PatchConfig, PatchPartition, SubspaceKind, validate_weight,
};
use crate::core::traits::Operator;
use crate::error::{PcError, Subspace};
use crate::matrix::CsrMatrix;
use crate::mesh::{DofLayout, MeshTopology};
use crate::partition::{AlgebraicPartitioner, PatchSet};
use crate::preconditioner::coarse::CoarseSpacePreconditioner;
use crate::preconditioner::patch::PatchPreconditioner;
use crate::preconditioner::{Preconditioner, first_error, map_ordered};
use log::{info, trace};
use std::sync::{Arc, PoisonError, RwLock};

/// Lifecycle of a composite preconditioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No valid assembled state: never set up, a setup failed, the component list changed,
    /// or a new operator is waiting for the next apply.
    Unassembled,
    /// Every component is set up for the current operator.
    Ready,
}

type BoxedComponent<M> = Box<dyn Preconditioner<M, Vec<f64>> + Send + Sync>;

struct Component<M> {
    name: String,
    weight: f64,
    pc: BoxedComponent<M>,
}

struct Inner<M> {
    components: Vec<Component<M>>,
    phase: Phase,
    pending: Option<Arc<M>>,
    dim: Option<usize>,
    generation: u64,
}

/// Discretization data the configured subspaces are built from. Which fields are needed
/// depends on the configuration: vertex patches need `mesh` and `layout`, explicit patches
/// need `patches`, a coarse space needs `prolongation` (and `coarse_operator` when it is
/// assembled rather than Galerkin).
#[derive(Debug, Clone, Copy, Default)]
pub struct Discretization<'a> {
    pub mesh: Option<&'a MeshTopology>,
    pub layout: Option<&'a DofLayout>,
    pub patches: Option<&'a PatchSet>,
    pub prolongation: Option<&'a CsrMatrix<f64>>,
    pub coarse_operator: Option<&'a CsrMatrix<f64>>,
}

pub struct CompositePreconditioner<M> {
    composite_type: CompositeType,
    parallel: bool,
    inner: RwLock<Inner<M>>,
}

impl<M: Operator> CompositePreconditioner<M> {
    /// An empty composite. Only additive combination is supported.
    pub fn new(composite_type: CompositeType) -> Result<Self, PcError> {
        if composite_type != CompositeType::Additive {
            return Err(PcError::config(
                Subspace::Global,
                format!("combination type {composite_type:?} is not supported; use additive"),
            ));
        }
        Ok(Self {
            composite_type,
            parallel: true,
            inner: RwLock::new(Inner {
                components: Vec::new(),
                phase: Phase::Unassembled,
                pending: None,
                dim: None,
                generation: 0,
            }),
        })
    }

    /// Evaluate components on the Rayon pool (default `true`). The result does not depend
    /// on this flag.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Register a component. Components are summed in registration order.
    ///
    /// Adding a component invalidates any assembled state.
    pub fn add_subspace<P>(&mut self, name: impl Into<String>, weight: f64, pc: P) -> Result<(), PcError>
    where
        P: Preconditioner<M, Vec<f64>> + Send + Sync + 'static,
    {
        let name = name.into();
        validate_weight(&name, weight)?;
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if inner.components.iter().any(|c| c.name == name) {
            return Err(PcError::config(Subspace::Global, format!("subspace name {name:?} is used twice")));
        }
        inner.components.push(Component { name, weight, pc: Box::new(pc) });
        inner.phase = Phase::Unassembled;
        Ok(())
    }

    /// Build every configured subspace from `disc`.
    pub fn from_config(config: &PcConfig, disc: &Discretization<'_>) -> Result<Self, PcError> {
        config.validate()?;
        let mut composite = Self::new(config.composite_type)?.with_parallel(config.parallel);
        for sub in &config.subspaces {
            match &sub.kind {
                SubspaceKind::Patch(patch_config) => {
                    let pc = build_patches(patch_config, disc)?.with_parallel(config.parallel);
                    composite.add_subspace(sub.name.as_str(), sub.weight, pc)?;
                }
                SubspaceKind::Coarse(coarse_config) => {
                    let prolongation = disc.prolongation.cloned().ok_or_else(|| {
                        PcError::config(Subspace::Coarse, "a coarse space needs a prolongation")
                    })?;
                    let pc = CoarseSpacePreconditioner::from_config(
                        prolongation,
                        disc.coarse_operator.cloned(),
                        coarse_config,
                    )?;
                    composite.add_subspace(sub.name.as_str(), sub.weight, pc)?;
                }
            }
        }
        Ok(composite)
    }

    pub fn composite_type(&self) -> CompositeType {
        self.composite_type
    }

    pub fn phase(&self) -> Phase {
        self.read().phase
    }

    /// Number of successful setups so far.
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Global dimension of the operator of the last successful setup.
    pub fn dim(&self) -> Option<usize> {
        self.read().dim
    }

    pub fn component_names(&self) -> Vec<String> {
        self.read().components.iter().map(|c| c.name.clone()).collect()
    }

    /// Replace the operator. The state becomes `Unassembled` and is rebuilt lazily by the
    /// next apply. Waits for in-flight applies to finish.
    pub fn update(&self, operator: Arc<M>) {
        let mut inner = self.write();
        inner.pending = Some(operator);
        inner.phase = Phase::Unassembled;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner<M>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner<M>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn setup_inner(inner: &mut Inner<M>, parallel: bool, a: &M) -> Result<(), PcError> {
        inner.phase = Phase::Unassembled;
        if inner.components.is_empty() {
            return Err(PcError::config(Subspace::Global, "no subspaces registered"));
        }
        if a.nrows() != a.ncols() {
            return Err(PcError::mismatch(Subspace::Global, a.nrows(), a.ncols()));
        }
        setup_components(&mut inner.components, parallel, a)?;
        inner.dim = Some(a.nrows());
        inner.generation += 1;
        inner.phase = Phase::Ready;
        info!(
            "composite setup #{}: {} subspaces ({}) on {} DoFs",
            inner.generation,
            inner.components.len(),
            inner.components.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", "),
            a.nrows()
        );
        Ok(())
    }

    fn apply_ready(&self, inner: &Inner<M>, r: &Vec<f64>, z: &mut [f64]) -> Result<(), PcError> {
        let n = inner.dim.unwrap_or(0);
        if r.len() != n {
            return Err(PcError::mismatch(Subspace::Global, n, r.len()));
        }
        if z.len() != n {
            return Err(PcError::mismatch(Subspace::Global, n, z.len()));
        }
        // z is only written once every component has succeeded.
        let corrections = first_error(map_ordered(&inner.components, self.parallel, |c| {
            let mut zk = vec![0.0; n];
            c.pc.apply(r, &mut zk).map(|()| zk)
        }))?;
        z.iter_mut().for_each(|zi| *zi = 0.0);
        for (component, correction) in inner.components.iter().zip(&corrections) {
            for (zi, ci) in z.iter_mut().zip(correction) {
                *zi += component.weight * ci;
            }
        }
        trace!("composite apply: {} corrections on {} DoFs", inner.components.len(), n);
        Ok(())
    }

    fn apply_slice(&self, r: &Vec<f64>, z: &mut [f64]) -> Result<(), PcError> {
        loop {
            {
                let inner = self.read();
                match (inner.phase, &inner.pending) {
                    (Phase::Ready, _) => return self.apply_ready(&inner, r, z),
                    (Phase::Unassembled, None) => {
                        return Err(PcError::config(Subspace::Global, "apply called before setup"));
                    }
                    (Phase::Unassembled, Some(_)) => {}
                }
            }
            let mut inner = self.write();
            // Another thread may have rebuilt the state while the lock was released.
            if inner.phase == Phase::Ready {
                continue;
            }
            let Some(operator) = inner.pending.clone() else {
                continue;
            };
            Self::setup_inner(&mut inner, self.parallel, &operator)?;
            inner.pending = None;
        }
    }
}

fn setup_components<M: Operator>(components: &mut [Component<M>], parallel: bool, a: &M) -> Result<(), PcError> {
    #[cfg(feature = "rayon")]
    {
        if parallel {
            use rayon::prelude::*;
            let results: Vec<Result<(), PcError>> = components.par_iter_mut().map(|c| c.pc.setup(a)).collect();
            return results.into_iter().collect();
        }
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;
    components.iter_mut().try_for_each(|c| c.pc.setup(a))
}

fn build_patches(config: &PatchConfig, disc: &Discretization<'_>) -> Result<PatchPreconditioner, PcError> {
    match config.partition {
        PatchPartition::Vertex => match (disc.mesh, disc.layout) {
            (Some(mesh), Some(layout)) => PatchPreconditioner::from_mesh(mesh, layout, config),
            _ => Err(PcError::config(Subspace::Global, "vertex patches need a mesh and a DoF layout")),
        },
        PatchPartition::Explicit => disc
            .patches
            .map(|patches| PatchPreconditioner::new(patches.clone(), config.sub_solver))
            .ok_or_else(|| PcError::config(Subspace::Global, "explicit patches were requested but none were supplied")),
        PatchPartition::Algebraic { blocks, overlap } => Ok(PatchPreconditioner::algebraic(
            AlgebraicPartitioner::new(blocks, overlap),
            config.sub_solver,
        )),
    }
}

impl<M: Operator> Preconditioner<M, Vec<f64>> for CompositePreconditioner<M> {
    fn apply(&self, r: &Vec<f64>, z: &mut Vec<f64>) -> Result<(), PcError> {
        self.apply_slice(r, z)
    }

    /// Set up every component for `a`, in registration order. On error the composite is
    /// left `Unassembled` and the error of the first failing component is returned.
    fn setup(&mut self, a: &M) -> Result<(), PcError> {
        let parallel = self.parallel;
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        inner.pending = None;
        Self::setup_inner(inner, parallel, a)
    }
}
