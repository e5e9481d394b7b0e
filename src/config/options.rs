//! Strongly typed preconditioner configuration.
//!
//! `PcConfig` describes a composite preconditioner: how its subspace corrections are
//! combined and, for each named subspace, what kind it is and how its local systems are
//! solved. Every field has a default, so a configuration can be written as a partial JSON
//! (or any serde format) document. There is no global option database: each preconditioner
//! owns the configuration it was built from.

use crate::error::{PcError, Subspace};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How subspace corrections are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeType {
    /// All corrections are computed from the same residual and summed.
    #[default]
    Additive,
    /// Sequential application. Recognized so that configurations naming it are rejected
    /// with a clear error rather than misread.
    Multiplicative,
}

/// How each local (patch or coarse) system is solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubSolverKind {
    /// Exact solve with a dense full-pivot LU factorization.
    #[default]
    Direct,
    /// Approximate solve with the inverse diagonal of the local matrix.
    Jacobi,
}

/// Where the patches of a patch subspace come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PatchPartition {
    /// One patch per mesh vertex (needs a mesh and a DoF layout).
    #[default]
    Vertex,
    /// A patch set supplied with the discretization.
    Explicit,
    /// Contiguous row blocks grown by `overlap` layers of the operator graph, built at setup.
    Algebraic { blocks: usize, overlap: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    /// Keep DoFs constrained by essential boundary conditions in the patches.
    pub include_boundary_dofs: bool,
    pub sub_solver: SubSolverKind,
    pub partition: PatchPartition,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            include_boundary_dofs: true,
            sub_solver: SubSolverKind::Direct,
            partition: PatchPartition::Vertex,
        }
    }
}

/// How the coarse operator is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoarseOperatorKind {
    /// `A_coarse = Pᵀ A P`.
    #[default]
    Galerkin,
    /// A coarse matrix assembled directly on the coarse discretization.
    Assembled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoarseConfig {
    pub sub_solver: SubSolverKind,
    pub operator: CoarseOperatorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubspaceKind {
    Patch(PatchConfig),
    Coarse(CoarseConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubspaceConfig {
    pub name: String,
    #[serde(default = "unit_weight")]
    pub weight: f64,
    pub kind: SubspaceKind,
}

fn unit_weight() -> f64 {
    1.0
}

impl SubspaceConfig {
    pub fn patch(name: impl Into<String>, config: PatchConfig) -> Self {
        Self { name: name.into(), weight: 1.0, kind: SubspaceKind::Patch(config) }
    }

    pub fn coarse(name: impl Into<String>, config: CoarseConfig) -> Self {
        Self { name: name.into(), weight: 1.0, kind: SubspaceKind::Coarse(config) }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// Configuration of a composite subspace-correction preconditioner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcConfig {
    pub composite_type: CompositeType,
    /// Run independent subspace solves on the Rayon pool (no effect without the `rayon`
    /// feature). Results do not depend on this flag.
    pub parallel: bool,
    pub subspaces: Vec<SubspaceConfig>,
}

impl Default for PcConfig {
    fn default() -> Self {
        Self {
            composite_type: CompositeType::Additive,
            parallel: true,
            subspaces: Vec::new(),
        }
    }
}

impl PcConfig {
    /// Vertex patches with exact local solves plus a Galerkin coarse space with an exact
    /// coarse solve, combined additively.
    pub fn two_level() -> Self {
        Self {
            subspaces: vec![
                SubspaceConfig::patch("patch", PatchConfig::default()),
                SubspaceConfig::coarse("coarse", CoarseConfig::default()),
            ],
            ..Self::default()
        }
    }

    /// Reject option combinations no preconditioner can be built from.
    pub fn validate(&self) -> Result<(), PcError> {
        let bad = |reason: String| Err(PcError::config(Subspace::Global, reason));
        if self.composite_type != CompositeType::Additive {
            return bad(format!("combination type {:?} is not supported; use additive", self.composite_type));
        }
        if self.subspaces.is_empty() {
            return bad("no subspaces configured".to_string());
        }
        let mut names = HashSet::new();
        for sub in &self.subspaces {
            if !names.insert(sub.name.as_str()) {
                return bad(format!("subspace name {:?} is used twice", sub.name));
            }
            validate_weight(&sub.name, sub.weight)?;
            if let SubspaceKind::Patch(PatchConfig { partition: PatchPartition::Algebraic { blocks: 0, .. }, .. }) =
                sub.kind
            {
                return bad(format!("subspace {:?}: algebraic partition needs at least one block", sub.name));
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_weight(name: &str, weight: f64) -> Result<(), PcError> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(PcError::config(
            Subspace::Global,
            format!("subspace {name:?} has weight {weight}; weights must be finite and positive"),
        ))
    }
}
