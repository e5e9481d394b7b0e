//! Preconditioner configuration.

pub mod options;

pub use options::{
    CoarseConfig, CoarseOperatorKind, CompositeType, PatchConfig, PatchPartition, PcConfig, SubSolverKind,
    SubspaceConfig, SubspaceKind,
};
pub(crate) use options::validate_weight;
