use std::fmt;
use thiserror::Error;

/// Identifies the subspace that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subspace {
    /// A patch (local) subspace, by patch index.
    Patch(usize),
    /// The coarse correction space.
    Coarse,
    /// The global space: the composite preconditioner or the global operator itself.
    Global,
}

impl fmt::Display for Subspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subspace::Patch(i) => write!(f, "patch {i}"),
            Subspace::Coarse => write!(f, "coarse space"),
            Subspace::Global => write!(f, "global space"),
        }
    }
}

// Unified error type for schwarz-pc

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PcError {
    #[error("configuration error in {subspace}: {reason}")]
    Configuration { subspace: Subspace, reason: String },
    #[error("singular subsystem in {subspace}: {reason}")]
    SingularSubsystem { subspace: Subspace, reason: String },
    #[error("dimension mismatch in {subspace}: expected {expected}, found {found}")]
    DimensionMismatch {
        subspace: Subspace,
        expected: usize,
        found: usize,
    },
    #[error("indefinite matrix detected (p^T A p <= 0)")]
    IndefiniteMatrix,
    #[error("indefinite preconditioner detected (beta < 0)")]
    IndefinitePreconditioner,
}

impl PcError {
    pub fn config(subspace: Subspace, reason: impl Into<String>) -> Self {
        PcError::Configuration { subspace, reason: reason.into() }
    }

    pub fn singular(subspace: Subspace, reason: impl Into<String>) -> Self {
        PcError::SingularSubsystem { subspace, reason: reason.into() }
    }

    pub fn mismatch(subspace: Subspace, expected: usize, found: usize) -> Self {
        PcError::DimensionMismatch { subspace, expected, found }
    }

    /// The subspace this error is attributed to, if any.
    pub fn subspace(&self) -> Option<Subspace> {
        match self {
            PcError::Configuration { subspace, .. }
            | PcError::SingularSubsystem { subspace, .. }
            | PcError::DimensionMismatch { subspace, .. } => Some(*subspace),
            PcError::IndefiniteMatrix | PcError::IndefinitePreconditioner => None,
        }
    }

    /// Re-attribute the error to `subspace`.
    ///
    /// Helpers such as the dense LU solver do not know which patch they serve and report
    /// `Subspace::Global`; callers re-tag the error before surfacing it.
    pub fn at(self, subspace: Subspace) -> Self {
        match self {
            PcError::Configuration { reason, .. } => PcError::Configuration { subspace, reason },
            PcError::SingularSubsystem { reason, .. } => {
                PcError::SingularSubsystem { subspace, reason }
            }
            PcError::DimensionMismatch { expected, found, .. } => {
                PcError::DimensionMismatch { subspace, expected, found }
            }
            other => other,
        }
    }
}
