//! Error taxonomy and non-fatal build warnings.
//!
//! Fatal conditions (bad geometry, bad transforms, bad configuration) are
//! returned as [`Error`] from the call that detects them. Conditions the
//! builder can degrade around are collected as [`BuildWarning`]s on the
//! produced domain and logged.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// Degenerate primitive parameters. Reported at construction.
    #[error("invalid {shape} geometry: {reason}")]
    InvalidGeometry { shape: &'static str, reason: String },

    /// Rotation about a zero-length or non-finite axis.
    #[error("invalid transform: {reason}")]
    InvalidTransform { reason: String },

    /// Boundary-id array sizes, descriptor values and similar setup mistakes.
    #[error("configuration error: {reason}")]
    ConfigurationError { reason: String },

    /// An MLS query found no sample within the support radius.
    #[error("no MLS samples within radius {radius} of ({}, {}, {})", point.x, point.y, point.z)]
    InsufficientSupport { point: Vector3<f64>, radius: f64 },

    /// Requested refinement deeper than the configured maximum.
    ///
    /// The octree builder never returns this; it truncates refinement and
    /// records [`BuildWarning::RefinementBudgetExceeded`] instead. Callers
    /// that want a hard failure can raise it from that warning.
    #[error("refinement depth {requested} exceeds the maximum of {max}")]
    RefinementBudgetExceeded { requested: u32, max: u32 },
}

impl Error {
    pub(crate) fn geometry(shape: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidGeometry { shape, reason: reason.into() }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Error::ConfigurationError { reason: reason.into() }
    }

    pub(crate) fn transform(reason: impl Into<String>) -> Self {
        Error::InvalidTransform { reason: reason.into() }
    }

    /// True for conditions the builder recovers from.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InsufficientSupport { .. } | Error::RefinementBudgetExceeded { .. }
        )
    }
}

/// Non-fatal condition recorded alongside a best-effort domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BuildWarning {
    /// Boundary refinement was truncated at `max`; coarser Boundary cells remain.
    RefinementBudgetExceeded { requested: u32, max: u32 },
    /// Corner or probe samples had no MLS support; the affected cells were
    /// never classified Full.
    InsufficientSupport { samples: usize },
}

impl std::fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildWarning::RefinementBudgetExceeded { requested, max } => {
                write!(f, "refinement depth {requested} truncated to {max}")
            }
            BuildWarning::InsufficientSupport { samples } => {
                write!(f, "{samples} samples lacked MLS support")
            }
        }
    }
}
