use super::error::EngineError;
use crate::core::models::calculation::CalculationResult;
use crate::core::models::structure::AtomicStructure;

/// Where a relaxation run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxState {
    Initialized,
    Relaxing { step: usize },
    Converged { steps: usize },
    NonConverged { steps: usize },
}

impl RelaxState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RelaxState::Converged { .. } | RelaxState::NonConverged { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxStatus {
    Converged,
    NonConverged,
}

/// The final state of a finished relaxation.
#[derive(Debug, Clone)]
pub struct RelaxOutcome {
    pub status: RelaxStatus,
    /// The last evaluated geometry.
    pub structure: AtomicStructure,
    /// The oracle result for `structure`.
    pub result: CalculationResult,
    /// Optimizer steps taken (geometry updates, not oracle calls).
    pub steps: usize,
    /// Largest force on a free atom at the last evaluation.
    pub max_force: f64,
    pub fmax: f64,
}

impl RelaxOutcome {
    #[inline]
    pub fn is_converged(&self) -> bool {
        self.status == RelaxStatus::Converged
    }

    /// Returns the outcome if it converged, and a [`EngineError::NonConvergence`] otherwise.
    pub fn into_converged(self) -> Result<Self, EngineError> {
        match self.status {
            RelaxStatus::Converged => Ok(self),
            RelaxStatus::NonConverged => Err(EngineError::NonConvergence {
                label: self.result.provenance.label.clone(),
                steps: self.steps,
                max_force: self.max_force,
                fmax: self.fmax,
            }),
        }
    }
}
