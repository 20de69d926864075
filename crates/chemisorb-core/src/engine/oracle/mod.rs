//! The energy/force oracle seam.
//!
//! An oracle evaluates the total energy (and usually the forces) of a structure
//! under a fixed [`OracleConfig`]. The pipeline never looks inside one: it
//! asks for evaluations, persists the oracle's state after each stage and
//! restores it to restart later stages.
//!
//! - [`morse`] - Analytic pairwise Morse oracle for tests and dry runs
//! - [`command`] - Adapter that runs an external program per evaluation

pub mod command;
pub mod morse;

use crate::core::io::xyz::XyzError;
use crate::core::models::calculation::{CalculationResult, OracleConfig};
use crate::core::models::constraint::FixedAtoms;
use crate::core::models::structure::AtomicStructure;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("No interaction parameters for the {0}-{1} pair")]
    MissingParameters(String, String),

    #[error("Oracle evaluation failed: {0}")]
    Evaluation(String),

    #[error("Oracle checkpoint {path} is invalid: {reason}")]
    InvalidCheckpoint { path: PathBuf, reason: String },

    #[error("Oracle program exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("Oracle exchange file error: {0}")]
    Exchange(#[from] XyzError),

    #[error("I/O error on {path}: {origin}")]
    Io { path: PathBuf, origin: std::io::Error },
}

impl OracleError {
    pub(crate) fn io(path: &Path, origin: std::io::Error) -> Self {
        OracleError::Io {
            path: path.to_path_buf(),
            origin,
        }
    }
}

/// An energy/force evaluation engine.
pub trait Oracle {
    /// The settings every result of this oracle is produced with.
    fn config(&self) -> &OracleConfig;

    /// Evaluates the energy and forces of `structure`.
    ///
    /// Forces are returned for every atom; masking the fixed atoms is the
    /// caller's job. The constraint is passed so oracles that can exploit it
    /// (e.g., by skipping work) may do so.
    fn evaluate(
        &mut self,
        structure: &AtomicStructure,
        constraint: &FixedAtoms,
    ) -> Result<CalculationResult, OracleError>;

    /// Writes the oracle's internal state so a later stage can restart from it.
    fn persist_state(&self, path: &Path) -> Result<(), OracleError>;

    /// Restores an oracle from a persisted state.
    fn restore_state(path: &Path) -> Result<Self, OracleError>
    where
        Self: Sized;

    /// Redirects the oracle's text log, with its `Extrapolated:` energy lines.
    fn set_log_path(&mut self, path: &Path);

    /// Sets the label recorded in the provenance of subsequent results.
    fn set_label(&mut self, label: &str);
}

/// Creates independent oracles, one per stage.
///
/// Parallel site variants each get their own oracle, so a provider is shared
/// between threads while the oracles it creates are moved into them.
pub trait OracleProvider: Sync {
    type Oracle: Oracle + Send;

    /// Creates a fresh oracle.
    fn create(
        &self,
        label: &str,
        config: &OracleConfig,
        log_path: &Path,
    ) -> Result<Self::Oracle, OracleError>;

    /// Restores an oracle persisted by an earlier stage and points it at a new log.
    fn restore(&self, label: &str, checkpoint: &Path, log_path: &Path) -> Result<Self::Oracle, OracleError> {
        let mut oracle = Self::Oracle::restore_state(checkpoint)?;
        oracle.set_label(label);
        oracle.set_log_path(log_path);
        Ok(oracle)
    }
}

/// The last evaluation an oracle performed, as stored in its checkpoint.
///
/// The structure fingerprint is kept as a hex string; TOML integers cannot hold
/// every `u64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CachedEvaluation {
    pub fingerprint: String,
    pub energy: f64,
    pub forces: Vec<[f64; 3]>,
}

impl CachedEvaluation {
    pub fn new(structure: &AtomicStructure, energy: f64, forces: &[Vector3<f64>]) -> Self {
        Self {
            fingerprint: format!("{:016x}", structure.fingerprint()),
            energy,
            forces: forces.iter().map(|f| [f.x, f.y, f.z]).collect(),
        }
    }

    /// Returns `true` if this evaluation was made for exactly `structure`.
    pub fn matches(&self, structure: &AtomicStructure) -> bool {
        self.fingerprint == format!("{:016x}", structure.fingerprint())
            && self.forces.len() == structure.len()
    }

    pub fn forces(&self) -> Vec<Vector3<f64>> {
        self.forces.iter().map(|f| Vector3::new(f[0], f[1], f[2])).collect()
    }
}
