use super::{CachedEvaluation, Oracle, OracleError, OracleProvider};
use crate::core::models::calculation::{CalculationResult, OracleConfig};
use crate::core::models::constraint::FixedAtoms;
use crate::core::models::structure::AtomicStructure;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// One Morse pair potential: `D * (exp(-2a(r - r0)) - 2 exp(-a(r - r0)))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MorsePair {
    /// Well depth in eV.
    pub depth: f64,
    /// Inverse width in 1/Angstrom.
    pub alpha: f64,
    /// Equilibrium distance in Angstroms.
    pub r0: f64,
}

impl MorsePair {
    pub const fn new(depth: f64, alpha: f64, r0: f64) -> Self {
        Self { depth, alpha, r0 }
    }

    /// Returns the energy and its derivative with respect to `r`.
    #[inline]
    fn energy_and_slope(&self, r: f64) -> (f64, f64) {
        let e1 = (-self.alpha * (r - self.r0)).exp();
        let e2 = e1 * e1;
        (
            self.depth * (e2 - 2.0 * e1),
            2.0 * self.alpha * self.depth * (e1 - e2),
        )
    }
}

/// Pair parameters keyed by the alphabetically ordered species pair, e.g. "C-O".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MorseParameters {
    /// Interactions beyond this distance are ignored, in Angstroms.
    pub cutoff: f64,
    pub pairs: BTreeMap<String, MorsePair>,
}

impl Default for MorseParameters {
    /// A Pt/CO parameter set: metallic Pt-Pt cohesion, a stiff C-O bond,
    /// C-down chemisorption on Pt and weak background attraction elsewhere.
    fn default() -> Self {
        let mut params = Self {
            cutoff: 6.0,
            pairs: BTreeMap::new(),
        };
        params.insert("Pt", "Pt", MorsePair::new(0.68, 1.60, 2.80));
        params.insert("C", "O", MorsePair::new(11.2, 2.30, 1.128));
        params.insert("Pt", "C", MorsePair::new(1.2, 1.80, 1.85));
        params.insert("Pt", "O", MorsePair::new(0.1, 1.50, 3.0));
        params.insert("C", "C", MorsePair::new(0.05, 1.50, 3.0));
        params.insert("O", "O", MorsePair::new(0.05, 1.50, 3.0));
        params
    }
}

impl MorseParameters {
    fn key(a: &str, b: &str) -> String {
        if a <= b {
            format!("{}-{}", a, b)
        } else {
            format!("{}-{}", b, a)
        }
    }

    pub fn insert(&mut self, a: &str, b: &str, pair: MorsePair) {
        self.pairs.insert(Self::key(a, b), pair);
    }

    pub fn pair(&self, a: &str, b: &str) -> Result<&MorsePair, OracleError> {
        self.pairs
            .get(&Self::key(a, b))
            .ok_or_else(|| OracleError::MissingParameters(a.to_string(), b.to_string()))
    }

    /// Computes the total energy and the force on every atom.
    ///
    /// Periodic images are summed along the periodic axes out to the cutoff, so a
    /// slab interacts with its in-plane neighbours but never across the vacuum.
    pub fn evaluate(&self, structure: &AtomicStructure) -> Result<(f64, Vec<Vector3<f64>>), OracleError> {
        let cell = structure.cell();
        let n = structure.len();
        let atoms = structure.atoms();

        let mut range = [0i32; 3];
        for (axis, r) in range.iter_mut().enumerate() {
            if cell.is_periodic(axis) {
                *r = (self.cutoff / cell.plane_spacing(axis) + 0.5).ceil() as i32;
            }
        }
        let cutoff_sq = self.cutoff * self.cutoff;

        let mut energy = 0.0;
        let mut forces = vec![Vector3::zeros(); n];
        for i in 0..n {
            for j in i..n {
                let pair = self.pair(&atoms[i].symbol, &atoms[j].symbol)?;
                let mut frac = cell.to_fractional_vector(&(atoms[j].position - atoms[i].position));
                for axis in 0..3 {
                    if cell.is_periodic(axis) {
                        frac[axis] -= frac[axis].round();
                    }
                }
                let base = cell.to_cartesian_vector(&frac);

                for n0 in -range[0]..=range[0] {
                    for n1 in -range[1]..=range[1] {
                        for n2 in -range[2]..=range[2] {
                            let shift = Vector3::new(n0 as f64, n1 as f64, n2 as f64);
                            let d = base + cell.to_cartesian_vector(&shift);
                            let r_sq = d.norm_squared();
                            if r_sq > cutoff_sq || r_sq < 1e-20 {
                                continue;
                            }
                            let r = r_sq.sqrt();
                            let (phi, slope) = pair.energy_and_slope(r);
                            if i == j {
                                // A self-image pair: the shift does not depend on the atom's position.
                                energy += 0.5 * phi;
                                continue;
                            }
                            energy += phi;
                            let f = d * (slope / r);
                            forces[i] += f;
                            forces[j] -= f;
                        }
                    }
                }
            }
        }
        Ok((energy, forces))
    }
}

/// The persisted state of a [`MorseOracle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct MorseCheckpoint {
    label: String,
    evaluations: usize,
    config: OracleConfig,
    parameters: MorseParameters,
    last: Option<CachedEvaluation>,
}

/// Analytic Morse oracle.
///
/// A classical pair potential standing in for an electronic-structure code: it
/// produces energies and exact forces for any structure, writes an oracle log in
/// the same `Extrapolated:` format and supports checkpoint restarts. A restored
/// oracle answers an evaluation of the exact geometry it last saw from its
/// checkpoint instead of recomputing it.
#[derive(Debug, Clone)]
pub struct MorseOracle {
    label: String,
    config: OracleConfig,
    parameters: MorseParameters,
    log_path: Option<PathBuf>,
    last: Option<CachedEvaluation>,
    evaluations: usize,
    cache_hits: usize,
}

impl MorseOracle {
    pub fn new(label: &str, config: OracleConfig, parameters: MorseParameters) -> Self {
        Self {
            label: label.to_string(),
            config,
            parameters,
            log_path: None,
            last: None,
            evaluations: 0,
            cache_hits: 0,
        }
    }

    /// Evaluations actually computed (cache hits excluded), including those before a restart.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    fn log(&self, energy: f64, cached: bool) -> Result<(), OracleError> {
        let Some(path) = &self.log_path else {
            return Ok(());
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| OracleError::io(path, e))?;
        let source = if cached { "restored from checkpoint" } else { "computed" };
        writeln!(
            file,
            "Morse evaluation {} ({}, {})\nExtrapolated: {:>16.6}",
            self.evaluations, self.label, source, energy
        )
        .map_err(|e| OracleError::io(path, e))
    }
}

impl Oracle for MorseOracle {
    fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn evaluate(
        &mut self,
        structure: &AtomicStructure,
        _constraint: &FixedAtoms,
    ) -> Result<CalculationResult, OracleError> {
        if let Some(cached) = self.last.as_ref().filter(|c| c.matches(structure)) {
            let (energy, forces) = (cached.energy, cached.forces());
            self.cache_hits += 1;
            debug!(label = %self.label, energy, "Reusing checkpointed evaluation");
            self.log(energy, true)?;
            return Ok(CalculationResult::evaluated(
                &self.label,
                structure,
                &self.config,
                energy,
                Some(forces),
            ));
        }

        let (energy, forces) = self.parameters.evaluate(structure)?;
        self.evaluations += 1;
        trace!(label = %self.label, energy, evaluation = self.evaluations, "Morse evaluation");
        self.log(energy, false)?;
        self.last = Some(CachedEvaluation::new(structure, energy, &forces));
        Ok(CalculationResult::evaluated(
            &self.label,
            structure,
            &self.config,
            energy,
            Some(forces),
        ))
    }

    fn persist_state(&self, path: &Path) -> Result<(), OracleError> {
        let checkpoint = MorseCheckpoint {
            label: self.label.clone(),
            evaluations: self.evaluations,
            config: self.config.clone(),
            parameters: self.parameters.clone(),
            last: self.last.clone(),
        };
        let text = toml::to_string(&checkpoint).map_err(|e| OracleError::InvalidCheckpoint {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        fs::write(path, text).map_err(|e| OracleError::io(path, e))
    }

    fn restore_state(path: &Path) -> Result<Self, OracleError> {
        let text = fs::read_to_string(path).map_err(|e| OracleError::io(path, e))?;
        let checkpoint: MorseCheckpoint =
            toml::from_str(&text).map_err(|e| OracleError::InvalidCheckpoint {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            label: checkpoint.label,
            config: checkpoint.config,
            parameters: checkpoint.parameters,
            log_path: None,
            last: checkpoint.last,
            evaluations: checkpoint.evaluations,
            cache_hits: 0,
        })
    }

    fn set_log_path(&mut self, path: &Path) {
        self.log_path = Some(path.to_path_buf());
    }

    fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
    }
}

/// Creates [`MorseOracle`]s sharing one parameter set.
#[derive(Debug, Clone, Default)]
pub struct MorseProvider {
    pub parameters: MorseParameters,
}

impl MorseProvider {
    pub fn new(parameters: MorseParameters) -> Self {
        Self { parameters }
    }
}

impl OracleProvider for MorseProvider {
    type Oracle = MorseOracle;

    fn create(
        &self,
        label: &str,
        config: &OracleConfig,
        log_path: &Path,
    ) -> Result<Self::Oracle, OracleError> {
        let mut oracle = MorseOracle::new(label, config.clone(), self.parameters.clone());
        oracle.set_log_path(log_path);
        Ok(oracle)
    }
}
