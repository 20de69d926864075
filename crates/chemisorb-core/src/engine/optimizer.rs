use super::config::RelaxConfig;
use super::context::RelaxArtifacts;
use super::error::EngineError;
use super::oracle::{Oracle, OracleProvider};
use super::progress::{Progress, ProgressReporter};
use super::state::{RelaxOutcome, RelaxState, RelaxStatus};
use super::trajectory::{OptimizerLog, TrajectoryWriter};
use crate::core::io::traits::{Frame, StructureFile};
use crate::core::io::xyz::XyzFile;
use crate::core::models::calculation::CalculationResult;
use crate::core::models::constraint::FixedAtoms;
use crate::core::models::structure::AtomicStructure;
use nalgebra::{DMatrix, DVector, Point3, SymmetricEigen, Vector3};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Diagonal of the initial Hessian guess, in eV/Å².
pub const INITIAL_HESSIAN: f64 = 70.0;

/// Position changes below this leave the Hessian untouched.
const UPDATE_THRESHOLD: f64 = 1e-7;

/// Quasi-Newton step generator with a BFGS Hessian update.
///
/// The Hessian is kept in full over all `3N` coordinates. Steps follow the
/// eigenmodes of the current Hessian with the absolute value of each
/// eigenvalue, so a non-positive-definite estimate still yields a descent
/// direction, and are scaled down when any atom would move more than
/// `max_step`.
#[derive(Debug, Clone)]
pub struct Bfgs {
    hessian: DMatrix<f64>,
    max_step: f64,
    previous: Option<(DVector<f64>, DVector<f64>)>,
}

impl Bfgs {
    pub fn new(n_atoms: usize, max_step: f64) -> Self {
        let dim = 3 * n_atoms;
        Self {
            hessian: DMatrix::identity(dim, dim) * INITIAL_HESSIAN,
            max_step,
            previous: None,
        }
    }

    fn flatten(vectors: impl Iterator<Item = Vector3<f64>>, dim: usize) -> DVector<f64> {
        let mut flat = DVector::zeros(dim);
        for (i, v) in vectors.enumerate() {
            flat.fixed_rows_mut::<3>(3 * i).copy_from(&v);
        }
        flat
    }

    fn update(&mut self, r: &DVector<f64>, f: &DVector<f64>) {
        let Some((r0, f0)) = &self.previous else {
            return;
        };
        let dr = r - r0;
        if dr.amax() < UPDATE_THRESHOLD {
            return;
        }
        let df = f - f0;
        let a = dr.dot(&df);
        let dg = &self.hessian * &dr;
        let b = dr.dot(&dg);
        if a.abs() < f64::EPSILON || b.abs() < f64::EPSILON {
            debug!("Skipping degenerate Hessian update");
            return;
        }
        self.hessian -= (&df * df.transpose()) / a + (&dg * dg.transpose()) / b;
    }

    /// Computes the displacement of every atom for the next step.
    ///
    /// `forces` must already be masked; the returned displacements of atoms
    /// with a zero-masked force are not constrained here, see
    /// [`RelaxationDriver`].
    pub fn step(&mut self, positions: &[Point3<f64>], forces: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
        let dim = 3 * positions.len();
        let r = Self::flatten(positions.iter().map(|p| p.coords), dim);
        let f = Self::flatten(forces.iter().copied(), dim);
        self.update(&r, &f);

        let eigen = SymmetricEigen::new(self.hessian.clone());
        let projected = eigen.eigenvectors.transpose() * &f;
        let scaled = projected.zip_map(&eigen.eigenvalues, |x, w| x / w.abs());
        let dr = &eigen.eigenvectors * scaled;

        let mut steps: Vec<Vector3<f64>> = (0..positions.len())
            .map(|i| Vector3::new(dr[3 * i], dr[3 * i + 1], dr[3 * i + 2]))
            .collect();
        let longest = steps.iter().map(|s| s.norm()).fold(0.0, f64::max);
        if longest >= self.max_step {
            let scale = self.max_step / longest;
            for s in &mut steps {
                *s *= scale;
            }
        }

        self.previous = Some((r, f));
        steps
    }
}

/// Drives one relaxation of a structure against an oracle.
pub struct RelaxationDriver<O: Oracle> {
    oracle: O,
    constraint: FixedAtoms,
    config: RelaxConfig,
    state: RelaxState,
}

impl<O: Oracle> RelaxationDriver<O> {
    pub fn new(oracle: O, constraint: FixedAtoms, config: RelaxConfig) -> Self {
        Self {
            oracle,
            constraint,
            config,
            state: RelaxState::Initialized,
        }
    }

    /// Builds a driver around an oracle restored from an earlier stage's checkpoint.
    ///
    /// The restored oracle logs into this run's oracle log. If the structure
    /// relaxed next is the one the checkpoint was written for, the first
    /// evaluation is answered from the stored state.
    pub fn from_checkpoint<P>(
        provider: &P,
        label: &str,
        checkpoint: &Path,
        artifacts: &RelaxArtifacts,
        constraint: FixedAtoms,
        config: RelaxConfig,
    ) -> Result<Self, EngineError>
    where
        P: OracleProvider<Oracle = O>,
    {
        let oracle = provider.restore(label, checkpoint, &artifacts.oracle_log)?;
        Ok(Self::new(oracle, constraint, config))
    }

    pub fn state(&self) -> RelaxState {
        self.state
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn into_oracle(self) -> O {
        self.oracle
    }

    /// Relaxes `structure` until the largest force on a free atom is at most
    /// `fmax`, or until `max_steps` optimizer steps have been taken.
    ///
    /// Every evaluated geometry is appended to the trajectory and logged. When
    /// the run ends, converged or not, the oracle checkpoint and the final
    /// structure are written. Running out of steps is reported as
    /// [`RelaxStatus::NonConverged`], not as an error.
    #[instrument(skip_all, name = "relaxation", fields(label = %label))]
    pub fn run(
        &mut self,
        structure: &AtomicStructure,
        label: &str,
        artifacts: &RelaxArtifacts,
        reporter: &ProgressReporter,
    ) -> Result<RelaxOutcome, EngineError> {
        self.constraint.validate(structure.len())?;
        self.oracle.set_label(label);
        self.oracle.set_log_path(&artifacts.oracle_log);
        XyzFile::write_structure_to_path(structure, &artifacts.initial)?;

        let mut trajectory = TrajectoryWriter::open(&artifacts.trajectory)?;
        let mut log = OptimizerLog::open(&artifacts.optimizer_log, label)?;
        let mut bfgs = Bfgs::new(structure.len(), self.config.max_step);
        let mut current = structure.clone();
        let mut steps = 0;

        info!(
            atoms = structure.len(),
            fixed = self.constraint.len(),
            fmax = self.config.fmax,
            "Starting relaxation"
        );

        let (mut result, max_force) = loop {
            self.state = RelaxState::Relaxing { step: steps };
            let result = self.oracle.evaluate(&current, &self.constraint)?;
            let forces = result.forces.clone().ok_or_else(|| {
                EngineError::Internal(format!("oracle returned no forces for '{}'", label))
            })?;
            let masked = self.constraint.masked_forces(&forces);
            let max_force = masked.iter().map(|f| f.norm()).fold(0.0, f64::max);

            trajectory.append(
                &Frame::new(current.clone())
                    .with_energy(result.energy)
                    .with_forces(forces),
            )?;
            log.step(steps, result.energy, max_force)?;
            reporter.report(Progress::RelaxStep {
                label: label.to_string(),
                step: steps,
                energy: result.energy,
                fmax: max_force,
            });

            if max_force <= self.config.fmax || steps >= self.config.max_steps {
                break (result, max_force);
            }

            let displacements = bfgs.step(&current.positions(), &masked);
            let positions: Vec<Point3<f64>> = current
                .positions()
                .iter()
                .zip(&displacements)
                .enumerate()
                .map(|(i, (p, d))| if self.constraint.is_fixed(i) { *p } else { p + d })
                .collect();
            current = current.with_positions(&positions)?;
            steps += 1;
        };

        let status = if max_force <= self.config.fmax {
            self.state = RelaxState::Converged { steps };
            log.note(&format!("converged after {} steps", steps))?;
            info!(steps, energy = result.energy, max_force, "Relaxation converged");
            RelaxStatus::Converged
        } else {
            self.state = RelaxState::NonConverged { steps };
            result.converged = false;
            log.note(&format!("not converged after {} steps", steps))?;
            warn!(steps, energy = result.energy, max_force, "Relaxation did not converge");
            RelaxStatus::NonConverged
        };

        self.oracle.persist_state(&artifacts.checkpoint)?;
        write_final(&current, &result, &artifacts.relaxed)?;

        Ok(RelaxOutcome {
            status,
            structure: current,
            result,
            steps,
            max_force,
            fmax: self.config.fmax,
        })
    }
}

fn write_final(
    structure: &AtomicStructure,
    result: &CalculationResult,
    path: &Path,
) -> Result<(), EngineError> {
    let mut frame = Frame::new(structure.clone()).with_energy(result.energy);
    if let Some(forces) = &result.forces {
        frame = frame.with_forces(forces.clone());
    }
    XyzFile::write_to_path(&frame, path)?;
    Ok(())
}

/// Evaluates a structure once, writing the same artifacts as a relaxation.
///
/// The structure is recorded as both the initial and the final structure and
/// the oracle checkpoint is persisted, so a later stage can restart from it.
#[instrument(skip_all, name = "single_point", fields(label = %label))]
pub fn single_point<O: Oracle>(
    oracle: &mut O,
    structure: &AtomicStructure,
    constraint: &FixedAtoms,
    label: &str,
    artifacts: &RelaxArtifacts,
) -> Result<CalculationResult, EngineError> {
    constraint.validate(structure.len())?;
    oracle.set_label(label);
    oracle.set_log_path(&artifacts.oracle_log);
    XyzFile::write_structure_to_path(structure, &artifacts.initial)?;

    let result = oracle.evaluate(structure, constraint)?;
    info!(energy = result.energy, "Single point evaluated");

    oracle.persist_state(&artifacts.checkpoint)?;
    write_final(structure, &result, &artifacts.relaxed)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::constraint::build_constraint;
    use crate::core::builder::slab::{Facet, SlabSpec, build_slab};
    use crate::core::models::atom::Atom;
    use crate::core::models::calculation::OracleConfig;
    use crate::core::models::cell::Cell;
    use crate::engine::context::PipelineContext;
    use crate::engine::oracle::morse::{MorseOracle, MorseParameters, MorseProvider};

    fn oracle() -> MorseOracle {
        MorseOracle::new("test", OracleConfig::default(), MorseParameters::default())
    }

    fn stretched_co() -> AtomicStructure {
        AtomicStructure::new(
            vec![
                Atom::new("C", Point3::new(7.0, 7.0, 7.0)),
                Atom::new("O", Point3::new(7.0, 7.0, 8.4)),
            ],
            Cell::cubic(14.0, [false; 3]).unwrap(),
        )
    }

    fn bond(s: &AtomicStructure) -> f64 {
        (s.atoms()[1].position - s.atoms()[0].position).norm()
    }

    #[test]
    fn bfgs_relaxes_a_stretched_dimer_to_its_equilibrium() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PipelineContext::new(dir.path()).unwrap();
        let artifacts = ctx.relax_artifacts();
        let mut driver = RelaxationDriver::new(oracle(), FixedAtoms::none(), RelaxConfig::default());

        let outcome = driver
            .run(&stretched_co(), "co", &artifacts, &ProgressReporter::new())
            .unwrap();

        assert!(outcome.is_converged());
        assert!(outcome.max_force <= 0.05);
        assert!((bond(&outcome.structure) - 1.128).abs() < 0.01);
        assert_eq!(driver.state(), RelaxState::Converged { steps: outcome.steps });
        assert!(artifacts.checkpoint.exists());
        assert!(artifacts.relaxed.exists());
        let frames = XyzFile::read_all_from_path(&artifacts.trajectory).unwrap();
        assert_eq!(frames.len(), outcome.steps + 1);
    }

    #[test]
    fn no_atom_moves_further_than_max_step() {
        let mut bfgs = Bfgs::new(2, 0.2);
        let s = stretched_co();
        let (_, forces) = MorseParameters::default().evaluate(&s).unwrap();
        let steps = bfgs.step(&s.positions(), &forces);
        let longest = steps.iter().map(|d| d.norm()).fold(0.0, f64::max);
        assert!(longest <= 0.2 + 1e-12);
        // The first step follows the forces.
        assert!(steps[0].z > 0.0 && steps[1].z < 0.0);
    }

    #[test]
    fn fixed_atoms_never_move() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PipelineContext::new(dir.path()).unwrap();
        let slab = build_slab(&SlabSpec::new("Pt", Facet::Fcc111, [2, 2, 3], 6.0)).unwrap();
        let constraint = build_constraint(&slab, 2).unwrap();
        let config = RelaxConfig {
            max_steps: 5,
            ..RelaxConfig::default()
        };
        let mut driver = RelaxationDriver::new(oracle(), constraint.clone(), config);
        let outcome = driver
            .run(&slab, "slab", &ctx.relax_artifacts(), &ProgressReporter::new())
            .unwrap();

        for i in constraint.indices() {
            assert_eq!(outcome.structure.atoms()[i].position, slab.atoms()[i].position);
        }
    }

    #[test]
    fn exhausted_step_budget_is_a_non_converged_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PipelineContext::new(dir.path()).unwrap();
        let artifacts = ctx.relax_artifacts();
        let config = RelaxConfig {
            max_steps: 1,
            ..RelaxConfig::default()
        };
        let mut driver = RelaxationDriver::new(oracle(), FixedAtoms::none(), config);
        let outcome = driver
            .run(&stretched_co(), "co", &artifacts, &ProgressReporter::new())
            .unwrap();

        assert_eq!(outcome.status, RelaxStatus::NonConverged);
        assert_eq!(outcome.steps, 1);
        assert_eq!(driver.state(), RelaxState::NonConverged { steps: 1 });
        assert!(!outcome.result.converged);
        assert!(artifacts.checkpoint.exists());
        assert!(matches!(
            outcome.into_converged(),
            Err(EngineError::NonConvergence { steps: 1, .. })
        ));
    }

    #[test]
    fn constraint_outside_the_structure_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PipelineContext::new(dir.path()).unwrap();
        let mut driver = RelaxationDriver::new(oracle(), FixedAtoms::new([5]), RelaxConfig::default());
        assert!(matches!(
            driver.run(&stretched_co(), "co", &ctx.relax_artifacts(), &ProgressReporter::new()),
            Err(EngineError::Structure(_))
        ));
    }

    #[test]
    fn restart_from_checkpoint_reuses_the_stored_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        let root = PipelineContext::new(dir.path()).unwrap();
        let first = root.namespace("first").unwrap().relax_artifacts();
        let second = root.namespace("second").unwrap().relax_artifacts();
        let provider = MorseProvider::default();
        let s = stretched_co();

        let mut sp = provider
            .create("first", &OracleConfig::default(), &first.oracle_log)
            .unwrap();
        let reference = single_point(&mut sp, &s, &FixedAtoms::none(), "first", &first).unwrap();

        let mut driver = RelaxationDriver::from_checkpoint(
            &provider,
            "second",
            &first.checkpoint,
            &second,
            FixedAtoms::none(),
            RelaxConfig::default(),
        )
        .unwrap();
        let outcome = driver.run(&s, "second", &second, &ProgressReporter::new()).unwrap();

        assert!(outcome.is_converged());
        assert_eq!(driver.oracle().cache_hits(), 1);
        let frames = XyzFile::read_all_from_path(&second.trajectory).unwrap();
        assert_eq!(frames[0].energy, Some(reference.energy));
    }
}
