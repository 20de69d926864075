use super::{CachedEvaluation, Oracle, OracleError, OracleProvider};
use crate::core::io::traits::{Frame, StructureFile};
use crate::core::io::xyz::XyzFile;
use crate::core::models::calculation::{CalculationResult, OracleConfig};
use crate::core::models::constraint::FixedAtoms;
use crate::core::models::structure::AtomicStructure;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

pub const INPUT_FILE: &str = "oracle_input.xyz";
pub const OUTPUT_FILE: &str = "oracle_output.xyz";
pub const CONFIG_FILE: &str = "oracle_config.toml";

/// An oracle backed by an external program, run once per evaluation.
///
/// Each evaluation writes the structure to `oracle_input.xyz` and the
/// configuration to `oracle_config.toml` next to the oracle log, then runs the
/// program with these environment variables:
///
/// - `CHEMISORB_INPUT` - the structure to evaluate
/// - `CHEMISORB_OUTPUT` - where the program must write the evaluated frame, as
///   extended XYZ with `energy=` and a `forces` column
/// - `CHEMISORB_CONFIG` - the oracle configuration as TOML
/// - `CHEMISORB_LOG` - the oracle log; the program's standard output is appended to it
#[derive(Debug, Clone)]
pub struct CommandOracle {
    label: String,
    program: String,
    args: Vec<String>,
    config: OracleConfig,
    log_path: Option<PathBuf>,
    last: Option<CachedEvaluation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CommandCheckpoint {
    label: String,
    program: String,
    args: Vec<String>,
    config: OracleConfig,
    last: Option<CachedEvaluation>,
}

impl CommandOracle {
    pub fn new(label: &str, program: &str, args: &[String], config: OracleConfig) -> Self {
        Self {
            label: label.to_string(),
            program: program.to_string(),
            args: args.to_vec(),
            config,
            log_path: None,
            last: None,
        }
    }

    fn work_dir(&self) -> PathBuf {
        self.log_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn log_path_or_default(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| self.work_dir().join("oracle.txt"))
    }

    fn run_program(&self, structure: &AtomicStructure) -> Result<Frame, OracleError> {
        let dir = self.work_dir();
        let input = dir.join(INPUT_FILE);
        let output = dir.join(OUTPUT_FILE);
        let config_path = dir.join(CONFIG_FILE);
        let log = self.log_path_or_default();

        XyzFile::write_structure_to_path(structure, &input)?;
        let config_text = toml::to_string(&self.config)
            .map_err(|e| OracleError::Evaluation(format!("cannot serialize configuration: {}", e)))?;
        fs::write(&config_path, config_text).map_err(|e| OracleError::io(&config_path, e))?;
        if output.exists() {
            fs::remove_file(&output).map_err(|e| OracleError::io(&output, e))?;
        }

        debug!(program = %self.program, label = %self.label, "Running oracle program");
        let result = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&dir)
            .env("CHEMISORB_INPUT", &input)
            .env("CHEMISORB_OUTPUT", &output)
            .env("CHEMISORB_CONFIG", &config_path)
            .env("CHEMISORB_LOG", &log)
            .output()
            .map_err(|e| OracleError::Evaluation(format!("cannot start '{}': {}", self.program, e)))?;

        append_log(&log, &result.stdout)?;

        if !result.status.success() {
            return Err(OracleError::CommandFailed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        if !output.exists() {
            return Err(OracleError::Evaluation(format!(
                "program finished without writing {}",
                output.display()
            )));
        }
        Ok(XyzFile::read_from_path(&output)?)
    }
}

impl Oracle for CommandOracle {
    fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn evaluate(
        &mut self,
        structure: &AtomicStructure,
        _constraint: &FixedAtoms,
    ) -> Result<CalculationResult, OracleError> {
        if let Some(cached) = self.last.as_ref().filter(|c| c.matches(structure)) {
            info!(label = %self.label, "Reusing checkpointed evaluation");
            let line = format!(
                "Checkpointed evaluation ({}, restored)\nExtrapolated: {:>16.6}\n",
                self.label, cached.energy
            );
            append_log(&self.log_path_or_default(), line.as_bytes())?;
            return Ok(CalculationResult::evaluated(
                &self.label,
                structure,
                &self.config,
                cached.energy,
                Some(cached.forces()),
            ));
        }

        let frame = self.run_program(structure)?;
        let energy = frame
            .energy
            .ok_or_else(|| OracleError::Evaluation("output frame has no energy".to_string()))?;
        let forces = frame
            .forces
            .ok_or_else(|| OracleError::Evaluation("output frame has no forces".to_string()))?;
        if forces.len() != structure.len() {
            return Err(OracleError::Evaluation(format!(
                "output holds {} forces for {} atoms",
                forces.len(),
                structure.len()
            )));
        }

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
        let checkpoint = CommandCheckpoint {
            label: self.label.clone(),
            program: self.program.clone(),
            args: self.args.clone(),
            config: self.config.clone(),
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
        let checkpoint: CommandCheckpoint =
            toml::from_str(&text).map_err(|e| OracleError::InvalidCheckpoint {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            label: checkpoint.label,
            program: checkpoint.program,
            args: checkpoint.args,
            config: checkpoint.config,
            log_path: None,
            last: checkpoint.last,
        })
    }

    fn set_log_path(&mut self, path: &Path) {
        self.log_path = Some(path.to_path_buf());
    }

    fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
    }
}

fn append_log(path: &Path, bytes: &[u8]) -> Result<(), OracleError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| OracleError::io(path, e))?;
    file.write_all(bytes).map_err(|e| OracleError::io(path, e))
}

/// Creates [`CommandOracle`]s running the same program.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandProvider {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
        }
    }
}

impl OracleProvider for CommandProvider {
    type Oracle = CommandOracle;

    fn create(
        &self,
        label: &str,
        config: &OracleConfig,
        log_path: &Path,
    ) -> Result<Self::Oracle, OracleError> {
        let mut oracle = CommandOracle::new(label, &self.program, &self.args, config.clone());
        oracle.set_log_path(log_path);
        Ok(oracle)
    }
}
