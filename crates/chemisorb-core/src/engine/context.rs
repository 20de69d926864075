use super::error::EngineError;
use std::fs;
use std::path::{Path, PathBuf};

/// A named file a pipeline stage produces or consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Structure handed to the stage, before any optimization.
    InitialStructure,
    /// Final structure of a relaxation or single point.
    RelaxedStructure,
    /// One frame per optimizer step, written as the run progresses.
    Trajectory,
    /// One line per optimizer step.
    OptimizerLog,
    /// The oracle's own text log, with `Extrapolated:` energy lines.
    OracleLog,
    /// Persisted oracle state for restarts.
    Checkpoint,
    /// Key/value energy report.
    Summary,
}

impl Artifact {
    pub const ALL: [Artifact; 7] = [
        Artifact::InitialStructure,
        Artifact::RelaxedStructure,
        Artifact::Trajectory,
        Artifact::OptimizerLog,
        Artifact::OracleLog,
        Artifact::Checkpoint,
        Artifact::Summary,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Artifact::InitialStructure => "initial.xyz",
            Artifact::RelaxedStructure => "relaxed.xyz",
            Artifact::Trajectory => "relax.traj.xyz",
            Artifact::OptimizerLog => "relax_opt.log",
            Artifact::OracleLog => "oracle.txt",
            Artifact::Checkpoint => "checkpoint.toml",
            Artifact::Summary => "energies_summary.txt",
        }
    }
}

/// An output namespace: the directory holding one stage's artifacts.
///
/// Stages never share a namespace, so parallel site variants and concurrent
/// pipeline runs cannot overwrite each other's checkpoints or logs. Child
/// namespaces are subdirectories of their parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineContext {
    root: PathBuf,
    stage: String,
}

impl PipelineContext {
    /// Creates the root namespace of a pipeline run, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| EngineError::io(&root, e))?;
        Ok(Self {
            root,
            stage: "pipeline".to_string(),
        })
    }

    /// Opens the root namespace of an earlier run for reading.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingInputFile`] if `root` is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(EngineError::MissingInputFile {
                stage: "pipeline".to_string(),
                path: root,
            });
        }
        Ok(Self {
            root,
            stage: "pipeline".to_string(),
        })
    }

    /// Opens the child namespace for one stage, ready to be written.
    ///
    /// The directory is created if needed. Artifacts left in it by an earlier
    /// run are removed, so everything [`require`](Self::require) finds there
    /// afterwards was written by the current owner.
    pub fn namespace(&self, stage: &str) -> Result<Self, EngineError> {
        if stage.is_empty() || stage.contains(['/', '\\']) || stage == ".." || stage == "." {
            return Err(EngineError::Internal(format!(
                "invalid namespace name '{}'",
                stage
            )));
        }
        let root = self.root.join(stage);
        fs::create_dir_all(&root).map_err(|e| EngineError::io(&root, e))?;
        let ctx = Self {
            root,
            stage: stage.to_string(),
        };
        for artifact in Artifact::ALL {
            ctx.discard(artifact)?;
        }
        Ok(ctx)
    }

    /// Removes an artifact if it exists.
    pub fn discard(&self, artifact: Artifact) -> Result<(), EngineError> {
        let path = self.path(artifact);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::io(path, e)),
        }
    }

    /// Returns the child namespace for a stage without creating it.
    ///
    /// Used by readers of earlier stages' output.
    pub fn existing_namespace(&self, stage: &str) -> Self {
        Self {
            root: self.root.join(stage),
            stage: stage.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.root.join(artifact.file_name())
    }

    /// Returns the path of an artifact that an earlier stage must have produced.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingInputFile`] if it does not exist.
    pub fn require(&self, artifact: Artifact) -> Result<PathBuf, EngineError> {
        let path = self.path(artifact);
        if path.exists() {
            Ok(path)
        } else {
            Err(EngineError::MissingInputFile {
                stage: self.stage.clone(),
                path,
            })
        }
    }

    /// The set of files a relaxation in this namespace writes.
    pub fn relax_artifacts(&self) -> RelaxArtifacts {
        RelaxArtifacts {
            initial: self.path(Artifact::InitialStructure),
            relaxed: self.path(Artifact::RelaxedStructure),
            trajectory: self.path(Artifact::Trajectory),
            optimizer_log: self.path(Artifact::OptimizerLog),
            oracle_log: self.path(Artifact::OracleLog),
            checkpoint: self.path(Artifact::Checkpoint),
        }
    }
}

/// File locations for one relaxation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaxArtifacts {
    pub initial: PathBuf,
    pub relaxed: PathBuf,
    pub trajectory: PathBuf,
    pub optimizer_log: PathBuf,
    pub oracle_log: PathBuf,
    pub checkpoint: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_are_disjoint_directories() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PipelineContext::new(dir.path()).unwrap();
        let top = ctx.namespace("site-on-top").unwrap();
        let bridge = ctx.namespace("site-bridge").unwrap();
        assert!(top.root().is_dir());
        assert_ne!(top.path(Artifact::Checkpoint), bridge.path(Artifact::Checkpoint));
        assert_eq!(top.stage(), "site-on-top");
        assert!(top.path(Artifact::Summary).ends_with("site-on-top/energies_summary.txt"));
    }

    #[test]
    fn require_reports_missing_artifact_with_stage() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PipelineContext::new(dir.path()).unwrap().namespace("clean-slab").unwrap();
        match ctx.require(Artifact::Checkpoint) {
            Err(EngineError::MissingInputFile { stage, path }) => {
                assert_eq!(stage, "clean-slab");
                assert!(path.ends_with("checkpoint.toml"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        fs::write(ctx.path(Artifact::Checkpoint), "").unwrap();
        assert!(ctx.require(Artifact::Checkpoint).is_ok());
    }

    #[test]
    fn reopened_namespace_starts_without_stale_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PipelineContext::new(dir.path()).unwrap();
        let first = ctx.namespace("site-on-top").unwrap();
        fs::write(first.path(Artifact::OracleLog), "Extrapolated: -3.0\n").unwrap();
        fs::write(first.root().join("notes.txt"), "kept").unwrap();

        let second = ctx.namespace("site-on-top").unwrap();
        assert!(matches!(
            second.require(Artifact::OracleLog),
            Err(EngineError::MissingInputFile { .. })
        ));
        assert!(second.root().join("notes.txt").exists());
    }

    #[test]
    fn open_does_not_create_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-run");
        assert!(matches!(
            PipelineContext::open(&missing),
            Err(EngineError::MissingInputFile { .. })
        ));
        assert!(!missing.exists());
        assert!(PipelineContext::open(dir.path()).is_ok());
    }

    #[test]
    fn namespace_names_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PipelineContext::new(dir.path()).unwrap();
        assert!(ctx.namespace("../elsewhere").is_err());
        assert!(ctx.namespace("").is_err());
    }
}
