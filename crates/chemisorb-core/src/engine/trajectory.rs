use super::error::EngineError;
use crate::core::io::traits::{Frame, StructureFile};
use crate::core::io::xyz::XyzFile;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes one extended-XYZ frame per optimizer step.
///
/// Frames are flushed as they are written, so an interrupted run keeps every
/// completed step. Opening a trajectory starts it afresh.
pub struct TrajectoryWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    frames: usize,
}

impl TrajectoryWriter {
    /// Creates the trajectory, truncating any earlier one at `path`.
    pub fn open(path: &Path) -> Result<Self, EngineError> {
        let file = File::create(path).map_err(|e| EngineError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            frames: 0,
        })
    }

    pub fn append(&mut self, frame: &Frame) -> Result<(), EngineError> {
        XyzFile::write_to(frame, &mut self.writer)?;
        self.writer.flush().map_err(|e| EngineError::io(&self.path, e))?;
        self.frames += 1;
        Ok(())
    }

    /// Frames written through this writer.
    pub fn frames(&self) -> usize {
        self.frames
    }
}

/// Human-readable optimizer log with one line per step.
pub struct OptimizerLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl OptimizerLog {
    pub fn open(path: &Path, label: &str) -> Result<Self, EngineError> {
        let file = File::create(path).map_err(|e| EngineError::io(path, e))?;
        let mut log = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        };
        log.write_line(&format!("# {}", label))?;
        log.write_line(&format!("{:<5} {:>5} {:>15} {:>12}", "", "Step", "Energy", "fmax"))?;
        Ok(log)
    }

    pub fn step(&mut self, step: usize, energy: f64, fmax: f64) -> Result<(), EngineError> {
        self.write_line(&format!("BFGS: {:>5} {:>15.6} {:>12.4}", step, energy, fmax))
    }

    pub fn note(&mut self, text: &str) -> Result<(), EngineError> {
        self.write_line(&format!("# {}", text))
    }

    fn write_line(&mut self, line: &str) -> Result<(), EngineError> {
        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .map_err(|e| EngineError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::cell::Cell;
    use crate::core::models::structure::AtomicStructure;
    use nalgebra::Point3;
    use std::fs;

    #[test]
    fn reopening_a_trajectory_starts_it_afresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relax.traj.xyz");
        let structure = AtomicStructure::new(
            vec![Atom::new("Pt", Point3::new(1.0, 1.0, 1.0))],
            Cell::cubic(5.0, [true; 3]).unwrap(),
        );

        let mut first = TrajectoryWriter::open(&path).unwrap();
        first.append(&Frame::new(structure.clone()).with_energy(-1.0)).unwrap();
        drop(first);
        let mut second = TrajectoryWriter::open(&path).unwrap();
        second.append(&Frame::new(structure).with_energy(-2.0)).unwrap();
        assert_eq!(second.frames(), 1);

        let frames = XyzFile::read_all_from_path(&path).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].energy, Some(-2.0));
    }

    #[test]
    fn optimizer_log_lines_are_fixed_width() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relax_opt.log");
        let mut log = OptimizerLog::open(&path, "slab").unwrap();
        log.step(3, -123.456789, 0.04321).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let last = text.lines().last().unwrap();
        assert_eq!(last, "BFGS:     3     -123.456789       0.0432");
    }
}
