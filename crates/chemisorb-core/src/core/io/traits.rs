use crate::core::models::structure::AtomicStructure;
use nalgebra::Vector3;
use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// One snapshot of a structure, optionally with the energy and forces computed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub structure: AtomicStructure,
    /// Total energy in eV.
    pub energy: Option<f64>,
    /// Per-atom forces in eV/Angstrom.
    pub forces: Option<Vec<Vector3<f64>>>,
}

impl Frame {
    pub fn new(structure: AtomicStructure) -> Self {
        Self {
            structure,
            energy: None,
            forces: None,
        }
    }

    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = Some(energy);
        self
    }

    pub fn with_forces(mut self, forces: Vec<Vector3<f64>>) -> Self {
        self.forces = Some(forces);
        self
    }
}

/// Defines the interface for reading and writing structure interchange files.
///
/// A file holds one or more [`Frame`]s; single-structure files are just the
/// one-frame case, and trajectories are written by appending frames.
pub trait StructureFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads the first frame from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the input holds no frame or the frame is malformed.
    fn read_from(reader: &mut impl BufRead) -> Result<Frame, Self::Error>;

    /// Reads every frame from a buffered reader, in order.
    fn read_all(reader: &mut impl BufRead) -> Result<Vec<Frame>, Self::Error>;

    /// Writes one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is inconsistent (e.g., forces for the wrong
    /// number of atoms) or writing fails.
    fn write_to(frame: &Frame, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads the first frame of a file.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Frame, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Reads every frame of a file.
    fn read_all_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Frame>, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_all(&mut reader)
    }

    /// Writes a single frame to a file, replacing its contents.
    fn write_to_path<P: AsRef<Path>>(frame: &Frame, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(frame, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Appends a frame to a file, creating it if needed.
    fn append_to_path<P: AsRef<Path>>(frame: &Frame, path: P) -> Result<(), Self::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(frame, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes a bare structure to a file.
    fn write_structure_to_path<P: AsRef<Path>>(
        structure: &AtomicStructure,
        path: P,
    ) -> Result<(), Self::Error> {
        Self::write_to_path(&Frame::new(structure.clone()), path)
    }
}
