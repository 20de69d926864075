//! Structure interchange.
//!
//! The pipeline reads and writes structures, trajectories and oracle
//! exchange files in the extended XYZ format through the [`traits::StructureFile`]
//! interface.

pub mod traits;
pub mod xyz;
