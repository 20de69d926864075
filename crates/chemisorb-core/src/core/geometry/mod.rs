//! Layer detection, minimum-image geometry and adsorption-site search.
//!
//! Everything here is a pure function of an [`AtomicStructure`](crate::core::models::structure::AtomicStructure):
//! distances and midpoints honour the periodic boundary flags of the structure's
//! cell, so a slab that is periodic in-plane and finite along z never measures a
//! distance through its vacuum gap.

pub mod layers;
pub mod periodic;
pub mod sites;

use crate::core::models::structure::StructureError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error("At least {needed} candidate atoms are required, but {found} were given")]
    InsufficientAtoms { needed: usize, found: usize },

    #[error("No atoms of species '{0}' found in the structure")]
    SpeciesNotFound(String),
}
