//! Constructors for the structures the pipeline starts from.
//!
//! - [`slab`] - Periodic fcc metal slabs with vacuum padding
//! - [`constraint`] - Bottom-layer fixing derived from slab geometry
//! - [`molecule`] - Adsorbates and isolated gas-phase molecules

pub mod constraint;
pub mod molecule;
pub mod slab;

use crate::core::models::structure::StructureError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("No reference lattice constant for element '{0}'; supply one explicitly")]
    UnknownElement(String),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Cannot fix {requested} layers: the structure has only {found} distinct layers")]
    TooFewLayers { requested: usize, found: usize },

    #[error("Got {species} species for {positions} positions")]
    MismatchedSpecies { species: usize, positions: usize },

    #[error("An adsorbate needs at least one atom")]
    EmptyAdsorbate,

    #[error(transparent)]
    Structure(#[from] StructureError),
}
