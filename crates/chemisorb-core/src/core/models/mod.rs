//! # Core Models Module
//!
//! This module contains the value types every stage of the adsorption pipeline
//! passes to the next one.
//!
//! ## Overview
//!
//! All models are plain immutable values: operations that change geometry
//! (wrapping, translating, appending atoms) return a new value instead of
//! mutating the receiver. This keeps a relaxed slab safely shareable between
//! independent site variants.
//!
//! ## Key Components
//!
//! - [`atom`] - A single atom: species symbol and Cartesian position
//! - [`cell`] - Lattice vectors with per-axis periodic boundary flags
//! - [`structure`] - An ordered atom list inside a cell
//! - [`constraint`] - The set of atoms frozen during a relaxation run
//! - [`calculation`] - Oracle results, their provenance and the oracle configuration
//!
//! ## Usage
//!
//! ```ignore
//! use chemisorb::core::models::{atom::Atom, cell::Cell, structure::AtomicStructure};
//!
//! let cell = Cell::cubic(10.0, [true, true, true])?;
//! let structure = AtomicStructure::new(vec![Atom::new("Pt", Point3::origin())], cell);
//! let wrapped = structure.wrap();
//! ```

pub mod atom;
pub mod calculation;
pub mod cell;
pub mod constraint;
pub mod structure;
