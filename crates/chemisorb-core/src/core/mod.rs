//! # Core Module
//!
//! Stateless models and pure algorithms for chemisorption calculations. Nothing
//! in this layer talks to an oracle or keeps state between calls.
//!
//! ## Architecture
//!
//! - **Structures** ([`models`]) - Atoms, periodic cells, structures, constraints and calculation results
//! - **Construction** ([`builder`]) - fcc slabs, bottom-layer constraints, adsorbates and gas-phase boxes
//! - **Geometry** ([`geometry`]) - Minimum-image distances and midpoints, layer detection, site search
//! - **Energetics** ([`energy`]) - Log energy extraction, adsorption energies, site ranking, summary reports
//! - **File I/O** ([`io`]) - Extended XYZ reading and writing
//!
//! ## Conventions
//!
//! Lengths are in Angstroms, energies in eV and forces in eV/Angstrom. The
//! surface normal of a slab is the +z axis, and z is the non-periodic axis.

pub mod builder;
pub mod energy;
pub mod geometry;
pub mod io;
pub mod models;
