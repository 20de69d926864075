//! # chemisorb Core Library
//!
//! Chemisorption energetics of small adsorbates on periodic metal slabs:
//! structure building, surface-site analysis under periodic boundary
//! conditions, adsorbate placement, geometry relaxation against an external
//! energy/force oracle, and adsorption energies compared across binding sites.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`AtomicStructure`,
//!   `Cell`, `FixedAtoms`), pure geometry (minimum-image distances, layers,
//!   sites), structure builders, energy arithmetic and the extended-XYZ adapter.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer. It defines the
//!   `Oracle` seam, drives BFGS relaxations, places adsorbates behind a
//!   geometry guard, and lays out the artifacts of every stage in an explicit
//!   `PipelineContext`.
//!
//! - **[`workflows`]: The Public API.** Complete procedures built from the two
//!   layers below: the full adsorption pipeline, a log-based energy comparison
//!   and a geometry inspection.
//!
//! No electronic-structure method lives here. Energies and forces come from
//! an [`Oracle`](engine::oracle::Oracle) implementation supplied by the caller.

pub mod core;
pub mod engine;
pub mod workflows;
