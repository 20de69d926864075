//! # Workflows Module
//!
//! High-level entry points that tie the [`engine`](crate::engine) and
//! [`core`](crate::core) layers together into complete procedures.
//!
//! - **Adsorption Workflow** ([`adsorption`]) - Slab preparation, gas-phase
//!   reference, per-site placement and relaxation, ranking of the sites.
//! - **Comparison Workflow** ([`compare`]) - Adsorption energies recovered from
//!   the text logs of an earlier or external run.
//! - **Inspection Workflow** ([`inspect`]) - Sanity check of an adsorbate's
//!   height and closest approach in a structure file.
//!
//! Workflows return structured reports and leave presentation to the caller.

pub mod adsorption;
pub mod compare;
pub mod inspect;
