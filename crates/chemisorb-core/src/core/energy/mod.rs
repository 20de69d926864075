//! Energies: reading them out of oracle logs, combining them into adsorption
//! energies and writing the summary report.

pub mod adsorption;
pub mod extract;
pub mod summary;
