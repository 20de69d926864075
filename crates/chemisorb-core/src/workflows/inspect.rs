use crate::core::geometry::GeometryError;
use crate::core::geometry::periodic::distance;
use crate::core::models::structure::AtomicStructure;
use crate::engine::config::GeometryGuard;
use crate::engine::error::EngineError;
use crate::engine::placement::PlacementReport;
use tracing::{info, instrument, warn};

/// Geometry of an adsorbate over a surface, as found in a structure file.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionReport {
    /// Index of the inspected adsorbate anchor atom.
    pub anchor_index: usize,
    pub surface_atoms: usize,
    /// Anchor z minus the highest surface-atom z, in Angstroms.
    pub height: f64,
    /// Smallest plain Cartesian anchor-to-surface distance, in Angstroms.
    pub min_distance: f64,
    /// Surface atom at `min_distance`.
    pub nearest_surface_atom: usize,
    /// Whether the geometry passes the guard it was checked against.
    pub accepted: bool,
}

/// Measures how an adsorbate sits above a surface.
///
/// The anchor is the last atom of `anchor_species`, which is where an
/// appended adsorbate ends up. Distances are plain Cartesian distances: a
/// minimum-image distance could pair the anchor with a surface image folded
/// through the vacuum gap.
#[instrument(skip_all, name = "inspect_workflow")]
pub fn run(
    structure: &AtomicStructure,
    anchor_species: &str,
    surface_species: &str,
    guard: &GeometryGuard,
) -> Result<InspectionReport, EngineError> {
    let anchor_index = *structure
        .indices_of(anchor_species)
        .last()
        .ok_or_else(|| GeometryError::SpeciesNotFound(anchor_species.to_string()))?;
    let surface = structure.indices_of(surface_species);
    if surface.is_empty() {
        return Err(GeometryError::SpeciesNotFound(surface_species.to_string()).into());
    }

    let anchor_z = structure.position(anchor_index)?.z;
    let mut top_z = f64::NEG_INFINITY;
    let mut nearest = (surface[0], f64::INFINITY);
    for &i in &surface {
        top_z = top_z.max(structure.position(i)?.z);
        let d = distance(structure, anchor_index, i, false)?;
        if d < nearest.1 {
            nearest = (i, d);
        }
    }

    let height = anchor_z - top_z;
    let accepted = guard.accepts(&PlacementReport {
        anchor_index,
        height,
        min_distance: nearest.1,
    });
    if accepted {
        info!(height, min_distance = nearest.1, "Adsorbate geometry looks sane.");
    } else {
        warn!(height, min_distance = nearest.1, "Adsorbate sits too close to the surface.");
    }

    Ok(InspectionReport {
        anchor_index,
        surface_atoms: surface.len(),
        height,
        min_distance: nearest.1,
        nearest_surface_atom: nearest.0,
        accepted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::cell::Cell;
    use nalgebra::Point3;

    fn structure(c_z: f64) -> AtomicStructure {
        AtomicStructure::new(
            vec![
                Atom::new("Pt", Point3::new(0.0, 0.0, 1.0)),
                Atom::new("Pt", Point3::new(2.0, 0.0, 3.0)),
                Atom::new("C", Point3::new(9.0, 9.0, 19.5)),
                Atom::new("C", Point3::new(2.0, 0.0, c_z)),
                Atom::new("O", Point3::new(2.0, 0.0, c_z + 1.15)),
            ],
            Cell::orthorhombic(10.0, 10.0, 20.0, [true, true, false]).unwrap(),
        )
    }

    #[test]
    fn last_anchor_atom_is_measured_without_minimum_image() {
        let report = run(&structure(4.85), "C", "Pt", &GeometryGuard::default()).unwrap();
        assert_eq!(report.anchor_index, 3);
        assert_eq!(report.surface_atoms, 2);
        assert_eq!(report.nearest_surface_atom, 1);
        assert!((report.height - 1.85).abs() < 1e-12);
        assert!((report.min_distance - 1.85).abs() < 1e-12);
        assert!(report.accepted);
    }

    #[test]
    fn low_adsorbate_is_flagged() {
        let report = run(&structure(4.0), "C", "Pt", &GeometryGuard::default()).unwrap();
        assert!(!report.accepted);
    }

    #[test]
    fn missing_species_is_an_error() {
        assert!(matches!(
            run(&structure(4.85), "N", "Pt", &GeometryGuard::default()),
            Err(EngineError::Geometry(GeometryError::SpeciesNotFound(_)))
        ));
    }
}
