use super::config::GeometryGuard;
use super::error::EngineError;
use crate::core::builder::molecule::Adsorbate;
use crate::core::geometry::GeometryError;
use crate::core::geometry::periodic::periodic_distance;
use crate::core::geometry::sites::Site;
use crate::core::models::structure::{AtomicStructure, StructureError};
use nalgebra::Vector3;
use tracing::debug;

/// Shifts smaller than this are not applied, which makes [`recenter`] idempotent.
const RECENTER_EPSILON: f64 = 1e-12;

/// Attaches an adsorbate to a copy of `structure` above a site.
///
/// The anchor atom lands at `site.position + height * z`; the other adsorbate
/// atoms keep their offsets from it. The new atoms are appended after the
/// existing ones, so every index of the input stays valid.
pub fn place_at_site(
    structure: &AtomicStructure,
    adsorbate: &Adsorbate,
    site: &Site,
    height: f64,
) -> AtomicStructure {
    let anchor = site.position + Vector3::z() * height;
    let offset = anchor.coords;
    structure.appended(adsorbate.atoms().iter().map(|a| a.translated(&offset)))
}

/// Centers the atoms of a structure along one cell axis.
///
/// The midpoint of the atoms' fractional extent along `axis` is moved to the
/// middle of the cell. The operation is idempotent, and it is what a measurement
/// of post-placement geometry must be taken after.
///
/// # Errors
///
/// Returns [`StructureError::InvalidAxis`] for `axis > 2` and
/// [`StructureError::Empty`] for a structure without atoms.
pub fn recenter(structure: &AtomicStructure, axis: usize) -> Result<AtomicStructure, StructureError> {
    if axis > 2 {
        return Err(StructureError::InvalidAxis(axis));
    }
    if structure.is_empty() {
        return Err(StructureError::Empty);
    }
    let cell = structure.cell();
    let (lo, hi) = structure
        .atoms()
        .iter()
        .map(|a| cell.to_fractional(&a.position)[axis])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), f| (lo.min(f), hi.max(f)));

    let shift = cell.vector(axis) * (0.5 - 0.5 * (lo + hi));
    if shift.norm() < RECENTER_EPSILON {
        return Ok(structure.clone());
    }
    Ok(structure.translated(&shift))
}

/// Measured geometry of a placed adsorbate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementReport {
    pub anchor_index: usize,
    /// Anchor z minus the highest surface-atom z, in Angstroms.
    pub height: f64,
    /// Smallest anchor-to-surface-atom distance, in Angstroms.
    pub min_distance: f64,
}

/// Measures the anchor atom's height above and closest approach to the surface atoms.
///
/// Distances use the minimum image along the periodic axes only, so an image
/// folded through the vacuum gap of a slab is never counted.
pub fn measure_placement(
    structure: &AtomicStructure,
    anchor_index: usize,
    surface: &[usize],
) -> Result<PlacementReport, GeometryError> {
    if surface.is_empty() {
        return Err(GeometryError::InsufficientAtoms { needed: 1, found: 0 });
    }
    let anchor_z = structure.position(anchor_index)?.z;
    let mut top_z = f64::NEG_INFINITY;
    let mut min_distance = f64::INFINITY;
    for &i in surface {
        top_z = top_z.max(structure.position(i)?.z);
        min_distance = min_distance.min(periodic_distance(structure, anchor_index, i)?);
    }
    Ok(PlacementReport {
        anchor_index,
        height: anchor_z - top_z,
        min_distance,
    })
}

/// Measures a placement and rejects it if it violates the guard.
///
/// # Errors
///
/// Returns [`EngineError::GeometryInvalid`] carrying the measured values.
pub fn check_placement(
    structure: &AtomicStructure,
    site: &Site,
    anchor_index: usize,
    surface: &[usize],
    guard: &GeometryGuard,
) -> Result<PlacementReport, EngineError> {
    let report = measure_placement(structure, anchor_index, surface)?;
    debug!(
        site = %site.kind,
        height = report.height,
        min_distance = report.min_distance,
        "Measured placement geometry"
    );
    if !guard.accepts(&report) {
        return Err(EngineError::GeometryInvalid {
            site: site.kind,
            height: report.height,
            min_distance: report.min_distance,
            min_height: guard.min_height,
            min_allowed_distance: guard.min_distance,
        });
    }
    Ok(report)
}
