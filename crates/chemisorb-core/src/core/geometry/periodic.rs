use crate::core::models::cell::Cell;
use crate::core::models::structure::{AtomicStructure, StructureError};
use nalgebra::{Point3, Vector3};

/// Computes the minimum-image displacement from `from` to `to`.
///
/// The raw displacement is first reduced to fractional components in
/// `[-0.5, 0.5]` along every periodic axis, then the 27 (or fewer, when some
/// axes are not periodic) neighbouring images are compared. The second pass is
/// what makes the result correct for skewed cells such as the hexagonal cell of
/// an fcc(111) slab, where the fractional reduction alone can miss the shortest
/// image.
///
/// # Arguments
///
/// * `cell` - The cell providing lattice vectors and periodic boundary flags.
/// * `from` - The start point.
/// * `to` - The end point.
///
/// # Return
///
/// The shortest vector `v` such that `from + v` is a periodic image of `to`.
pub fn mic_displacement(cell: &Cell, from: &Point3<f64>, to: &Point3<f64>) -> Vector3<f64> {
    let mut frac = cell.to_fractional_vector(&(to - from));
    for axis in 0..3 {
        if cell.is_periodic(axis) {
            frac[axis] -= frac[axis].round();
        }
    }
    let reduced = cell.to_cartesian_vector(&frac);

    let range = |axis: usize| if cell.is_periodic(axis) { -1..=1 } else { 0..=0 };
    let mut best = reduced;
    let mut best_norm = reduced.norm_squared();
    for n0 in range(0) {
        for n1 in range(1) {
            for n2 in range(2) {
                if n0 == 0 && n1 == 0 && n2 == 0 {
                    continue;
                }
                let shift = Vector3::new(n0 as f64, n1 as f64, n2 as f64);
                let candidate = reduced + cell.to_cartesian_vector(&shift);
                let norm = candidate.norm_squared();
                if norm < best_norm {
                    best = candidate;
                    best_norm = norm;
                }
            }
        }
    }
    best
}

/// Returns the minimum-image displacement vector from atom `i` to atom `j`.
pub fn periodic_displacement(
    structure: &AtomicStructure,
    i: usize,
    j: usize,
) -> Result<Vector3<f64>, StructureError> {
    let ri = structure.position(i)?;
    let rj = structure.position(j)?;
    Ok(mic_displacement(structure.cell(), &ri, &rj))
}

/// Returns the minimum distance between atoms `i` and `j` over all periodic images.
pub fn periodic_distance(
    structure: &AtomicStructure,
    i: usize,
    j: usize,
) -> Result<f64, StructureError> {
    periodic_displacement(structure, i, j).map(|v| v.norm())
}

/// Returns the distance between atoms `i` and `j`, optionally under the minimum-image convention.
///
/// With `mic = false` the raw Cartesian distance is returned, which is what a
/// sanity check wants when it must not be fooled by an image folded through
/// a vacuum gap.
pub fn distance(
    structure: &AtomicStructure,
    i: usize,
    j: usize,
    mic: bool,
) -> Result<f64, StructureError> {
    if mic {
        periodic_distance(structure, i, j)
    } else {
        Ok((structure.position(j)? - structure.position(i)?).norm())
    }
}

/// Returns the periodic-aware midpoint of atoms `i` and `j`.
///
/// The midpoint is `r_i + v / 2` where `v` is the minimum-image displacement from
/// `i` to `j`. It is anchored on atom `i` and may lie outside the cell; wrap it
/// with [`Cell::wrap_point`] if a point inside the cell is needed.
pub fn periodic_midpoint(
    structure: &AtomicStructure,
    i: usize,
    j: usize,
) -> Result<Point3<f64>, StructureError> {
    let ri = structure.position(i)?;
    let v = periodic_displacement(structure, i, j)?;
    Ok(ri + 0.5 * v)
}
