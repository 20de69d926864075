use crate::core::models::structure::{AtomicStructure, StructureError};

/// Resolution at which two z-coordinates are considered the same layer, in Angstroms.
pub const LAYER_RESOLUTION: f64 = 1e-6;

/// Maps a z-coordinate onto an integer layer key at [`LAYER_RESOLUTION`].
///
/// Comparing integer keys instead of rounded floats keeps layer membership
/// exact and independent of the order atoms are visited in.
#[inline]
pub fn layer_key(z: f64) -> i64 {
    (z / LAYER_RESOLUTION).round() as i64
}

/// Returns the distinct layer keys of a structure in ascending order.
pub fn layer_keys(structure: &AtomicStructure) -> Vec<i64> {
    let mut keys: Vec<i64> = structure
        .atoms()
        .iter()
        .map(|a| layer_key(a.position.z))
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

/// Returns the distinct z-levels of a structure, rounded to [`LAYER_RESOLUTION`], ascending.
///
/// Physically distinct layers closer together than the resolution collapse
/// into one; choosing geometry that keeps them apart is up to the caller.
pub fn unique_layers(structure: &AtomicStructure) -> Vec<f64> {
    layer_keys(structure)
        .into_iter()
        .map(|k| k as f64 * LAYER_RESOLUTION)
        .collect()
}

/// Returns the indices of the atoms within `tolerance` of the highest z-coordinate.
///
/// # Arguments
///
/// * `structure` - The structure to inspect.
/// * `tolerance` - Maximum z-distance from the topmost atom, in Angstroms.
///
/// # Return
///
/// The ascending indices of the top-layer atoms together with the top z-coordinate.
///
/// # Errors
///
/// Returns [`StructureError::Empty`] for a structure without atoms.
pub fn top_layer_indices(
    structure: &AtomicStructure,
    tolerance: f64,
) -> Result<(Vec<usize>, f64), StructureError> {
    let candidates: Vec<usize> = (0..structure.len()).collect();
    top_layer_among(structure, &candidates, tolerance)
}

/// Like [`top_layer_indices`], restricted to atoms of one species.
pub fn top_layer_indices_of(
    structure: &AtomicStructure,
    symbol: &str,
    tolerance: f64,
) -> Result<(Vec<usize>, f64), StructureError> {
    top_layer_among(structure, &structure.indices_of(symbol), tolerance)
}

/// Finds the top layer among an explicit set of candidate atoms.
pub fn top_layer_among(
    structure: &AtomicStructure,
    candidates: &[usize],
    tolerance: f64,
) -> Result<(Vec<usize>, f64), StructureError> {
    let mut z_top = f64::NEG_INFINITY;
    for &i in candidates {
        z_top = z_top.max(structure.position(i)?.z);
    }
    if candidates.is_empty() {
        return Err(StructureError::Empty);
    }

    let mut indices: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&i| (structure.atoms()[i].position.z - z_top).abs() < tolerance)
        .collect();
    indices.sort_unstable();
    indices.dedup();
    Ok((indices, z_top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::cell::Cell;
    use nalgebra::Point3;

    fn layered(zs: &[f64]) -> AtomicStructure {
        let atoms = zs
            .iter()
            .enumerate()
            .map(|(i, &z)| Atom::new("Pt", Point3::new(i as f64, 0.0, z)))
            .collect();
        AtomicStructure::new(atoms, Cell::cubic(20.0, [true, true, false]).unwrap())
    }

    #[test]
    fn unique_layers_merges_values_within_resolution() {
        let s = layered(&[3.0, 1.0, 3.0000000001, 2.0, 1.0 - 2e-8]);
        let layers = unique_layers(&s);
        assert_eq!(layers.len(), 3);
        assert!((layers[0] - 1.0).abs() < 1e-9);
        assert!((layers[2] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn top_layer_respects_tolerance() {
        let s = layered(&[5.0, 7.0, 6.9995, 7.0005, 6.5]);
        let (indices, z_top) = top_layer_indices(&s, 1e-3).unwrap();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(z_top, 7.0005);
    }

    #[test]
    fn top_layer_of_species_ignores_other_atoms() {
        let s = layered(&[5.0, 5.0]).appended([Atom::new("C", Point3::new(0.0, 0.0, 7.0))]);
        let (indices, z_top) = top_layer_indices_of(&s, "Pt", 1e-3).unwrap();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(z_top, 5.0);
        let (all, _) = top_layer_indices(&s, 1e-3).unwrap();
        assert_eq!(all, vec![2]);
    }

    #[test]
    fn empty_candidates_are_rejected() {
        let s = layered(&[1.0]);
        assert_eq!(top_layer_indices_of(&s, "Au", 1e-3).unwrap_err(), StructureError::Empty);
    }
}
