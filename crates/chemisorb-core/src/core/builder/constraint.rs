use super::BuildError;
use crate::core::geometry::layers::{layer_key, layer_keys};
use crate::core::models::constraint::FixedAtoms;
use crate::core::models::structure::AtomicStructure;

/// Freezes every atom in the `n_layers_to_fix` lowest layers of a structure.
///
/// Layers are the distinct z-coordinates at the layer resolution of
/// [`layer_key`]. The cutoff is the `n_layers_to_fix`-th smallest of them and
/// every atom at or below it is frozen, so the result does not depend on the
/// order atoms appear in.
///
/// # Arguments
///
/// * `structure` - The slab to derive the constraint from.
/// * `n_layers_to_fix` - How many of the lowest layers to freeze; 0 freezes nothing.
///
/// # Errors
///
/// Returns [`BuildError::TooFewLayers`] if the structure has fewer distinct layers
/// than requested.
pub fn build_constraint(
    structure: &AtomicStructure,
    n_layers_to_fix: usize,
) -> Result<FixedAtoms, BuildError> {
    if n_layers_to_fix == 0 {
        return Ok(FixedAtoms::none());
    }
    let keys = layer_keys(structure);
    let cutoff = *keys
        .get(n_layers_to_fix - 1)
        .ok_or(BuildError::TooFewLayers {
            requested: n_layers_to_fix,
            found: keys.len(),
        })?;

    Ok(FixedAtoms::new(
        structure
            .atoms()
            .iter()
            .enumerate()
            .filter(|(_, a)| layer_key(a.position.z) <= cutoff)
            .map(|(i, _)| i),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::cell::Cell;
    use nalgebra::Point3;

    fn structure_with_levels(zs: &[f64]) -> AtomicStructure {
        let atoms = zs
            .iter()
            .enumerate()
            .map(|(i, &z)| Atom::new("Pt", Point3::new(i as f64 * 0.5, 0.0, z)))
            .collect();
        AtomicStructure::new(atoms, Cell::cubic(30.0, [true, true, false]).unwrap())
    }

    #[test]
    fn fixing_bottom_two_of_four_levels_freezes_exactly_those_atoms() {
        let zs = [10.0, 12.0, 14.0, 16.0, 10.0 + 3e-7, 12.0, 14.0, 16.0 - 2e-7];
        let fixed = build_constraint(&structure_with_levels(&zs), 2).unwrap();
        assert_eq!(fixed.indices(), vec![0, 1, 4, 5]);
    }

    #[test]
    fn result_is_independent_of_atom_order() {
        let zs = [16.0, 10.0, 14.0, 12.0, 16.0, 12.0, 10.0, 14.0];
        let fixed = build_constraint(&structure_with_levels(&zs), 2).unwrap();
        let expected: Vec<usize> = zs
            .iter()
            .enumerate()
            .filter(|(_, z)| **z <= 12.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(fixed.indices(), expected);
        assert_eq!(fixed.len(), 4);
    }

    #[test]
    fn zero_layers_freeze_nothing_and_too_many_is_an_error() {
        let s = structure_with_levels(&[1.0, 2.0, 3.0]);
        assert!(build_constraint(&s, 0).unwrap().is_empty());
        assert_eq!(build_constraint(&s, 3).unwrap().len(), 3);
        assert_eq!(
            build_constraint(&s, 4).unwrap_err(),
            BuildError::TooFewLayers { requested: 4, found: 3 }
        );
    }
}
