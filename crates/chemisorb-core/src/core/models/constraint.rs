use super::structure::StructureError;
use nalgebra::Vector3;
use std::collections::BTreeSet;

/// The set of atoms held fixed during one relaxation run.
///
/// A constraint is derived once from geometry before a run starts and is not
/// modified afterwards; the optimizer zeroes the forces on these atoms and never
/// moves them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedAtoms {
    indices: BTreeSet<usize>,
}

impl FixedAtoms {
    pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
        }
    }

    /// A constraint that freezes nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds a constraint from a per-atom boolean mask.
    pub fn from_mask(mask: &[bool]) -> Self {
        Self::new(
            mask.iter()
                .enumerate()
                .filter(|(_, fixed)| **fixed)
                .map(|(i, _)| i),
        )
    }

    #[inline]
    pub fn is_fixed(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Returns the frozen indices in ascending order.
    pub fn indices(&self) -> Vec<usize> {
        self.indices.iter().copied().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn mask(&self, n_atoms: usize) -> Vec<bool> {
        (0..n_atoms).map(|i| self.is_fixed(i)).collect()
    }

    /// Checks that every frozen index refers to an atom of a structure of `n_atoms` atoms.
    pub fn validate(&self, n_atoms: usize) -> Result<(), StructureError> {
        match self.indices.iter().next_back() {
            Some(&max) if max >= n_atoms => Err(StructureError::IndexOutOfRange {
                index: max,
                len: n_atoms,
            }),
            _ => Ok(()),
        }
    }

    /// Returns `forces` with the entries of frozen atoms set to zero.
    pub fn masked_forces(&self, forces: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
        forces
            .iter()
            .enumerate()
            .map(|(i, f)| if self.is_fixed(i) { Vector3::zeros() } else { *f })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_mask_collects_true_entries() {
        let fixed = FixedAtoms::from_mask(&[true, false, true, false]);
        assert_eq!(fixed.indices(), vec![0, 2]);
        assert_eq!(fixed.mask(4), vec![true, false, true, false]);
    }

    #[test]
    fn validate_rejects_indices_beyond_structure() {
        let fixed = FixedAtoms::new([1, 7]);
        assert!(fixed.validate(8).is_ok());
        assert_eq!(
            fixed.validate(5).unwrap_err(),
            StructureError::IndexOutOfRange { index: 7, len: 5 }
        );
        assert!(FixedAtoms::none().validate(0).is_ok());
    }

    #[test]
    fn masked_forces_zeroes_frozen_atoms_only() {
        let fixed = FixedAtoms::new([0]);
        let forces = vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(-1.0, 0.0, 0.5)];
        let masked = fixed.masked_forces(&forces);
        assert_eq!(masked[0], Vector3::zeros());
        assert_eq!(masked[1], forces[1]);
    }
}
