use super::atom::Atom;
use super::cell::Cell;
use nalgebra::{Point3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructureError {
    #[error("Cell lattice vectors are linearly dependent")]
    SingularCell,

    #[error("Atom index {index} is out of range for a structure of {len} atoms")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Axis {axis} is not periodic; wrapping along it is not defined")]
    NonPeriodicAxis { axis: usize },

    #[error("Invalid axis {0}; expected 0, 1 or 2")]
    InvalidAxis(usize),

    #[error("Expected {expected} positions but {found} were supplied")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Structure contains no atoms")]
    Empty,
}

/// An ordered list of atoms inside a periodic (or padding) cell.
///
/// Atom order is significant: constraints, sites and forces all refer to atoms
/// by index. Every geometric operation returns a new structure and leaves the
/// receiver untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicStructure {
    atoms: Vec<Atom>,
    cell: Cell,
}

impl AtomicStructure {
    /// Creates a structure from atoms and a cell.
    ///
    /// # Arguments
    ///
    /// * `atoms` - The atoms, in the order later stages will index them.
    /// * `cell` - The simulation cell, including periodic boundary flags.
    pub fn new(atoms: Vec<Atom>, cell: Cell) -> Self {
        Self { atoms, cell }
    }

    #[inline]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    #[inline]
    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Retrieves an atom by index.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::IndexOutOfRange`] if `index` is not a valid atom index.
    pub fn atom(&self, index: usize) -> Result<&Atom, StructureError> {
        self.atoms.get(index).ok_or(StructureError::IndexOutOfRange {
            index,
            len: self.atoms.len(),
        })
    }

    /// Returns the position of an atom by index.
    pub fn position(&self, index: usize) -> Result<Point3<f64>, StructureError> {
        self.atom(index).map(|a| a.position)
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.atoms.iter().map(|a| a.symbol.as_str()).collect()
    }

    /// Returns the indices of every atom of the given species, in ascending order.
    pub fn indices_of(&self, symbol: &str) -> Vec<usize> {
        self.atoms
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is(symbol))
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns a copy of this structure with new atom positions.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::LengthMismatch`] if `positions` does not hold one
    /// position per atom.
    pub fn with_positions(&self, positions: &[Point3<f64>]) -> Result<Self, StructureError> {
        if positions.len() != self.atoms.len() {
            return Err(StructureError::LengthMismatch {
                expected: self.atoms.len(),
                found: positions.len(),
            });
        }
        let atoms = self
            .atoms
            .iter()
            .zip(positions)
            .map(|(atom, &position)| Atom {
                symbol: atom.symbol.clone(),
                position,
            })
            .collect();
        Ok(Self {
            atoms,
            cell: self.cell,
        })
    }

    /// Returns a copy of this structure inside a different cell.
    ///
    /// Cartesian positions are kept as they are.
    pub fn with_cell(&self, cell: Cell) -> Self {
        Self {
            atoms: self.atoms.clone(),
            cell,
        }
    }

    /// Returns a copy with different periodic boundary flags.
    pub fn with_pbc(&self, pbc: [bool; 3]) -> Self {
        self.with_cell(self.cell.with_pbc(pbc))
    }

    /// Returns a copy with `extra` appended after the existing atoms.
    pub fn appended(&self, extra: impl IntoIterator<Item = Atom>) -> Self {
        let mut atoms = self.atoms.clone();
        atoms.extend(extra);
        Self {
            atoms,
            cell: self.cell,
        }
    }

    /// Returns a copy with every atom moved by `offset`.
    pub fn translated(&self, offset: &Vector3<f64>) -> Self {
        Self {
            atoms: self.atoms.iter().map(|a| a.translated(offset)).collect(),
            cell: self.cell,
        }
    }

    /// Returns a copy with every atom mapped back into the cell along the periodic axes.
    ///
    /// Non-periodic axes are left alone, so a slab with a vacuum gap along z is
    /// never folded through the vacuum.
    pub fn wrap(&self) -> Self {
        Self {
            atoms: self
                .atoms
                .iter()
                .map(|a| Atom {
                    symbol: a.symbol.clone(),
                    position: self.cell.wrap_point(&a.position),
                })
                .collect(),
            cell: self.cell,
        }
    }

    /// Returns a copy wrapped along a single axis.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NonPeriodicAxis`] if the axis is not periodic, and
    /// [`StructureError::InvalidAxis`] if `axis > 2`.
    pub fn wrap_axis(&self, axis: usize) -> Result<Self, StructureError> {
        if axis > 2 {
            return Err(StructureError::InvalidAxis(axis));
        }
        if !self.cell.is_periodic(axis) {
            return Err(StructureError::NonPeriodicAxis { axis });
        }
        let atoms = self
            .atoms
            .iter()
            .map(|a| {
                let mut frac = self.cell.to_fractional(&a.position);
                frac[axis] -= frac[axis].floor();
                Atom {
                    symbol: a.symbol.clone(),
                    position: self.cell.to_cartesian(&frac),
                }
            })
            .collect();
        Ok(Self {
            atoms,
            cell: self.cell,
        })
    }

    /// Computes a hash identifying species, positions and cell bit-for-bit.
    ///
    /// Used to tie calculation results and restored oracle states to the exact
    /// geometry that produced them. The value is FNV-1a over a fixed byte
    /// encoding, so it stays valid in checkpoints across builds.
    pub fn fingerprint(&self) -> u64 {
        let mut hash = Fnv1a::default();
        hash.write(&(self.atoms.len() as u64).to_le_bytes());
        for atom in &self.atoms {
            hash.write(atom.symbol.as_bytes());
            hash.write(&[0]);
            for c in atom.position.coords.iter() {
                hash.write(&c.to_bits().to_le_bytes());
            }
        }
        for c in self.cell.matrix().iter() {
            hash.write(&c.to_bits().to_le_bytes());
        }
        hash.write(&self.cell.pbc().map(u8::from));
        hash.0
    }
}

struct Fnv1a(u64);

impl Default for Fnv1a {
    fn default() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }
}

impl Fnv1a {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u64::from(b);
            self.0 = self.0.wrapping_mul(0x0000_0100_0000_01b3);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_atom_structure() -> AtomicStructure {
        let cell = Cell::cubic(10.0, [true, true, false]).unwrap();
        AtomicStructure::new(
            vec![
                Atom::new("Pt", Point3::new(11.0, -2.0, 3.0)),
                Atom::new("C", Point3::new(1.0, 1.0, 14.0)),
            ],
            cell,
        )
    }

    #[test]
    fn atom_lookup_reports_out_of_range_index() {
        let s = two_atom_structure();
        assert!(s.atom(1).is_ok());
        assert_eq!(
            s.atom(5).unwrap_err(),
            StructureError::IndexOutOfRange { index: 5, len: 2 }
        );
    }

    #[test]
    fn wrap_only_touches_periodic_axes() {
        let s = two_atom_structure().wrap();
        assert!((s.atoms()[0].position - Point3::new(1.0, 8.0, 3.0)).norm() < 1e-12);
        assert!((s.atoms()[1].position - Point3::new(1.0, 1.0, 14.0)).norm() < 1e-12);
    }

    #[test]
    fn wrap_axis_rejects_non_periodic_axis() {
        let s = two_atom_structure();
        assert_eq!(
            s.wrap_axis(2).unwrap_err(),
            StructureError::NonPeriodicAxis { axis: 2 }
        );
        assert_eq!(s.wrap_axis(3).unwrap_err(), StructureError::InvalidAxis(3));
        let wrapped = s.wrap_axis(0).unwrap();
        assert!((wrapped.atoms()[0].position.x - 1.0).abs() < 1e-12);
        assert!((wrapped.atoms()[0].position.y + 2.0).abs() < 1e-12);
    }

    #[test]
    fn with_positions_requires_one_position_per_atom() {
        let s = two_atom_structure();
        let err = s.with_positions(&[Point3::origin()]).unwrap_err();
        assert_eq!(err, StructureError::LengthMismatch { expected: 2, found: 1 });
    }

    #[test]
    fn appended_and_translated_do_not_mutate_the_input() {
        let s = two_atom_structure();
        let bigger = s.appended([Atom::new("O", Point3::new(0.0, 0.0, 15.0))]);
        let moved = s.translated(&Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(s.len(), 2);
        assert_eq!(bigger.len(), 3);
        assert_eq!(bigger.indices_of("O"), vec![2]);
        assert_eq!(moved.atoms()[1].position.z, 15.0);
        assert_eq!(s.atoms()[1].position.z, 14.0);
    }

    #[test]
    fn fingerprint_changes_with_geometry() {
        let s = two_atom_structure();
        let same = two_atom_structure();
        let moved = s.translated(&Vector3::new(1e-9, 0.0, 0.0));
        assert_eq!(s.fingerprint(), same.fingerprint());
        assert_ne!(s.fingerprint(), moved.fingerprint());
        assert_ne!(s.fingerprint(), s.with_pbc([true; 3]).fingerprint());
    }

    #[test]
    fn fingerprint_is_a_fixed_value() {
        let s = AtomicStructure::new(
            vec![Atom::new("H", Point3::new(1.0, 2.0, 3.0))],
            Cell::cubic(10.0, [false; 3]).unwrap(),
        );
        assert_eq!(s.fingerprint(), 0x425a_bea4_3b9a_e10f);
    }
}
