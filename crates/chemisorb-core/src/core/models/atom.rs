use nalgebra::{Point3, Vector3};

/// Represents a single atom of an atomic structure.
///
/// An atom carries only what the interchange format and the oracle need:
/// its chemical species and its Cartesian position in Angstroms. Any
/// per-atom data produced by a calculation (forces, for instance) lives in
/// the calculation result, not on the atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The chemical species symbol (e.g., "Pt", "C", "O").
    pub symbol: String,
    /// The Cartesian coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    /// Creates a new `Atom` of the given species at the given position.
    ///
    /// # Arguments
    ///
    /// * `symbol` - The chemical species symbol.
    /// * `position` - The Cartesian coordinates of the atom.
    pub fn new(symbol: &str, position: Point3<f64>) -> Self {
        Self {
            symbol: symbol.to_string(),
            position,
        }
    }

    /// Returns a copy of this atom moved by `offset`.
    ///
    /// # Arguments
    ///
    /// * `offset` - The translation vector in Angstroms.
    ///
    /// # Return
    ///
    /// A new `Atom` with the same species at `position + offset`.
    pub fn translated(&self, offset: &Vector3<f64>) -> Self {
        Self {
            symbol: self.symbol.clone(),
            position: self.position + offset,
        }
    }

    /// Checks whether this atom belongs to the given species.
    #[inline]
    pub fn is(&self, symbol: &str) -> bool {
        self.symbol == symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_stores_symbol_and_position() {
        let atom = Atom::new("Pt", Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.symbol, "Pt");
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn translated_returns_moved_copy_and_leaves_original() {
        let atom = Atom::new("C", Point3::new(0.0, 0.0, 1.0));
        let moved = atom.translated(&Vector3::new(1.0, -1.0, 0.5));
        assert_eq!(moved.position, Point3::new(1.0, -1.0, 1.5));
        assert_eq!(moved.symbol, "C");
        assert_eq!(atom.position, Point3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn is_matches_species_exactly() {
        let atom = Atom::new("Pt", Point3::origin());
        assert!(atom.is("Pt"));
        assert!(!atom.is("pt"));
        assert!(!atom.is("P"));
    }
}
