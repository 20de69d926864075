use super::BuildError;
use crate::core::models::atom::Atom;
use crate::core::models::cell::Cell;
use crate::core::models::structure::{AtomicStructure, StructureError};
use nalgebra::{Point3, Vector3};

/// C-O bond length of gas-phase carbon monoxide used for the default adsorbate, in Angstroms.
pub const CO_BOND_LENGTH: f64 = 1.15;

/// Builds a non-periodic structure holding one molecule centered in a cubic box.
///
/// # Arguments
///
/// * `species` - Species symbol of each atom.
/// * `positions` - Position of each atom; only relative positions matter.
/// * `box_size` - Edge length of the padding box in Angstroms.
///
/// # Errors
///
/// Returns [`BuildError::MismatchedSpecies`] if the two slices differ in length,
/// [`BuildError::EmptyAdsorbate`] for an empty molecule, and
/// [`BuildError::InvalidParameter`] if the box cannot hold the molecule.
pub fn build_isolated_molecule(
    species: &[&str],
    positions: &[Point3<f64>],
    box_size: f64,
) -> Result<AtomicStructure, BuildError> {
    if species.len() != positions.len() {
        return Err(BuildError::MismatchedSpecies {
            species: species.len(),
            positions: positions.len(),
        });
    }
    let atoms: Vec<Atom> = species
        .iter()
        .zip(positions)
        .map(|(s, p)| Atom::new(s, *p))
        .collect();
    center_in_box(atoms, box_size)
}

fn center_in_box(atoms: Vec<Atom>, box_size: f64) -> Result<AtomicStructure, BuildError> {
    if atoms.is_empty() {
        return Err(BuildError::EmptyAdsorbate);
    }
    let mut lo = Vector3::repeat(f64::INFINITY);
    let mut hi = Vector3::repeat(f64::NEG_INFINITY);
    for atom in &atoms {
        lo = lo.inf(&atom.position.coords);
        hi = hi.sup(&atom.position.coords);
    }
    let extent = (hi - lo).max();
    if !box_size.is_finite() || box_size <= extent {
        return Err(BuildError::InvalidParameter {
            name: "box-size",
            reason: format!(
                "a box of {} Angstrom cannot hold a molecule spanning {:.3} Angstrom",
                box_size, extent
            ),
        });
    }

    let offset = Vector3::repeat(box_size / 2.0) - (lo + hi) / 2.0;
    let cell = Cell::cubic(box_size, [false; 3])?;
    Ok(AtomicStructure::new(atoms, cell).translated(&offset))
}

/// A small molecule to be attached to a surface.
///
/// The first atom is the anchor: it is the one placed at the site and the one
/// whose height and approach distance the placement guard measures. The
/// remaining atoms keep their positions relative to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Adsorbate {
    atoms: Vec<Atom>,
}

impl Adsorbate {
    /// Creates an adsorbate, re-expressing positions relative to the anchor atom.
    pub fn new(atoms: Vec<Atom>) -> Result<Self, BuildError> {
        let anchor = atoms.first().ok_or(BuildError::EmptyAdsorbate)?.position;
        let offset = Point3::origin() - anchor;
        Ok(Self {
            atoms: atoms.iter().map(|a| a.translated(&offset)).collect(),
        })
    }

    /// A diatomic molecule with the partner atom `bond_length` above the anchor along +z.
    pub fn diatomic(anchor: &str, partner: &str, bond_length: f64) -> Result<Self, BuildError> {
        if !bond_length.is_finite() || bond_length <= 0.0 {
            return Err(BuildError::InvalidParameter {
                name: "bond-length",
                reason: format!("must be positive, got {}", bond_length),
            });
        }
        Self::new(vec![
            Atom::new(anchor, Point3::origin()),
            Atom::new(partner, Point3::new(0.0, 0.0, bond_length)),
        ])
    }

    /// Carbon monoxide binding through carbon.
    pub fn co() -> Self {
        Self {
            atoms: vec![
                Atom::new("C", Point3::origin()),
                Atom::new("O", Point3::new(0.0, 0.0, CO_BOND_LENGTH)),
            ],
        }
    }

    /// Atoms relative to the anchor, which sits at the origin.
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn anchor_symbol(&self) -> &str {
        &self.atoms[0].symbol
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Formula-like label such as "CO".
    pub fn label(&self) -> String {
        self.atoms.iter().map(|a| a.symbol.as_str()).collect()
    }

    /// The gas-phase reference: this molecule alone in a non-periodic box.
    pub fn to_isolated(&self, box_size: f64) -> Result<AtomicStructure, BuildError> {
        center_in_box(self.atoms.clone(), box_size)
    }
}

impl TryFrom<&AtomicStructure> for Adsorbate {
    type Error = BuildError;

    fn try_from(structure: &AtomicStructure) -> Result<Self, Self::Error> {
        if structure.is_empty() {
            return Err(BuildError::Structure(StructureError::Empty));
        }
        Self::new(structure.atoms().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolated_molecule_is_centered_and_non_periodic() {
        let s = build_isolated_molecule(
            &["C", "O"],
            &[Point3::new(1.0, 1.0, 1.0), Point3::new(1.0, 1.0, 2.15)],
            12.0,
        )
        .unwrap();
        assert_eq!(s.cell().pbc(), [false; 3]);
        let mid = (s.atoms()[0].position.coords + s.atoms()[1].position.coords) / 2.0;
        assert!((mid - Vector3::repeat(6.0)).norm() < 1e-12);
        assert!(((s.atoms()[1].position - s.atoms()[0].position).norm() - 1.15).abs() < 1e-12);
    }

    #[test]
    fn isolated_molecule_validates_inputs() {
        assert_eq!(
            build_isolated_molecule(&["C"], &[], 10.0).unwrap_err(),
            BuildError::MismatchedSpecies { species: 1, positions: 0 }
        );
        assert_eq!(build_isolated_molecule(&[], &[], 10.0).unwrap_err(), BuildError::EmptyAdsorbate);
        assert!(matches!(
            build_isolated_molecule(&["C", "O"], &[Point3::origin(), Point3::new(0.0, 0.0, 5.0)], 4.0),
            Err(BuildError::InvalidParameter { name: "box-size", .. })
        ));
    }

    #[test]
    fn adsorbate_positions_are_relative_to_the_anchor() {
        let ads = Adsorbate::new(vec![
            Atom::new("N", Point3::new(2.0, 2.0, 2.0)),
            Atom::new("O", Point3::new(2.0, 2.0, 3.2)),
        ])
        .unwrap();
        assert_eq!(ads.atoms()[0].position, Point3::origin());
        assert!((ads.atoms()[1].position.z - 1.2).abs() < 1e-12);
        assert_eq!(ads.anchor_symbol(), "N");
        assert_eq!(ads.label(), "NO");
    }

    #[test]
    fn co_matches_diatomic_constructor() {
        assert_eq!(Adsorbate::co(), Adsorbate::diatomic("C", "O", CO_BOND_LENGTH).unwrap());
        assert_eq!(Adsorbate::co().to_isolated(10.0).unwrap().len(), 2);
        assert!(Adsorbate::new(vec![]).is_err());
    }
}
