use super::BuildError;
use crate::core::models::atom::Atom;
use crate::core::models::cell::Cell;
use crate::core::models::structure::AtomicStructure;
use nalgebra::{Point3, Vector3};
use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Experimental fcc lattice constants in Angstroms.
#[rustfmt::skip]
static FCC_LATTICE_CONSTANTS: Map<&'static str, f64> = phf_map! {
    "Pt" => 3.92, "Pd" => 3.89, "Ni" => 3.52, "Ir" => 3.84, "Rh" => 3.80,
    "Cu" => 3.61, "Ag" => 4.09, "Au" => 4.08,
    "Al" => 4.05, "Pb" => 4.95,
};

/// Looks up the reference fcc lattice constant of an element.
pub fn reference_lattice_constant(element: &str) -> Option<f64> {
    FCC_LATTICE_CONSTANTS.get(element).copied()
}

/// The surface termination of an fcc slab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    /// Close-packed (111) surface with a hexagonal in-plane cell.
    #[default]
    Fcc111,
    /// Square (100) surface.
    Fcc100,
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::Fcc111 => write!(f, "fcc111"),
            Facet::Fcc100 => write!(f, "fcc100"),
        }
    }
}

impl FromStr for Facet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fcc111" | "111" => Ok(Facet::Fcc111),
            "fcc100" | "100" => Ok(Facet::Fcc100),
            _ => Err(format!("Unknown facet '{}' (expected 'fcc111' or 'fcc100')", s)),
        }
    }
}

/// Parameters of a slab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabSpec {
    pub element: String,
    pub facet: Facet,
    /// Repeats along the two in-plane lattice vectors, then the number of layers.
    pub size: [usize; 3],
    /// Vacuum added on each side of the slab along z, in Angstroms.
    pub vacuum: f64,
    /// Cubic lattice constant; the reference value for `element` when `None`.
    pub lattice_constant: Option<f64>,
}

impl SlabSpec {
    pub fn new(element: &str, facet: Facet, size: [usize; 3], vacuum: f64) -> Self {
        Self {
            element: element.to_string(),
            facet,
            size,
            vacuum,
            lattice_constant: None,
        }
    }

    /// Resolves the lattice constant to use, validating explicit values.
    pub fn resolved_lattice_constant(&self) -> Result<f64, BuildError> {
        match self.lattice_constant {
            Some(a) if a.is_finite() && a > 0.0 => Ok(a),
            Some(a) => Err(BuildError::InvalidParameter {
                name: "lattice-constant",
                reason: format!("must be a positive number, got {}", a),
            }),
            None => reference_lattice_constant(&self.element)
                .ok_or_else(|| BuildError::UnknownElement(self.element.clone())),
        }
    }
}

/// Builds a periodic fcc slab.
///
/// Layers are stacked along +z and atoms are ordered from the bottom layer to
/// the top one. The top layer always carries an atom at the in-plane origin.
/// The cell is periodic in-plane and padded with `vacuum` on both sides along z,
/// which is not periodic.
///
/// # Errors
///
/// Returns [`BuildError::InvalidParameter`] for zero repeats or a negative
/// vacuum, and [`BuildError::UnknownElement`] when no lattice constant is given
/// and the element has no reference value.
pub fn build_slab(spec: &SlabSpec) -> Result<AtomicStructure, BuildError> {
    let [nx, ny, n_layers] = spec.size;
    if nx == 0 || ny == 0 || n_layers == 0 {
        return Err(BuildError::InvalidParameter {
            name: "size",
            reason: format!("every repeat must be at least 1, got {:?}", spec.size),
        });
    }
    if !spec.vacuum.is_finite() || spec.vacuum < 0.0 {
        return Err(BuildError::InvalidParameter {
            name: "vacuum",
            reason: format!("must be non-negative, got {}", spec.vacuum),
        });
    }
    let a = spec.resolved_lattice_constant()?;
    let d = a / 2f64.sqrt();

    // In-plane unit vectors of one surface atom, the in-plane shift of each
    // stacking position, the stacking period and the interlayer spacing.
    let (e1, e2, shift_unit, period, dz) = match spec.facet {
        Facet::Fcc111 => {
            let e1 = Vector3::new(d, 0.0, 0.0);
            let e2 = Vector3::new(0.5 * d, 0.5 * 3f64.sqrt() * d, 0.0);
            (e1, e2, (e1 + e2) / 3.0, 3, a / 3f64.sqrt())
        }
        Facet::Fcc100 => {
            let e1 = Vector3::new(d, 0.0, 0.0);
            let e2 = Vector3::new(0.0, d, 0.0);
            (e1, e2, (e1 + e2) / 2.0, 2, a / 2.0)
        }
    };

    let mut atoms = Vec::with_capacity(nx * ny * n_layers);
    for layer in 0..n_layers {
        let shift = shift_unit * ((n_layers - 1 - layer) % period) as f64;
        let z = spec.vacuum + layer as f64 * dz;
        for j in 0..ny {
            for i in 0..nx {
                let p = e1 * i as f64 + e2 * j as f64 + shift;
                atoms.push(Atom::new(&spec.element, Point3::new(p.x, p.y, z)));
            }
        }
    }

    let height = (n_layers - 1) as f64 * dz + 2.0 * spec.vacuum;
    if height <= 0.0 {
        return Err(BuildError::InvalidParameter {
            name: "vacuum",
            reason: "a single-layer slab needs a positive vacuum".to_string(),
        });
    }
    let cell = Cell::from_vectors(
        e1 * nx as f64,
        e2 * ny as f64,
        Vector3::new(0.0, 0.0, height),
        [true, true, false],
    )?;

    debug!(
        element = %spec.element,
        facet = %spec.facet,
        atoms = atoms.len(),
        lattice_constant = a,
        "Built slab"
    );
    Ok(AtomicStructure::new(atoms, cell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::layers::unique_layers;
    use crate::core::geometry::periodic::periodic_distance;

    fn pt111() -> SlabSpec {
        SlabSpec::new("Pt", Facet::Fcc111, [2, 2, 4], 10.0)
    }

    #[test]
    fn fcc111_slab_has_expected_layers_and_cell() {
        let slab = build_slab(&pt111()).unwrap();
        assert_eq!(slab.len(), 16);
        assert_eq!(slab.cell().pbc(), [true, true, false]);

        let layers = unique_layers(&slab);
        assert_eq!(layers.len(), 4);
        let dz = 3.92 / 3f64.sqrt();
        assert!((layers[0] - 10.0).abs() < 1e-6);
        assert!((layers[1] - layers[0] - dz).abs() < 1e-6);
        assert!((slab.cell().lengths()[2] - (3.0 * dz + 20.0)).abs() < 1e-9);
    }

    #[test]
    fn fcc111_nearest_neighbour_distance_matches_lattice_constant() {
        let slab = build_slab(&pt111()).unwrap();
        let d = 3.92 / 2f64.sqrt();
        // Last four atoms form the top layer.
        assert!((periodic_distance(&slab, 12, 13).unwrap() - d).abs() < 1e-9);
        // Neighbouring layers are also at the nearest-neighbour distance.
        let min_interlayer = (8..12)
            .map(|i| periodic_distance(&slab, i, 12).unwrap())
            .fold(f64::INFINITY, f64::min);
        assert!((min_interlayer - d).abs() < 1e-9);
    }

    #[test]
    fn fcc100_uses_square_cell_and_half_lattice_spacing() {
        let spec = SlabSpec {
            lattice_constant: Some(3.61),
            ..SlabSpec::new("Cu", Facet::Fcc100, [3, 3, 2], 8.0)
        };
        let slab = build_slab(&spec).unwrap();
        let lengths = slab.cell().lengths();
        assert!((lengths[0] - lengths[1]).abs() < 1e-12);
        let layers = unique_layers(&slab);
        assert!((layers[1] - layers[0] - 3.61 / 2.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_element_needs_explicit_lattice_constant() {
        let spec = SlabSpec::new("Xx", Facet::Fcc111, [1, 1, 1], 5.0);
        assert_eq!(build_slab(&spec).unwrap_err(), BuildError::UnknownElement("Xx".into()));
        let explicit = SlabSpec {
            lattice_constant: Some(4.0),
            ..spec
        };
        assert_eq!(build_slab(&explicit).unwrap().len(), 1);
    }

    #[test]
    fn zero_repeats_are_rejected() {
        let spec = SlabSpec::new("Pt", Facet::Fcc111, [2, 0, 4], 10.0);
        assert!(matches!(
            build_slab(&spec),
            Err(BuildError::InvalidParameter { name: "size", .. })
        ));
    }

    #[test]
    fn facet_parses_from_common_spellings() {
        assert_eq!("fcc111".parse::<Facet>().unwrap(), Facet::Fcc111);
        assert_eq!("100".parse::<Facet>().unwrap(), Facet::Fcc100);
        assert!("bcc110".parse::<Facet>().is_err());
    }
}
