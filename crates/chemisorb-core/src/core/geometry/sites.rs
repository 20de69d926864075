use super::GeometryError;
use super::layers::top_layer_among;
use super::periodic::{periodic_distance, periodic_midpoint};
use crate::core::models::structure::AtomicStructure;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distances closer than this are treated as equal when ranking atom pairs.
const TIE_TOLERANCE: f64 = 1e-9;

/// The adsorption site variants the pipeline knows how to locate.
///
/// The declaration order doubles as the tie-break order when two sites bind
/// equally strongly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiteKind {
    /// Directly above a single surface atom.
    OnTop,
    /// Above the midpoint of two neighbouring surface atoms.
    Bridge,
}

impl SiteKind {
    pub const ALL: [SiteKind; 2] = [SiteKind::OnTop, SiteKind::Bridge];

    pub fn as_str(&self) -> &'static str {
        match self {
            SiteKind::OnTop => "on-top",
            SiteKind::Bridge => "bridge",
        }
    }
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSiteKindError(String);

impl fmt::Display for ParseSiteKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown site kind '{}' (expected 'on-top' or 'bridge')", self.0)
    }
}

impl std::error::Error for ParseSiteKindError {}

impl FromStr for SiteKind {
    type Err = ParseSiteKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on-top" | "ontop" | "top" => Ok(SiteKind::OnTop),
            "bridge" => Ok(SiteKind::Bridge),
            other => Err(ParseSiteKindError(other.to_string())),
        }
    }
}

/// A geometric anchor for adsorbate placement.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub kind: SiteKind,
    /// Cartesian position of the anchor point on the surface.
    pub position: Point3<f64>,
    /// The surface atoms defining the site: one for on-top, two for bridge.
    pub anchors: Vec<usize>,
}

/// Finds the pair of atoms with the smallest periodic distance among `indices`.
///
/// Every unordered pair is examined. Pairs are normalized to `(min, max)` and,
/// when two distances agree within [`TIE_TOLERANCE`], the lexicographically
/// smaller pair wins, so the answer does not depend on the order of `indices`.
///
/// # Errors
///
/// Returns [`GeometryError::InsufficientAtoms`] when fewer than two distinct
/// indices are given, or a structure error for an out-of-range index.
pub fn nearest_pair_among(
    structure: &AtomicStructure,
    indices: &[usize],
) -> Result<(usize, usize), GeometryError> {
    let mut candidates = indices.to_vec();
    candidates.sort_unstable();
    candidates.dedup();
    if candidates.len() < 2 {
        return Err(GeometryError::InsufficientAtoms {
            needed: 2,
            found: candidates.len(),
        });
    }

    let mut best: Option<((usize, usize), f64)> = None;
    for (n, &i) in candidates.iter().enumerate() {
        for &j in &candidates[n + 1..] {
            let d = periodic_distance(structure, i, j)?;
            let replace = match best {
                None => true,
                Some((pair, best_d)) => {
                    d < best_d - TIE_TOLERANCE
                        || ((d - best_d).abs() <= TIE_TOLERANCE && (i, j) < pair)
                }
            };
            if replace {
                best = Some(((i, j), d));
            }
        }
    }

    best.map(|(pair, _)| pair)
        .ok_or(GeometryError::InsufficientAtoms { needed: 2, found: 0 })
}

/// Locates a site of the given kind on the top layer of `structure`.
///
/// # Arguments
///
/// * `structure` - The surface to search.
/// * `kind` - Which site variant to locate.
/// * `tolerance` - Top-layer z tolerance in Angstroms.
pub fn find_site(
    structure: &AtomicStructure,
    kind: SiteKind,
    tolerance: f64,
) -> Result<Site, GeometryError> {
    let all: Vec<usize> = (0..structure.len()).collect();
    let (top, _) = top_layer_among(structure, &all, tolerance)?;
    find_site_among(structure, kind, &top)
}

/// Locates a site using an explicit set of surface atoms.
///
/// On-top picks the lowest-index candidate; bridge uses the periodic midpoint
/// of the nearest candidate pair.
pub fn find_site_among(
    structure: &AtomicStructure,
    kind: SiteKind,
    candidates: &[usize],
) -> Result<Site, GeometryError> {
    match kind {
        SiteKind::OnTop => {
            let anchor = *candidates
                .iter()
                .min()
                .ok_or(GeometryError::InsufficientAtoms { needed: 1, found: 0 })?;
            Ok(Site {
                kind,
                position: structure.position(anchor)?,
                anchors: vec![anchor],
            })
        }
        SiteKind::Bridge => {
            let (i, j) = nearest_pair_among(structure, candidates)?;
            Ok(Site {
                kind,
                position: periodic_midpoint(structure, i, j)?,
                anchors: vec![i, j],
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::cell::Cell;
    use crate::core::models::structure::StructureError;

    fn square(points: &[(f64, f64)]) -> AtomicStructure {
        let atoms = points
            .iter()
            .map(|&(x, y)| Atom::new("Pt", Point3::new(x, y, 5.0)))
            .collect();
        AtomicStructure::new(atoms, Cell::orthorhombic(20.0, 20.0, 20.0, [true, true, false]).unwrap())
    }

    #[test]
    fn nearest_pair_picks_the_strictly_closest_pair() {
        // 2 and 3 are pulled together by 0.1 Angstrom.
        let s = square(&[(0.0, 0.0), (3.0, 0.0), (0.0, 3.0), (2.9, 3.0)]);
        assert_eq!(nearest_pair_among(&s, &[0, 1, 2, 3]).unwrap(), (2, 3));
        assert_eq!(nearest_pair_among(&s, &[3, 1, 2, 0]).unwrap(), (2, 3));
    }

    #[test]
    fn exact_ties_resolve_to_the_lowest_pair() {
        let s = square(&[(0.0, 0.0), (3.0, 0.0), (0.0, 3.0), (3.0, 3.0)]);
        for _ in 0..5 {
            assert_eq!(nearest_pair_among(&s, &[3, 2, 1, 0]).unwrap(), (0, 1));
        }
        assert_eq!(nearest_pair_among(&s, &[3, 2, 1]).unwrap(), (1, 3));
    }

    #[test]
    fn nearest_pair_needs_two_distinct_atoms() {
        let s = square(&[(0.0, 0.0), (3.0, 0.0)]);
        assert_eq!(
            nearest_pair_among(&s, &[1, 1]).unwrap_err(),
            GeometryError::InsufficientAtoms { needed: 2, found: 1 }
        );
        assert_eq!(
            nearest_pair_among(&s, &[0, 9]).unwrap_err(),
            GeometryError::Structure(StructureError::IndexOutOfRange { index: 9, len: 2 })
        );
    }

    #[test]
    fn bridge_site_across_the_boundary_uses_the_periodic_midpoint() {
        let s = square(&[(19.0, 10.0), (1.0, 10.0), (10.0, 0.0)]);
        let site = find_site_among(&s, SiteKind::Bridge, &[0, 1]).unwrap();
        assert_eq!(site.anchors, vec![0, 1]);
        assert!((site.position - Point3::new(20.0, 10.0, 5.0)).norm() < 1e-9);
    }

    #[test]
    fn on_top_site_is_the_lowest_index_top_atom() {
        let s = square(&[(0.0, 0.0), (3.0, 0.0)]).appended([
            Atom::new("Pt", Point3::new(1.0, 1.0, 7.0)),
            Atom::new("Pt", Point3::new(4.0, 1.0, 7.0)),
        ]);
        let site = find_site(&s, SiteKind::OnTop, 1e-3).unwrap();
        assert_eq!(site.anchors, vec![2]);
        assert_eq!(site.position, Point3::new(1.0, 1.0, 7.0));
    }

    #[test]
    fn site_kind_parses_and_orders() {
        assert_eq!("on-top".parse::<SiteKind>().unwrap(), SiteKind::OnTop);
        assert_eq!("Bridge".parse::<SiteKind>().unwrap(), SiteKind::Bridge);
        assert!("hollow".parse::<SiteKind>().is_err());
        assert!(SiteKind::OnTop < SiteKind::Bridge);
        assert_eq!(SiteKind::Bridge.to_string(), "bridge");
    }
}
