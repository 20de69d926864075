use super::structure::StructureError;
use nalgebra::{Matrix3, Point3, Vector3};

/// A simulation cell: three lattice vectors and per-axis periodic boundary flags.
///
/// The lattice vectors are stored as the rows of a 3x3 matrix, so a point with
/// fractional coordinates `f` sits at `f[0] * a + f[1] * b + f[2] * c`. The
/// inverse transform is computed once at construction, which is why a cell
/// can only be created from a non-singular matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Lattice vectors as rows, in Angstroms.
    matrix: Matrix3<f64>,
    /// Inverse of the transposed lattice matrix; its rows are the reciprocal vectors.
    inverse_transpose: Matrix3<f64>,
    /// Periodic boundary flags for the a, b and c axes.
    pbc: [bool; 3],
}

impl Cell {
    /// Creates a cell from lattice vectors given as matrix rows.
    ///
    /// # Arguments
    ///
    /// * `matrix` - The lattice vectors as rows, in Angstroms.
    /// * `pbc` - Periodic boundary flags for each lattice axis.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::SingularCell`] if the lattice vectors are linearly dependent.
    pub fn new(matrix: Matrix3<f64>, pbc: [bool; 3]) -> Result<Self, StructureError> {
        let inverse_transpose = matrix
            .transpose()
            .try_inverse()
            .ok_or(StructureError::SingularCell)?;
        Ok(Self {
            matrix,
            inverse_transpose,
            pbc,
        })
    }

    /// Creates an orthorhombic cell with the given edge lengths.
    pub fn orthorhombic(a: f64, b: f64, c: f64, pbc: [bool; 3]) -> Result<Self, StructureError> {
        Self::new(Matrix3::from_diagonal(&Vector3::new(a, b, c)), pbc)
    }

    /// Creates a cubic cell with edge length `length`.
    pub fn cubic(length: f64, pbc: [bool; 3]) -> Result<Self, StructureError> {
        Self::orthorhombic(length, length, length, pbc)
    }

    /// Creates a cell from three lattice vectors.
    pub fn from_vectors(
        a: Vector3<f64>,
        b: Vector3<f64>,
        c: Vector3<f64>,
        pbc: [bool; 3],
    ) -> Result<Self, StructureError> {
        Self::new(Matrix3::from_rows(&[a.transpose(), b.transpose(), c.transpose()]), pbc)
    }

    #[inline]
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    #[inline]
    pub fn pbc(&self) -> [bool; 3] {
        self.pbc
    }

    #[inline]
    pub fn is_periodic(&self, axis: usize) -> bool {
        self.pbc.get(axis).copied().unwrap_or(false)
    }

    /// Returns the lattice vector along `axis` (0 = a, 1 = b, 2 = c).
    ///
    /// # Panics
    ///
    /// Panics if `axis > 2`.
    pub fn vector(&self, axis: usize) -> Vector3<f64> {
        self.matrix.row(axis).transpose()
    }

    /// Returns the lengths of the three lattice vectors.
    pub fn lengths(&self) -> [f64; 3] {
        [
            self.vector(0).norm(),
            self.vector(1).norm(),
            self.vector(2).norm(),
        ]
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    /// Returns the distance between neighbouring lattice planes normal to `axis`.
    ///
    /// This is the quantity that bounds how many periodic images along that
    /// axis lie within a given interaction range.
    pub fn plane_spacing(&self, axis: usize) -> f64 {
        1.0 / self.inverse_transpose.row(axis).norm()
    }

    /// Returns a copy of this cell with different periodic boundary flags.
    pub fn with_pbc(&self, pbc: [bool; 3]) -> Self {
        Self { pbc, ..*self }
    }

    /// Converts a Cartesian point into fractional coordinates.
    #[inline]
    pub fn to_fractional(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.inverse_transpose * point.coords
    }

    /// Converts a Cartesian displacement into fractional components.
    #[inline]
    pub fn to_fractional_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.inverse_transpose * vector
    }

    /// Converts fractional coordinates into a Cartesian point.
    #[inline]
    pub fn to_cartesian(&self, fractional: &Vector3<f64>) -> Point3<f64> {
        Point3::from(self.matrix.transpose() * fractional)
    }

    /// Converts fractional components into a Cartesian displacement.
    #[inline]
    pub fn to_cartesian_vector(&self, fractional: &Vector3<f64>) -> Vector3<f64> {
        self.matrix.transpose() * fractional
    }

    /// Maps a point back into the cell along the periodic axes only.
    ///
    /// Coordinates along non-periodic axes are returned unchanged.
    pub fn wrap_point(&self, point: &Point3<f64>) -> Point3<f64> {
        let mut frac = self.to_fractional(point);
        for axis in 0..3 {
            if self.pbc[axis] {
                frac[axis] -= frac[axis].floor();
            }
        }
        self.to_cartesian(&frac)
    }
}
