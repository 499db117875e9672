//! The symmetric plane-quadric matrix.

use std::ops::{Add, AddAssign};

use nalgebra::Point3;

/// A plane quadric: a symmetric 4x4 matrix stored as its ten unique elements.
///
/// For a plane `ax + by + cz + d = 0` the quadric is `p * p^T` with
/// `p = [a, b, c, d]`; evaluating `v^T * Q * v` at a homogeneous point yields
/// the squared distance to the plane, and sums of quadrics yield sums of
/// squared distances.
///
/// Element layout:
///
/// ```text
/// | m0 m1 m2 m3 |
/// | m1 m4 m5 m6 |
/// | m2 m5 m7 m8 |
/// | m3 m6 m8 m9 |
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct SymmetricMatrix {
    m: [f64; 10],
}

impl SymmetricMatrix {
    /// The zero quadric.
    pub(crate) fn zero() -> Self {
        Self { m: [0.0; 10] }
    }

    /// Build the quadric of a plane `ax + by + cz + d = 0`.
    ///
    /// The plane normal `(a, b, c)` should be unit length.
    pub(crate) fn from_plane(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            m: [
                a * a,
                a * b,
                a * c,
                a * d,
                b * b,
                b * c,
                b * d,
                c * c,
                c * d,
                d * d,
            ],
        }
    }

    /// Evaluate `v^T * Q * v` at `p` (with homogeneous coordinate 1).
    pub(crate) fn evaluate(&self, p: &Point3<f64>) -> f64 {
        let (x, y, z) = (p.x, p.y, p.z);
        self.m[0] * x * x
            + 2.0 * self.m[1] * x * y
            + 2.0 * self.m[2] * x * z
            + 2.0 * self.m[3] * x
            + self.m[4] * y * y
            + 2.0 * self.m[5] * y * z
            + 2.0 * self.m[6] * y
            + self.m[7] * z * z
            + 2.0 * self.m[8] * z
            + self.m[9]
    }

    /// Determinant of the 3x3 submatrix given by element indices, row-major.
    fn det3(
        &self,
        a11: usize,
        a12: usize,
        a13: usize,
        a21: usize,
        a22: usize,
        a23: usize,
        a31: usize,
        a32: usize,
        a33: usize,
    ) -> f64 {
        self.m[a11] * self.m[a22] * self.m[a33]
            + self.m[a13] * self.m[a21] * self.m[a32]
            + self.m[a12] * self.m[a23] * self.m[a31]
            - self.m[a13] * self.m[a22] * self.m[a31]
            - self.m[a11] * self.m[a23] * self.m[a32]
            - self.m[a12] * self.m[a21] * self.m[a33]
    }

    /// Determinant of the upper-left 3x3 block.
    pub(crate) fn determinant(&self) -> f64 {
        self.det3(0, 1, 2, 1, 4, 5, 2, 5, 7)
    }

    /// Find the point minimising the quadric error.
    ///
    /// Solves the normal equations of `v^T * Q * v` by Cramer's rule over the
    /// upper-left 3x3 block, with the fourth column as right-hand side.
    /// Returns `None` when the block is singular (coplanar or otherwise
    /// underdetermined neighbourhoods).
    pub(crate) fn optimal_point(&self) -> Option<Point3<f64>> {
        let det = self.determinant();
        if det == 0.0 {
            return None;
        }
        Some(Point3::new(
            -self.det3(1, 2, 3, 4, 5, 6, 5, 7, 8) / det,
            self.det3(0, 2, 3, 1, 5, 6, 2, 7, 8) / det,
            -self.det3(0, 1, 3, 1, 4, 6, 2, 5, 8) / det,
        ))
    }
}

impl Add for SymmetricMatrix {
    type Output = SymmetricMatrix;

    fn add(mut self, rhs: SymmetricMatrix) -> SymmetricMatrix {
        self += rhs;
        self
    }
}

impl AddAssign for SymmetricMatrix {
    fn add_assign(&mut self, rhs: SymmetricMatrix) {
        for i in 0..10 {
            self.m[i] += rhs.m[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_quadric_measures_squared_distance() {
        // Plane z = 0.
        let q = SymmetricMatrix::from_plane(0.0, 0.0, 1.0, 0.0);

        assert!((q.evaluate(&Point3::new(0.0, 0.0, 0.0))).abs() < 1e-12);
        assert!((q.evaluate(&Point3::new(0.0, 0.0, 1.0)) - 1.0).abs() < 1e-12);
        assert!((q.evaluate(&Point3::new(5.0, 3.0, 2.0)) - 4.0).abs() < 1e-12);

        // Offset plane z = 1.
        let q = SymmetricMatrix::from_plane(0.0, 0.0, 1.0, -1.0);
        assert!((q.evaluate(&Point3::new(2.0, 2.0, 1.0))).abs() < 1e-12);
        assert!((q.evaluate(&Point3::new(0.0, 0.0, 3.0)) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_addition_sums_errors() {
        let qx = SymmetricMatrix::from_plane(1.0, 0.0, 0.0, 0.0); // x = 0
        let qy = SymmetricMatrix::from_plane(0.0, 1.0, 0.0, 0.0); // y = 0

        let q = qx + qy;
        assert!((q.evaluate(&Point3::new(3.0, 4.0, 7.0)) - 25.0).abs() < 1e-12);

        let mut accumulated = SymmetricMatrix::zero();
        accumulated += qx;
        accumulated += qy;
        assert_eq!(accumulated, q);
    }

    #[test]
    fn test_optimal_point_of_three_planes() {
        // x = 1, y = 2, z = 3 intersect in exactly one point.
        let q = SymmetricMatrix::from_plane(1.0, 0.0, 0.0, -1.0)
            + SymmetricMatrix::from_plane(0.0, 1.0, 0.0, -2.0)
            + SymmetricMatrix::from_plane(0.0, 0.0, 1.0, -3.0);

        let p = q.optimal_point().unwrap();
        assert!((p - Point3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
        assert!(q.evaluate(&p).abs() < 1e-12);
    }

    #[test]
    fn test_optimal_point_singular_for_single_plane() {
        let q = SymmetricMatrix::from_plane(0.0, 0.0, 1.0, 0.0);
        assert!(q.optimal_point().is_none());
    }
}
