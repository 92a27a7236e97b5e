//! Rotation and scale extraction from a 2x2 linear part
//!
//! The linear part is factored as `A = U S V^T`. The rotation is `R = U V^T`
//! unless that product is a reflection, in which case the second singular
//! pair is negated so that `det(R) = +1`. Per-axis scale is read from the
//! stretch `R^T A`, so a map built as `R(theta) * diag(sx, sy)` returns
//! exactly `theta`, `sx` and `sy` whatever order the SVD sorts them in.

use crate::validation::error::{CalibrationError, CalibrationResult};
use log::debug;
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

/// Proper rotation and scale recovered from a linear map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationScale {
    /// Rotation angle in (-pi, pi]
    pub angle_radians: f64,
    /// Scale along the local x axis
    pub scale_x: f64,
    /// Scale along the local y axis; negative when the map mirrors
    pub scale_y: f64,
    /// Singular values after reflection correction
    pub singular_values: Vector2<f64>,
    /// Proper rotation matrix, `det = +1`
    pub rotation: Matrix2<f64>,
    /// Whether the raw `U V^T` was a reflection
    pub reflection_corrected: bool,
}

impl RotationScale {
    pub fn angle_degrees(&self) -> f64 {
        self.angle_radians.to_degrees()
    }

    /// Stretch matrix `R^T A`, symmetric for any input
    pub fn stretch(&self, linear: &Matrix2<f64>) -> Matrix2<f64> {
        self.rotation.transpose() * linear
    }
}

/// Rotation matrix for an angle in radians
pub fn rotation_matrix(angle_radians: f64) -> Matrix2<f64> {
    let (s, c) = angle_radians.sin_cos();
    Matrix2::new(c, -s, s, c)
}

/// Split a 2x2 linear map into a proper rotation and per-axis scale
///
/// A mirrored map is reported with a negative second scale. When the mirror
/// lies on the larger singular axis the singular values are ordered the other
/// way round, so the angle comes out a half turn from the intuitive one and
/// both scales change sign relative to `diag(sx, sy)`.
pub fn extract_rotation_scale(linear: &Matrix2<f64>) -> CalibrationResult<RotationScale> {
    if linear.iter().any(|v| !v.is_finite()) {
        return Err(CalibrationError::invalid("linear part has non-finite entries"));
    }

    let svd = linear.svd(true, true);
    let mut u = svd
        .u
        .ok_or_else(|| CalibrationError::failed("SVD did not produce U"))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| CalibrationError::failed("SVD did not produce V^T"))?;
    let mut singular_values = svd.singular_values;

    let mut rotation = u * v_t;
    let reflection_corrected = rotation.determinant() < 0.0;
    if reflection_corrected {
        u.column_mut(1).neg_mut();
        singular_values[1] = -singular_values[1];
        rotation = u * v_t;
    }

    let angle_radians = rotation[(1, 0)].atan2(rotation[(0, 0)]);
    let stretch = rotation.transpose() * linear;

    debug!(
        "extracted rotation {:.4} deg, scale ({:.6}, {:.6}), reflection corrected: {}",
        angle_radians.to_degrees(),
        stretch[(0, 0)],
        stretch[(1, 1)],
        reflection_corrected
    );

    Ok(RotationScale {
        angle_radians,
        scale_x: stretch[(0, 0)],
        scale_y: stretch[(1, 1)],
        singular_values,
        rotation,
        reflection_corrected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_6;

    #[test]
    fn test_pure_rotation() {
        let a = rotation_matrix(FRAC_PI_6);
        let rs = extract_rotation_scale(&a).unwrap();
        assert_relative_eq!(rs.angle_radians, FRAC_PI_6, epsilon = 1e-12);
        assert_relative_eq!(rs.scale_x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(rs.scale_y, 1.0, epsilon = 1e-12);
        assert!(!rs.reflection_corrected);
    }

    #[test]
    fn test_equal_singular_values() {
        // Uniform scale: SVD basis is arbitrary but U V^T is not
        let a = rotation_matrix(-2.0) * 3.5;
        let rs = extract_rotation_scale(&a).unwrap();
        assert_relative_eq!(rs.angle_radians, -2.0, epsilon = 1e-10);
        assert_relative_eq!(rs.scale_x, 3.5, epsilon = 1e-10);
        assert_relative_eq!(rs.scale_y, 3.5, epsilon = 1e-10);
    }

    #[test]
    fn test_anisotropic_scale_either_order() {
        for (sx, sy) in [(2.0, 0.5), (0.5, 2.0)] {
            let a = rotation_matrix(0.7) * Matrix2::new(sx, 0.0, 0.0, sy);
            let rs = extract_rotation_scale(&a).unwrap();
            assert_relative_eq!(rs.angle_radians, 0.7, epsilon = 1e-10);
            assert_relative_eq!(rs.scale_x, sx, epsilon = 1e-10);
            assert_relative_eq!(rs.scale_y, sy, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_reflection_correction() {
        let a = rotation_matrix(0.4) * Matrix2::new(2.0, 0.0, 0.0, -1.0);
        let rs = extract_rotation_scale(&a).unwrap();

        assert!(rs.reflection_corrected);
        assert_relative_eq!(rs.rotation.determinant(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(rs.angle_radians, 0.4, epsilon = 1e-10);
        assert_relative_eq!(rs.scale_x, 2.0, epsilon = 1e-10);
        assert_relative_eq!(rs.scale_y, -1.0, epsilon = 1e-10);

        // Rotating back by the extracted angle recovers the stretch
        let rebuilt = rotation_matrix(rs.angle_radians) * rs.stretch(&a);
        assert_relative_eq!(rebuilt, a, epsilon = 1e-10);
        let product: f64 = rs.singular_values.iter().product();
        assert_relative_eq!(product, a.determinant(), epsilon = 1e-10);
    }

    #[test]
    fn test_reflection_on_larger_axis() {
        // The mirrored axis carries the larger singular value, so the correction
        // lands on the other axis and the rotation picks up a half turn
        let a = rotation_matrix(0.4) * Matrix2::new(0.5, 0.0, 0.0, -2.0);
        let rs = extract_rotation_scale(&a).unwrap();

        assert!(rs.reflection_corrected);
        assert_relative_eq!(rs.rotation.determinant(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(rs.angle_radians, 0.4 - std::f64::consts::PI, epsilon = 1e-10);
        assert_relative_eq!(rs.scale_x, -0.5, epsilon = 1e-10);
        assert_relative_eq!(rs.scale_y, 2.0, epsilon = 1e-10);

        let rebuilt = rotation_matrix(rs.angle_radians) * rs.stretch(&a);
        assert_relative_eq!(rebuilt, a, epsilon = 1e-10);
    }

    #[test]
    fn test_non_finite_rejected() {
        let a = Matrix2::new(f64::NAN, 0.0, 0.0, 1.0);
        assert_eq!(extract_rotation_scale(&a).unwrap_err().kind(), "InvalidInput");
    }
}
