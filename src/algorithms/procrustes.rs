//! Centroid-based (Procrustes) calibration
//!
//! Estimates rotation, per-axis scale and translation directly from centered
//! correspondence sets without a full affine solve. The rotation uses the
//! closed-form 2D result on the cross-covariance `H_ij = sum(r_i * m_j)`:
//! `theta = atan2(H21 - H12, H11 + H22)`. Scale is then fitted per axis
//! against the reference set rotated back by `theta`.

use crate::algorithms::affine::SolverConfig;
use crate::algorithms::decomposition::rotation_matrix;
use crate::core::{CorrespondencePoint, Point3D, MIN_CORRESPONDENCES};
use crate::validation::accuracy::{rmse, PointTransform};
use crate::validation::correspondence::CorrespondenceValidator;
use crate::validation::error::{CalibrationError, CalibrationResult};
use log::{debug, warn};
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

/// Rotation/scale/translation calibration in the Procrustes representation
///
/// Forward map: `q_xy = R(theta) * diag(sx, sy) * p_xy + t_xy`,
/// `q_z = sz * p_z + t_z`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTransform {
    pub translation: Point3D,
    /// Rotation about z (radians)
    pub rotation: f64,
    /// Per-axis scale
    pub scale: Point3D,
    /// RMSE against the fitted correspondences (meters)
    pub accuracy: f64,
}

impl CalibrationTransform {
    pub fn new(translation: Point3D, rotation: f64, scale: Point3D) -> Self {
        Self {
            translation,
            rotation,
            scale,
            accuracy: 0.0,
        }
    }

    pub fn identity() -> Self {
        Self::new(Point3D::ORIGIN, 0.0, Point3D::new(1.0, 1.0, 1.0))
    }

    pub fn rotation_degrees(&self) -> f64 {
        self.rotation.to_degrees()
    }

    /// All scale components strictly positive
    pub fn is_valid(&self) -> bool {
        self.scale.x > 0.0 && self.scale.y > 0.0 && self.scale.z > 0.0
    }

    /// Closed-form inverse in the same representation
    ///
    /// Exact when `sx == sy`; with anisotropic planar scale the rotate-then-
    /// scale order of the inverse cannot be expressed in this form, so use
    /// [`CalibrationTransform::inverse_transform_point`] for exact mapping.
    pub fn inverse(&self) -> CalibrationTransform {
        let inv_scale = Point3D::new(
            safe_reciprocal(self.scale.x),
            safe_reciprocal(self.scale.y),
            safe_reciprocal(self.scale.z),
        );
        let rotation = -self.rotation;
        let scaled = Vector2::new(
            -self.translation.x * inv_scale.x,
            -self.translation.y * inv_scale.y,
        );
        let xy = rotation_matrix(rotation) * scaled;

        CalibrationTransform {
            translation: Point3D::new(xy.x, xy.y, -self.translation.z * inv_scale.z),
            rotation,
            scale: inv_scale,
            accuracy: self.accuracy,
        }
    }

    /// Exact inverse mapping of a real-world point into local space
    pub fn inverse_transform_point(&self, point: &Point3D) -> Point3D {
        let shifted = *point - self.translation;
        let unrotated = rotation_matrix(-self.rotation) * shifted.xy();
        Point3D::new(
            unrotated.x * safe_reciprocal(self.scale.x),
            unrotated.y * safe_reciprocal(self.scale.y),
            shifted.z * safe_reciprocal(self.scale.z),
        )
    }

    fn rotate_and_scale(&self, point: &Point3D) -> Point3D {
        let scaled = Vector2::new(point.x * self.scale.x, point.y * self.scale.y);
        let xy = rotation_matrix(self.rotation) * scaled;
        Point3D::new(xy.x, xy.y, point.z * self.scale.z)
    }
}

impl PointTransform for CalibrationTransform {
    fn transform_point(&self, point: &Point3D) -> Point3D {
        self.rotate_and_scale(point) + self.translation
    }
}

impl Default for CalibrationTransform {
    fn default() -> Self {
        Self::identity()
    }
}

fn safe_reciprocal(value: f64) -> f64 {
    if value == 0.0 {
        1.0
    } else {
        1.0 / value
    }
}

/// Procrustes estimator with correspondence validation
#[derive(Debug, Clone, Default)]
pub struct ProcrustesEstimator {
    pub config: SolverConfig,
    pub validator: CorrespondenceValidator,
}

impl ProcrustesEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig, validator: CorrespondenceValidator) -> Self {
        Self { config, validator }
    }

    pub fn estimate(&self, points: &[CorrespondencePoint]) -> CalibrationResult<CalibrationTransform> {
        self.validator.validate(points)?;

        let measured: Vec<Point3D> = points.iter().map(|c| c.measured).collect();
        let reference: Vec<Point3D> = points.iter().map(|c| c.reference).collect();
        let (measured_centroid, reference_centroid) =
            match (Point3D::centroid(&measured), Point3D::centroid(&reference)) {
                (Some(m), Some(r)) => (m, r),
                _ => {
                    return Err(CalibrationError::InsufficientPoints {
                        required: MIN_CORRESPONDENCES,
                        provided: points.len(),
                    })
                }
            };

        let measured_c: Vec<Point3D> = measured.iter().map(|p| *p - measured_centroid).collect();
        let reference_c: Vec<Point3D> = reference.iter().map(|p| *p - reference_centroid).collect();

        let mut h = Matrix2::zeros();
        for (m, r) in measured_c.iter().zip(&reference_c) {
            h += r.xy() * m.xy().transpose();
        }

        let det = h.determinant();
        if det.abs() < self.config.determinant_tolerance {
            return Err(CalibrationError::singular(format!(
                "cross-covariance determinant {:.3e}",
                det
            )));
        }

        let rotation = (h[(1, 0)] - h[(0, 1)]).atan2(h[(0, 0)] + h[(1, 1)]);
        let unrotate = rotation_matrix(-rotation);

        let n = points.len() as f64;
        let mut sum_mr = Point3D::ORIGIN;
        let mut sum_mm = Point3D::ORIGIN;
        for (m, r) in measured_c.iter().zip(&reference_c) {
            let r_xy = unrotate * r.xy();
            sum_mr = sum_mr + Point3D::new(m.x * r_xy.x, m.y * r_xy.y, m.z * r.z);
            sum_mm = sum_mm + Point3D::new(m.x * m.x, m.y * m.y, m.z * m.z);
        }

        let scale = Point3D::new(
            self.axis_scale("x", sum_mr.x, sum_mm.x, n),
            self.axis_scale("y", sum_mr.y, sum_mm.y, n),
            self.axis_scale("z", sum_mr.z, sum_mm.z, n),
        );
        for (axis, value) in [("x", scale.x), ("y", scale.y), ("z", scale.z)] {
            if !(value > 0.0) {
                warn!("rejecting procrustes fit: scale {} = {:.6}", axis, value);
                return Err(CalibrationError::invalid(format!(
                    "mirrored correspondence set: scale {} = {:.6}",
                    axis, value
                )));
            }
        }

        let mut transform = CalibrationTransform::new(Point3D::ORIGIN, rotation, scale);
        transform.translation = reference_centroid - transform.rotate_and_scale(&measured_centroid);
        transform.accuracy = rmse(&transform, points);

        debug!(
            "procrustes fit over {} points: rotation {:.3} deg, scale ({:.4}, {:.4}, {:.4}), rmse {:.6}",
            points.len(),
            transform.rotation_degrees(),
            scale.x,
            scale.y,
            scale.z,
            transform.accuracy
        );

        Ok(transform)
    }

    fn axis_scale(&self, axis: &str, sum_mr: f64, sum_mm: f64, n: f64) -> f64 {
        if sum_mm / n < self.config.variance_tolerance {
            debug!("{} axis carries no spread, using unit scale", axis);
            1.0
        } else {
            sum_mr / sum_mm
        }
    }
}

/// Procrustes calibration with default tolerances
pub fn estimate_procrustes(points: &[CorrespondencePoint]) -> CalibrationResult<CalibrationTransform> {
    ProcrustesEstimator::new().estimate(points)
}
