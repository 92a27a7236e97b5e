//! 2D affine calibration from point correspondences
//!
//! Fits `q = A * p + t` in the xy plane with an independent 1D fit
//! `z' = scale * z + offset` for height. Two solving strategies are kept:
//! - `NormalEquations`: forms `A^T A` and runs Gauss-Jordan elimination,
//!   fast but squares the condition number
//! - `DirectLeastSquares`: thin QR of the design matrix, slower but stable
//!   on poorly spread correspondence sets

use crate::algorithms::decomposition::{extract_rotation_scale, RotationScale};
use crate::algorithms::linalg::{
    affine_design_matrix, denormalize_affine, fit_linear_1d, normal_equations_solve,
    normalize_correspondences, qr_least_squares,
};
use crate::core::{
    CorrespondencePoint, Point3D, DETERMINANT_TOLERANCE, MIN_CORRESPONDENCES, PIVOT_TOLERANCE,
    VARIANCE_TOLERANCE,
};
use crate::validation::accuracy::{rmse, PointTransform};
use crate::validation::correspondence::CorrespondenceValidator;
use crate::validation::error::{CalibrationError, CalibrationResult};
use log::debug;
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

/// Strategy used to solve the overdetermined affine system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AffineFitStrategy {
    #[default]
    NormalEquations,
    DirectLeastSquares,
}

/// Numerical settings for the affine and Procrustes solvers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    pub strategy: AffineFitStrategy,
    /// Smallest usable pivot (Gauss-Jordan) or relative R diagonal (QR),
    /// applied to the normalized system
    pub pivot_tolerance: f64,
    /// Smallest usable |det| of the fitted linear part
    pub determinant_tolerance: f64,
    /// Variance below which an axis falls back to unit scale
    pub variance_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            strategy: AffineFitStrategy::NormalEquations,
            pivot_tolerance: PIVOT_TOLERANCE,
            determinant_tolerance: DETERMINANT_TOLERANCE,
            variance_tolerance: VARIANCE_TOLERANCE,
        }
    }
}

/// 1D linear map applied to the z axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisMapping {
    pub scale: f64,
    pub offset: f64,
}

impl AxisMapping {
    pub fn apply(&self, value: f64) -> f64 {
        self.scale * value + self.offset
    }

    /// Inverse map; a zero scale inverts to unit scale
    pub fn inverse(&self) -> AxisMapping {
        let scale = if self.scale == 0.0 { 1.0 } else { 1.0 / self.scale };
        AxisMapping {
            scale,
            offset: -self.offset * scale,
        }
    }
}

/// Affine map from local/map space into real-world space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    /// Linear part `[[a, c], [b, d]]`
    pub linear: Matrix2<f64>,
    pub translation: Vector2<f64>,
    /// Height mapping; `None` passes z through unchanged
    pub z: Option<AxisMapping>,
    /// RMSE against the correspondences it was fitted on (meters)
    pub accuracy: f64,
}

impl AffineTransform {
    pub fn new(linear: Matrix2<f64>, translation: Vector2<f64>) -> Self {
        Self {
            linear,
            translation,
            z: None,
            accuracy: 0.0,
        }
    }

    /// Build from the solver parameter vector `[a, b, c, d, tx, ty]`
    pub fn from_parameters(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self::new(Matrix2::new(a, c, b, d), Vector2::new(tx, ty))
    }

    pub fn identity() -> Self {
        Self::new(Matrix2::identity(), Vector2::zeros())
    }

    pub fn with_z(mut self, z: AxisMapping) -> Self {
        self.z = Some(z);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn determinant(&self) -> f64 {
        self.linear.determinant()
    }

    /// Invertible under the default determinant tolerance
    pub fn is_invertible(&self) -> bool {
        self.determinant().abs() > DETERMINANT_TOLERANCE
    }

    /// Analytic inverse mapping real-world points back into local space
    ///
    /// Uses the default determinant tolerance. Transforms fitted under a
    /// different `SolverConfig::determinant_tolerance` should be inverted
    /// with [`AffineTransform::inverse_with_tolerance`].
    pub fn inverse(&self) -> CalibrationResult<AffineTransform> {
        self.inverse_with_tolerance(DETERMINANT_TOLERANCE)
    }

    /// Analytic inverse, failing when `|det| <= determinant_tolerance`
    pub fn inverse_with_tolerance(&self, determinant_tolerance: f64) -> CalibrationResult<AffineTransform> {
        let det = self.determinant();
        if det.abs() <= determinant_tolerance {
            return Err(CalibrationError::singular(format!(
                "affine linear part determinant {:.3e}",
                det
            )));
        }

        let (a, c, b, d) = (
            self.linear[(0, 0)],
            self.linear[(0, 1)],
            self.linear[(1, 0)],
            self.linear[(1, 1)],
        );
        let inv = Matrix2::new(d, -c, -b, a) / det;
        let translation = -(inv * self.translation);

        Ok(AffineTransform {
            linear: inv,
            translation,
            z: self.z.map(|z| z.inverse()),
            accuracy: self.accuracy,
        })
    }

    /// Map a real-world point back into local space
    pub fn inverse_transform_point(&self, point: &Point3D) -> CalibrationResult<Point3D> {
        Ok(self.inverse()?.transform_point(point))
    }

    pub fn rotation_scale(&self) -> CalibrationResult<RotationScale> {
        extract_rotation_scale(&self.linear)
    }
}

impl PointTransform for AffineTransform {
    fn transform_point(&self, point: &Point3D) -> Point3D {
        let xy = self.linear * point.xy() + self.translation;
        let z = match self.z {
            Some(mapping) => mapping.apply(point.z),
            None => point.z,
        };
        Point3D::new(xy.x, xy.y, z)
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Fitted affine transform together with its rotation/scale decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffineFit {
    pub transform: AffineTransform,
    pub decomposition: RotationScale,
    pub strategy: AffineFitStrategy,
}

/// Least-squares affine solver with correspondence validation
#[derive(Debug, Clone, Default)]
pub struct AffineSolver {
    pub config: SolverConfig,
    pub validator: CorrespondenceValidator,
}

impl AffineSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig, validator: CorrespondenceValidator) -> Self {
        Self { config, validator }
    }

    pub fn with_strategy(strategy: AffineFitStrategy) -> Self {
        Self {
            config: SolverConfig {
                strategy,
                ..SolverConfig::default()
            },
            ..Self::default()
        }
    }

    /// Validate, solve, score and decompose
    pub fn fit(&self, points: &[CorrespondencePoint]) -> CalibrationResult<AffineFit> {
        self.validator.validate(points)?;

        let transform = self.solve(points)?;
        let decomposition = extract_rotation_scale(&transform.linear)?;

        debug!(
            "{:?} affine fit over {} points: rmse {:.6}, rotation {:.3} deg",
            self.config.strategy,
            points.len(),
            transform.accuracy,
            decomposition.angle_degrees()
        );

        Ok(AffineFit {
            transform,
            decomposition,
            strategy: self.config.strategy,
        })
    }

    /// Solve the affine system without validating the input set
    pub fn solve(&self, points: &[CorrespondencePoint]) -> CalibrationResult<AffineTransform> {
        if points.len() < MIN_CORRESPONDENCES {
            return Err(CalibrationError::InsufficientPoints {
                required: MIN_CORRESPONDENCES,
                provided: points.len(),
            });
        }

        let (normalized, measured_norm, reference_norm) = normalize_correspondences(points);
        let (design, rhs) = affine_design_matrix(&normalized);
        let params = match self.config.strategy {
            AffineFitStrategy::NormalEquations => {
                normal_equations_solve(&design, &rhs, self.config.pivot_tolerance)?
            }
            AffineFitStrategy::DirectLeastSquares => {
                qr_least_squares(&design, &rhs, self.config.pivot_tolerance)?
            }
        };

        if params.iter().any(|v| !v.is_finite()) {
            return Err(CalibrationError::failed("affine solve produced non-finite parameters"));
        }

        let fitted = AffineTransform::from_parameters(
            params[0], params[1], params[2], params[3], params[4], params[5],
        );
        let (linear, translation) =
            denormalize_affine(&fitted.linear, &fitted.translation, &measured_norm, &reference_norm);
        let planar = AffineTransform::new(linear, translation);
        let det = planar.determinant();
        if det.abs() < self.config.determinant_tolerance {
            return Err(CalibrationError::singular(format!(
                "fitted linear part determinant {:.3e}",
                det
            )));
        }

        let measured_z: Vec<f64> = points.iter().map(|c| c.measured.z).collect();
        let reference_z: Vec<f64> = points.iter().map(|c| c.reference.z).collect();
        let (scale, offset) = fit_linear_1d(&measured_z, &reference_z, self.config.variance_tolerance);
        let transform = planar.with_z(AxisMapping { scale, offset });

        let accuracy = rmse(&transform, points);
        Ok(transform.with_accuracy(accuracy))
    }
}

/// Fit an affine transform with default tolerances and the given strategy
pub fn fit_affine(
    points: &[CorrespondencePoint],
    strategy: AffineFitStrategy,
) -> CalibrationResult<AffineTransform> {
    AffineSolver::with_strategy(strategy)
        .fit(points)
        .map(|fit| fit.transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::decomposition::rotation_matrix;
    use approx::assert_relative_eq;

    fn generate(angle: f64, sx: f64, sy: f64, t: Vector2<f64>, local: &[Point3D]) -> Vec<CorrespondencePoint> {
        let linear = rotation_matrix(angle) * Matrix2::new(sx, 0.0, 0.0, sy);
        let truth = AffineTransform::new(linear, t);
        local
            .iter()
            .map(|p| CorrespondencePoint::new(*p, truth.transform_point(p)))
            .collect()
    }

    fn grid() -> Vec<Point3D> {
        vec![
            Point3D::planar(0.0, 0.0),
            Point3D::planar(4.0, 0.5),
            Point3D::planar(1.0, 3.0),
            Point3D::planar(5.0, 4.0),
            Point3D::planar(2.5, 1.5),
        ]
    }

    #[test]
    fn test_exact_fit_recovers_generators() {
        let points = generate(0.6, 1.5, 0.8, Vector2::new(10.0, -3.0), &grid());
        for strategy in [AffineFitStrategy::NormalEquations, AffineFitStrategy::DirectLeastSquares] {
            let fit = AffineSolver::with_strategy(strategy).fit(&points).unwrap();
            assert_relative_eq!(fit.decomposition.angle_radians, 0.6, epsilon = 1e-6);
            assert_relative_eq!(fit.decomposition.scale_x, 1.5, epsilon = 1e-6);
            assert_relative_eq!(fit.decomposition.scale_y, 0.8, epsilon = 1e-6);
            assert_relative_eq!(fit.transform.translation.x, 10.0, epsilon = 1e-6);
            assert_relative_eq!(fit.transform.translation.y, -3.0, epsilon = 1e-6);
            assert!(fit.transform.accuracy < 1e-6);
        }
    }

    #[test]
    fn test_strategies_agree_with_noise() {
        let mut points = generate(-0.3, 2.0, 2.0, Vector2::new(1.0, 1.0), &grid());
        let noise = [0.01, -0.02, 0.015, 0.0, -0.01];
        for (p, n) in points.iter_mut().zip(noise) {
            p.reference.x += n;
            p.reference.y -= n;
        }

        let ne = AffineSolver::with_strategy(AffineFitStrategy::NormalEquations)
            .solve(&points)
            .unwrap();
        let qr = AffineSolver::with_strategy(AffineFitStrategy::DirectLeastSquares)
            .solve(&points)
            .unwrap();

        assert_relative_eq!(ne.linear, qr.linear, epsilon = 1e-8);
        assert_relative_eq!(ne.translation, qr.translation, epsilon = 1e-8);
        assert_relative_eq!(ne.accuracy, qr.accuracy, epsilon = 1e-8);
        assert!(ne.accuracy > 0.0);
    }

    #[test]
    fn test_too_few_points() {
        let points = generate(0.0, 1.0, 1.0, Vector2::zeros(), &grid()[..2]);
        let err = fit_affine(&points, AffineFitStrategy::NormalEquations).unwrap_err();
        assert_eq!(err, CalibrationError::InsufficientPoints { required: 3, provided: 2 });
    }

    #[test]
    fn test_collinear_set_is_singular_for_both_strategies() {
        // Four collinear points pass the three-point collinearity check
        let local: Vec<Point3D> = (0..4).map(|i| Point3D::planar(i as f64, 0.0)).collect();
        let points = generate(0.2, 1.0, 1.0, Vector2::zeros(), &local);
        for strategy in [AffineFitStrategy::NormalEquations, AffineFitStrategy::DirectLeastSquares] {
            let err = fit_affine(&points, strategy).unwrap_err();
            assert_eq!(err.kind(), "SingularMatrix");
        }
    }

    #[test]
    fn test_z_axis_fit_and_fallback() {
        let mut points = generate(0.0, 1.0, 1.0, Vector2::zeros(), &grid());
        for (i, p) in points.iter_mut().enumerate() {
            p.measured.z = i as f64;
            p.reference.z = 2.0 * i as f64 + 0.5;
        }
        let t = fit_affine(&points, AffineFitStrategy::NormalEquations).unwrap();
        let z = t.z.unwrap();
        assert_relative_eq!(z.scale, 2.0, epsilon = 1e-10);
        assert_relative_eq!(z.offset, 0.5, epsilon = 1e-10);

        // Planar measurements: unit scale, offset lifts to the reference height
        for p in points.iter_mut() {
            p.measured.z = 0.0;
            p.reference.z = 1.2;
        }
        let t = fit_affine(&points, AffineFitStrategy::NormalEquations).unwrap();
        let z = t.z.unwrap();
        assert_eq!(z.scale, 1.0);
        assert_relative_eq!(z.offset, 1.2, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = AffineTransform::from_parameters(1.2, 0.4, -0.7, 0.9, 3.0, -8.0)
            .with_z(AxisMapping { scale: 2.0, offset: 1.0 });
        let inv = t.inverse().unwrap();
        for p in [Point3D::new(1.0, 2.0, 3.0), Point3D::new(-50.0, 7.5, 0.0)] {
            let back = inv.transform_point(&t.transform_point(&p));
            assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
            assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
            assert_relative_eq!(back.z, p.z, epsilon = 1e-9);

            let forward = t.transform_point(&t.inverse_transform_point(&p).unwrap());
            assert_relative_eq!(forward.x, p.x, epsilon = 1e-9);
            assert_relative_eq!(forward.y, p.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_survey_scale_offsets() {
        let local = [(0.0, 0.0), (3.0, 4.0), (12.0, 8.0), (27.0, 2.0), (48.0, 6.0)];
        for offset in [3e5, 1e6] {
            let measured: Vec<Point3D> = local.iter().map(|&(u, v)| Point3D::planar(u + offset, v + offset)).collect();
            let points = generate(0.3, 1.0, 1.0, Vector2::new(5.0, -2.0), &measured);

            let ne = fit_affine(&points, AffineFitStrategy::NormalEquations).unwrap();
            let qr = fit_affine(&points, AffineFitStrategy::DirectLeastSquares).unwrap();
            assert_relative_eq!(ne.linear, qr.linear, epsilon = 1e-9);
            assert_relative_eq!(ne.translation, qr.translation, epsilon = 1e-3);
            assert_relative_eq!(qr.rotation_scale().unwrap().angle_radians, 0.3, epsilon = 1e-9);
            assert!(ne.accuracy < 1e-6);
            assert!(qr.accuracy < 1e-6);
        }

        // Local frame onto UTM-like eastings and northings
        let measured: Vec<Point3D> = local.iter().map(|&(u, v)| Point3D::planar(u, v)).collect();
        let points = generate(-1.2, 1.0, 1.0, Vector2::new(5.0e5, 4.0e6), &measured);
        for strategy in [AffineFitStrategy::NormalEquations, AffineFitStrategy::DirectLeastSquares] {
            let t = fit_affine(&points, strategy).unwrap();
            assert_relative_eq!(t.translation.x, 5.0e5, epsilon = 1e-6);
            assert_relative_eq!(t.translation.y, 4.0e6, epsilon = 1e-6);
            assert!(t.accuracy < 1e-6);
        }
    }

    #[test]
    fn test_inverse_honours_configured_tolerance() {
        let t = AffineTransform::from_parameters(1e-5, 0.0, 0.0, 5e-6, 1.0, 2.0);
        assert_eq!(t.inverse().unwrap_err().kind(), "SingularMatrix");

        let inv = t.inverse_with_tolerance(1e-12).unwrap();
        let p = Point3D::new(0.5, -0.25, 0.0);
        let back = inv.transform_point(&t.transform_point(&p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
    }

    #[test]
    fn test_inverse_singular() {
        let t = AffineTransform::from_parameters(1.0, 2.0, 2.0, 4.0, 0.0, 0.0);
        assert!(!t.is_invertible());
        assert_eq!(t.inverse().unwrap_err().kind(), "SingularMatrix");
    }

    #[test]
    fn test_zero_z_scale_inverts_to_unit() {
        let inv = AxisMapping { scale: 0.0, offset: 2.0 }.inverse();
        assert_eq!(inv.scale, 1.0);
        assert_eq!(inv.offset, -2.0);
    }

    #[test]
    fn test_transform_serialization() {
        let t = fit_affine(
            &generate(0.3, 1.0, 1.0, Vector2::new(2.0, 3.0), &grid()),
            AffineFitStrategy::DirectLeastSquares,
        )
        .unwrap();
        let json = serde_json::to_string(&t).unwrap();
        let restored: AffineTransform = serde_json::from_str(&json).unwrap();
        assert_relative_eq!(restored.linear, t.linear, epsilon = 1e-15);
        let (restored_z, z) = (restored.z.unwrap(), t.z.unwrap());
        assert_relative_eq!(restored_z.scale, z.scale, epsilon = 1e-15);
        assert_relative_eq!(restored_z.offset, z.offset, epsilon = 1e-15);
    }
}
