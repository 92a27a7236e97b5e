//! Correspondence set validation and assembly
//!
//! Rejects point sets that would make an affine or Procrustes solve
//! rank-deficient: too few points, all-coincident points, and collinear
//! triangles. Collinearity is measured either as an absolute triangle area
//! (unit-dependent, matching the legacy thresholds of the meter and
//! normalized-map calibration paths) or relative to the extent of the set.

use crate::core::{
    CorrespondencePoint, Point3D, ReferenceMarker, COINCIDENCE_TOLERANCE,
    COLLINEARITY_AREA_TOLERANCE_METERS, COLLINEARITY_AREA_TOLERANCE_NORMALIZED,
    COLLINEARITY_RELATIVE_TOLERANCE, MIN_CORRESPONDENCES,
};
use crate::validation::error::{CalibrationError, CalibrationResult};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How small a triangle may get before its vertices count as collinear
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CollinearityTolerance {
    /// Minimum |signed area| in input units squared
    Absolute(f64),
    /// Minimum doubled |area| divided by the squared bounding-box diagonal
    RelativeToExtent(f64),
}

/// Which side of the correspondences the collinearity check inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointSet {
    Measured,
    Reference,
}

/// Configuration for correspondence validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Minimum number of correspondences
    pub min_points: usize,
    /// Pairwise distance under which points coincide
    pub coincidence_tolerance: f64,
    pub collinearity_tolerance: CollinearityTolerance,
    pub collinearity_basis: PointSet,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_points: MIN_CORRESPONDENCES,
            coincidence_tolerance: COINCIDENCE_TOLERANCE,
            collinearity_tolerance: CollinearityTolerance::RelativeToExtent(
                COLLINEARITY_RELATIVE_TOLERANCE,
            ),
            collinearity_basis: PointSet::Measured,
        }
    }
}

impl ValidationConfig {
    /// Legacy affine path: measured points in meters
    pub fn measured_meters() -> Self {
        Self {
            collinearity_tolerance: CollinearityTolerance::Absolute(COLLINEARITY_AREA_TOLERANCE_METERS),
            collinearity_basis: PointSet::Measured,
            ..Self::default()
        }
    }

    /// Legacy map path: reference points in normalized map coordinates
    pub fn normalized_map() -> Self {
        Self {
            collinearity_tolerance: CollinearityTolerance::Absolute(
                COLLINEARITY_AREA_TOLERANCE_NORMALIZED,
            ),
            collinearity_basis: PointSet::Reference,
            ..Self::default()
        }
    }
}

/// Validator for correspondence sets prior to any solve
#[derive(Debug, Clone, Default)]
pub struct CorrespondenceValidator {
    config: ValidationConfig,
}

impl CorrespondenceValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a correspondence set, failing on the first problem found
    pub fn validate(&self, points: &[CorrespondencePoint]) -> CalibrationResult<()> {
        let required = self.config.min_points.max(MIN_CORRESPONDENCES);
        if points.len() < required {
            warn!("rejecting correspondence set: {} points, {} required", points.len(), required);
            return Err(CalibrationError::InsufficientPoints {
                required,
                provided: points.len(),
            });
        }

        if let Some(index) = points
            .iter()
            .position(|p| !p.measured.is_finite() || !p.reference.is_finite())
        {
            return Err(CalibrationError::invalid(format!(
                "non-finite coordinate in correspondence {}",
                index
            )));
        }

        let measured: Vec<Point3D> = points.iter().map(|p| p.measured).collect();
        let reference: Vec<Point3D> = points.iter().map(|p| p.reference).collect();

        if all_coincident(&measured, self.config.coincidence_tolerance) {
            warn!("rejecting correspondence set: all measured points coincide");
            return Err(CalibrationError::invalid("all measured points coincide"));
        }
        if all_coincident(&reference, self.config.coincidence_tolerance) {
            warn!("rejecting correspondence set: all reference points coincide");
            return Err(CalibrationError::invalid("all reference points coincide"));
        }

        if points.len() == 3 {
            let (triangle, label) = match self.config.collinearity_basis {
                PointSet::Measured => (&measured, "measured"),
                PointSet::Reference => (&reference, "reference"),
            };
            if is_collinear(triangle[0], triangle[1], triangle[2], self.config.collinearity_tolerance) {
                warn!("rejecting correspondence set: collinear {} points", label);
                return Err(CalibrationError::invalid(format!("{} points are collinear", label)));
            }
        }

        Ok(())
    }
}

/// Signed area of the triangle abc in the xy plane
pub fn signed_area(a: Point3D, b: Point3D, c: Point3D) -> f64 {
    0.5 * ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y))
}

/// Collinearity test for three points under the given tolerance
pub fn is_collinear(a: Point3D, b: Point3D, c: Point3D, tolerance: CollinearityTolerance) -> bool {
    let area = signed_area(a, b, c).abs();
    match tolerance {
        CollinearityTolerance::Absolute(min_area) => area < min_area,
        CollinearityTolerance::RelativeToExtent(min_ratio) => {
            let xs = [a.x, b.x, c.x];
            let ys = [a.y, b.y, c.y];
            let width = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
                - xs.iter().cloned().fold(f64::INFINITY, f64::min);
            let height = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
                - ys.iter().cloned().fold(f64::INFINITY, f64::min);
            let diagonal_sq = width * width + height * height;
            if diagonal_sq <= 0.0 {
                return true;
            }
            2.0 * area / diagonal_sq < min_ratio
        }
    }
}

fn all_coincident(points: &[Point3D], tolerance: f64) -> bool {
    match points.first() {
        Some(first) => points.iter().all(|p| p.distance_to(first) < tolerance),
        None => true,
    }
}

/// Zip equally sized measured and reference slices into correspondences
pub fn pair_points(measured: &[Point3D], reference: &[Point3D]) -> CalibrationResult<Vec<CorrespondencePoint>> {
    if measured.len() != reference.len() {
        return Err(CalibrationError::invalid(format!(
            "mismatched point counts: {} measured, {} reference",
            measured.len(),
            reference.len()
        )));
    }
    Ok(measured
        .iter()
        .zip(reference.iter())
        .map(|(m, r)| CorrespondencePoint::new(*m, *r))
        .collect())
}

/// Join two labelled point maps on their shared labels, ordered by label
pub fn correspondences_from_labels(
    measured: &HashMap<String, Point3D>,
    reference: &HashMap<String, Point3D>,
) -> CalibrationResult<Vec<CorrespondencePoint>> {
    let mut labels: Vec<&String> = measured.keys().filter(|k| reference.contains_key(*k)).collect();
    if labels.is_empty() {
        return Err(CalibrationError::invalid("no shared labels between point sets"));
    }
    labels.sort();

    Ok(labels
        .into_iter()
        .map(|label| CorrespondencePoint::new(measured[label], reference[label]))
        .collect())
}

/// Drop the orientation from labelled markers
pub fn markers_to_points(markers: &HashMap<String, ReferenceMarker>) -> HashMap<String, Point3D> {
    markers
        .iter()
        .map(|(label, marker)| (label.clone(), marker.point))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<CorrespondencePoint> {
        vec![
            CorrespondencePoint::new(Point3D::planar(0.0, 0.0), Point3D::planar(5.0, 6.0)),
            CorrespondencePoint::new(Point3D::planar(1.0, 0.0), Point3D::planar(5.5, 6.87)),
            CorrespondencePoint::new(Point3D::planar(0.0, 1.0), Point3D::planar(4.13, 6.5)),
        ]
    }

    #[test]
    fn test_too_few_points() {
        let validator = CorrespondenceValidator::new();
        for n in 0..3 {
            let points = &triangle()[..n];
            assert_eq!(
                validator.validate(points),
                Err(CalibrationError::InsufficientPoints { required: 3, provided: n })
            );
        }
    }

    #[test]
    fn test_valid_triangle() {
        let validator = CorrespondenceValidator::new();
        assert!(validator.validate(&triangle()).is_ok());
    }

    #[test]
    fn test_collinear_measured_points() {
        let points = vec![
            CorrespondencePoint::new(Point3D::planar(0.0, 0.0), Point3D::planar(0.0, 0.0)),
            CorrespondencePoint::new(Point3D::planar(1.0, 0.0), Point3D::planar(1.0, 1.0)),
            CorrespondencePoint::new(Point3D::planar(2.0, 0.0), Point3D::planar(0.0, 2.0)),
        ];
        for config in [ValidationConfig::default(), ValidationConfig::measured_meters()] {
            let result = CorrespondenceValidator::with_config(config).validate(&points);
            assert!(matches!(result, Err(CalibrationError::InvalidInput { .. })));
        }

        // Reference triangle is fine, so the map path accepts it
        let validator = CorrespondenceValidator::with_config(ValidationConfig::normalized_map());
        assert!(validator.validate(&points).is_ok());
    }

    #[test]
    fn test_coincident_points() {
        let p = Point3D::new(3.0, 4.0, 1.0);
        let points = vec![
            CorrespondencePoint::new(p, Point3D::planar(0.0, 0.0)),
            CorrespondencePoint::new(p, Point3D::planar(1.0, 0.0)),
            CorrespondencePoint::new(p, Point3D::planar(0.0, 1.0)),
        ];
        let err = CorrespondenceValidator::new().validate(&points).unwrap_err();
        assert_eq!(err, CalibrationError::invalid("all measured points coincide"));

        let swapped: Vec<_> = points
            .iter()
            .map(|c| CorrespondencePoint::new(c.reference, c.measured))
            .collect();
        let err = CorrespondenceValidator::new().validate(&swapped).unwrap_err();
        assert_eq!(err, CalibrationError::invalid("all reference points coincide"));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut points = triangle();
        points[1].reference.y = f64::NAN;
        let err = CorrespondenceValidator::new().validate(&points).unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
    }

    #[test]
    fn test_relative_tolerance_is_scale_free() {
        let tol = CollinearityTolerance::RelativeToExtent(1e-6);
        for scale in [1e-4, 1.0, 1e4] {
            let a = Point3D::planar(0.0, 0.0);
            let b = Point3D::planar(scale, 0.0);
            let c = Point3D::planar(0.0, scale);
            assert!(!is_collinear(a, b, c, tol));
            let c_flat = Point3D::planar(2.0 * scale, 1e-9 * scale);
            assert!(is_collinear(a, b, c_flat, tol));
        }
        // The absolute meter threshold misjudges small-scale triangles
        let small = 1e-2;
        assert!(is_collinear(
            Point3D::planar(0.0, 0.0),
            Point3D::planar(small, 0.0),
            Point3D::planar(0.0, small),
            CollinearityTolerance::Absolute(COLLINEARITY_AREA_TOLERANCE_METERS),
        ));
    }

    #[test]
    fn test_pair_points_length_mismatch() {
        let measured = vec![Point3D::planar(0.0, 0.0), Point3D::planar(1.0, 0.0)];
        let reference = vec![Point3D::planar(0.0, 0.0)];
        assert!(matches!(
            pair_points(&measured, &reference),
            Err(CalibrationError::InvalidInput { .. })
        ));
        assert_eq!(pair_points(&measured, &measured).unwrap().len(), 2);
    }

    #[test]
    fn test_correspondences_from_labels() {
        let mut measured = HashMap::new();
        measured.insert("B".to_string(), Point3D::planar(1.0, 0.0));
        measured.insert("A".to_string(), Point3D::planar(0.0, 0.0));
        measured.insert("X".to_string(), Point3D::planar(9.0, 9.0));

        let mut markers = HashMap::new();
        markers.insert(
            "A".to_string(),
            ReferenceMarker { point: Point3D::planar(10.0, 10.0), rotation_degrees: 90.0 },
        );
        markers.insert(
            "B".to_string(),
            ReferenceMarker { point: Point3D::planar(11.0, 10.0), rotation_degrees: 0.0 },
        );
        let reference = markers_to_points(&markers);

        let pairs = correspondences_from_labels(&measured, &reference).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].measured, Point3D::planar(0.0, 0.0));
        assert_eq!(pairs[0].reference, Point3D::planar(10.0, 10.0));
        assert_eq!(pairs[1].reference, Point3D::planar(11.0, 10.0));

        let empty = HashMap::new();
        assert!(correspondences_from_labels(&measured, &empty).is_err());
    }
}
