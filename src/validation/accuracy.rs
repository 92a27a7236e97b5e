//! Round-trip accuracy of fitted transforms

use crate::core::{CorrespondencePoint, Point3D};
use serde::{Deserialize, Serialize};

/// Anything that maps local points into real-world space
pub trait PointTransform {
    fn transform_point(&self, point: &Point3D) -> Point3D;

    fn transform_points(&self, points: &[Point3D]) -> Vec<Point3D> {
        points.iter().map(|p| self.transform_point(p)).collect()
    }
}

/// Per-correspondence error distances of a transform (meters)
pub fn residuals<T: PointTransform + ?Sized>(transform: &T, points: &[CorrespondencePoint]) -> Vec<f64> {
    points
        .iter()
        .map(|c| transform.transform_point(&c.measured).distance_to(&c.reference))
        .collect()
}

/// Root-mean-square distance between transformed measured points and their references
pub fn rmse<T: PointTransform + ?Sized>(transform: &T, points: &[CorrespondencePoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = residuals(transform, points).iter().map(|e| e * e).sum();
    (sum_sq / points.len() as f64).sqrt()
}

/// Residual summary surfaced alongside a fitted transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub rmse: f64,
    pub max_error: f64,
    pub mean_error: f64,
    pub residuals: Vec<f64>,
}

impl AccuracyReport {
    pub fn evaluate<T: PointTransform + ?Sized>(transform: &T, points: &[CorrespondencePoint]) -> Self {
        let residuals = residuals(transform, points);
        let n = residuals.len().max(1) as f64;
        let max_error = residuals.iter().cloned().fold(0.0, f64::max);
        let mean_error = residuals.iter().sum::<f64>() / n;
        let rmse = (residuals.iter().map(|e| e * e).sum::<f64>() / n).sqrt();

        Self {
            rmse,
            max_error,
            mean_error,
            residuals,
        }
    }
}
