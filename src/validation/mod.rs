//! Correspondence validation, accuracy scoring and the error taxonomy

pub mod accuracy;
pub mod correspondence;
pub mod error;

pub use accuracy::{rmse, residuals, AccuracyReport, PointTransform};
pub use correspondence::{
    correspondences_from_labels, is_collinear, markers_to_points, pair_points, signed_area,
    CollinearityTolerance, CorrespondenceValidator, PointSet, ValidationConfig,
};
pub use error::{CalibrationError, CalibrationResult};
