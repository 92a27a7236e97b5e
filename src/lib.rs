//! UWB Coordinate Calibration Engine
//!
//! Fits transforms between a device's local/map coordinate frame and
//! real-world coordinates from point correspondences, and conditions raw
//! UWB observations (quality scoring, trimming, line-of-sight filtering,
//! moving-average smoothing) before they feed a calibration.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use crate::core::{CorrespondencePoint, ObservationPoint, Point3D, ReferenceMarker, SignalQuality};
pub use algorithms::{
    AffineFit, AffineFitStrategy, AffineTransform, CalibrationTransform, RotationScale, SolverConfig,
};
pub use processing::{
    LineOfSightAssessment, PreprocessingConfig, PreprocessingStatistics, QualityEvaluation,
    QualityThresholds,
};
pub use validation::{
    AccuracyReport, CalibrationError, CalibrationResult, CorrespondenceValidator, PointTransform,
    ValidationConfig,
};
pub use utils::{ConfigError, EngineConfig};
pub use api::CalibrationEngine;
