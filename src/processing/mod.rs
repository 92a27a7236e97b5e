//! Signal quality scoring and observation preprocessing

pub mod preprocess;
pub mod quality;

pub use preprocess::{
    filter_line_of_sight, moving_average, moving_average_points, position_std_dev, statistics,
    ObservationPreprocessor, PreprocessingConfig, PreprocessingStatistics,
};
pub use quality::{
    LineOfSightAssessment, QualityEvaluation, QualityIssue, QualityThresholds,
    SignalQualityEvaluator,
};
