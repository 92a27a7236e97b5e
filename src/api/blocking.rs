//! Blocking API for calibration and signal conditioning
//!
//! Every call is synchronous and works on caller-owned data; wrap calls in
//! whatever task mechanism the host uses when invoking from async contexts.

use crate::algorithms::affine::{AffineFit, AffineFitStrategy, AffineSolver, AffineTransform};
use crate::algorithms::procrustes::{CalibrationTransform, ProcrustesEstimator};
use crate::core::{CorrespondencePoint, ObservationPoint, Point3D};
use crate::processing::preprocess::{ObservationPreprocessor, PreprocessingStatistics};
use crate::processing::quality::{LineOfSightAssessment, QualityEvaluation, SignalQualityEvaluator};
use crate::utils::config::{ConfigError, EngineConfig};
use crate::validation::accuracy::{AccuracyReport, PointTransform};
use crate::validation::correspondence::CorrespondenceValidator;
use crate::validation::error::CalibrationResult;

/// Configured entry point to both engine pipelines
#[derive(Debug, Clone, Default)]
pub struct CalibrationEngine {
    config: EngineConfig,
}

impl CalibrationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine, rejecting invalid configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, ConfigError> {
        if let Some(err) = config.validate().into_iter().next() {
            return Err(err);
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn validator(&self) -> CorrespondenceValidator {
        CorrespondenceValidator::with_config(self.config.validation.clone())
    }

    fn affine_solver(&self, strategy: AffineFitStrategy) -> AffineSolver {
        let mut config = self.config.solver.clone();
        config.strategy = strategy;
        AffineSolver::with_config(config, self.validator())
    }

    /// Affine fit with the configured strategy
    pub fn fit_affine(&self, points: &[CorrespondencePoint]) -> CalibrationResult<AffineFit> {
        self.affine_solver(self.config.solver.strategy).fit(points)
    }

    /// Affine fit pinned to a specific strategy
    pub fn fit_affine_with(
        &self,
        points: &[CorrespondencePoint],
        strategy: AffineFitStrategy,
    ) -> CalibrationResult<AffineFit> {
        self.affine_solver(strategy).fit(points)
    }

    pub fn fit_procrustes(&self, points: &[CorrespondencePoint]) -> CalibrationResult<CalibrationTransform> {
        ProcrustesEstimator::with_config(self.config.solver.clone(), self.validator()).estimate(points)
    }

    /// Residual breakdown of any transform against a correspondence set
    pub fn accuracy_report<T: PointTransform>(
        &self,
        transform: &T,
        points: &[CorrespondencePoint],
    ) -> AccuracyReport {
        AccuracyReport::evaluate(transform, points)
    }

    /// Map real-world points back into local/map space
    ///
    /// Inversion uses the configured determinant tolerance, so any transform
    /// this engine fitted can be inverted.
    pub fn to_local(&self, transform: &AffineTransform, points: &[Point3D]) -> CalibrationResult<Vec<Point3D>> {
        let inverse = transform.inverse_with_tolerance(self.config.solver.determinant_tolerance)?;
        Ok(inverse.transform_points(points))
    }

    pub fn evaluate_quality(&self, observation: &ObservationPoint) -> QualityEvaluation {
        SignalQualityEvaluator::with_thresholds(self.config.quality.clone()).evaluate(observation)
    }

    pub fn assess_line_of_sight(&self, observations: &[ObservationPoint]) -> LineOfSightAssessment {
        SignalQualityEvaluator::with_thresholds(self.config.quality.clone()).assess_line_of_sight(observations)
    }

    pub fn preprocess(&self, observations: &[ObservationPoint]) -> Vec<ObservationPoint> {
        ObservationPreprocessor::new(self.config.preprocessing.clone()).process(observations)
    }

    pub fn preprocess_with_statistics(
        &self,
        observations: &[ObservationPoint],
    ) -> (Vec<ObservationPoint>, PreprocessingStatistics) {
        ObservationPreprocessor::new(self.config.preprocessing.clone()).process_with_statistics(observations)
    }
}
