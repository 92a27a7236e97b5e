use crate::core::{
    ObservationPoint, MAX_ERROR_ESTIMATE_M, MIN_CONFIDENCE_LEVEL, MIN_LINE_OF_SIGHT_RATIO,
    MIN_RSSI_DBM, MIN_SIGNAL_STRENGTH,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Thresholds an observation is scored against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Below this strength an observation is rejected (0-1)
    pub min_strength: f64,
    /// Below this confidence an observation is rejected (0-1)
    pub min_confidence: f64,
    /// Weaker RSSI is reported but not rejected (dBm)
    pub min_rssi_dbm: f64,
    /// Larger error estimates are reported but not rejected (meters)
    pub max_error_estimate_m: f64,
    /// Batch line-of-sight fraction below which NLoS is declared
    pub min_line_of_sight_ratio: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_strength: MIN_SIGNAL_STRENGTH,
            min_confidence: MIN_CONFIDENCE_LEVEL,
            min_rssi_dbm: MIN_RSSI_DBM,
            max_error_estimate_m: MAX_ERROR_ESTIMATE_M,
            min_line_of_sight_ratio: MIN_LINE_OF_SIGHT_RATIO,
        }
    }
}

/// Problem found on a single observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QualityIssue {
    LowStrength { strength: f64 },
    LowConfidence { confidence: f64 },
    WeakRssi { rssi_dbm: f64 },
    HighErrorEstimate { error_m: f64 },
}

impl QualityIssue {
    /// Fatal issues make the observation unacceptable
    pub fn is_fatal(&self) -> bool {
        matches!(self, QualityIssue::LowStrength { .. } | QualityIssue::LowConfidence { .. })
    }

    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            QualityIssue::LowStrength { .. } => &[
                "Reduce the distance between antenna and tag",
                "Remove obstructions between antenna and tag",
            ],
            QualityIssue::LowConfidence { .. } => &[
                "Hold the tag still while sampling",
                "Collect more samples before calibrating",
            ],
            QualityIssue::WeakRssi { .. } => &[
                "Check antenna orientation",
                "Move away from metal surfaces and other radio sources",
            ],
            QualityIssue::HighErrorEstimate { .. } => &[
                "Ensure clear line of sight to the antenna",
                "Re-run antenna calibration",
            ],
        }
    }
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityIssue::LowStrength { strength } => write!(f, "Signal strength low: {:.2}", strength),
            QualityIssue::LowConfidence { confidence } => write!(f, "Confidence low: {:.2}", confidence),
            QualityIssue::WeakRssi { rssi_dbm } => write!(f, "RSSI weak: {:.1} dBm", rssi_dbm),
            QualityIssue::HighErrorEstimate { error_m } => write!(f, "Error estimate high: {:.2} m", error_m),
        }
    }
}

/// Verdict on a single observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityEvaluation {
    pub is_acceptable: bool,
    pub issues: Vec<QualityIssue>,
    pub recommendations: Vec<String>,
}

/// Line-of-sight summary over a batch of observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineOfSightAssessment {
    pub sample_count: usize,
    /// Fraction of line-of-sight samples (0-1)
    pub line_of_sight_ratio: f64,
    pub average_strength: f64,
    pub is_non_line_of_sight: bool,
}

/// Scores observations against fixed signal-quality thresholds
#[derive(Debug, Clone, Default)]
pub struct SignalQualityEvaluator {
    pub thresholds: QualityThresholds,
}

impl SignalQualityEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn evaluate(&self, observation: &ObservationPoint) -> QualityEvaluation {
        let t = &self.thresholds;
        let q = &observation.quality;
        let mut issues = Vec::new();

        if q.strength < t.min_strength {
            issues.push(QualityIssue::LowStrength { strength: q.strength });
        }
        if q.confidence_level < t.min_confidence {
            issues.push(QualityIssue::LowConfidence { confidence: q.confidence_level });
        }
        if observation.rssi < t.min_rssi_dbm {
            issues.push(QualityIssue::WeakRssi { rssi_dbm: observation.rssi });
        }
        if q.error_estimate > t.max_error_estimate_m {
            issues.push(QualityIssue::HighErrorEstimate { error_m: q.error_estimate });
        }

        let mut recommendations: Vec<String> = Vec::new();
        for issue in &issues {
            for r in issue.recommendations() {
                if !recommendations.iter().any(|existing| existing == r) {
                    recommendations.push(r.to_string());
                }
            }
        }

        QualityEvaluation {
            is_acceptable: !issues.iter().any(QualityIssue::is_fatal),
            issues,
            recommendations,
        }
    }

    pub fn assess_line_of_sight(&self, observations: &[ObservationPoint]) -> LineOfSightAssessment {
        if observations.is_empty() {
            return LineOfSightAssessment {
                sample_count: 0,
                line_of_sight_ratio: 0.0,
                average_strength: 0.0,
                is_non_line_of_sight: false,
            };
        }

        let n = observations.len() as f64;
        let los = observations.iter().filter(|o| o.quality.is_line_of_sight).count() as f64;
        let ratio = los / n;
        let average_strength = observations.iter().map(|o| o.quality.strength).sum::<f64>() / n;

        LineOfSightAssessment {
            sample_count: observations.len(),
            line_of_sight_ratio: ratio,
            average_strength,
            is_non_line_of_sight: ratio < self.thresholds.min_line_of_sight_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Point3D, SignalQuality};
    use approx::assert_relative_eq;

    fn observation(strength: f64, confidence: f64, rssi: f64, error: f64, los: bool) -> ObservationPoint {
        ObservationPoint {
            id: "obs".to_string(),
            antenna_id: "ant-1".to_string(),
            position: Point3D::ORIGIN,
            timestamp_ms: 0,
            quality: SignalQuality {
                strength,
                is_line_of_sight: los,
                confidence_level: confidence,
                error_estimate: error,
            },
            distance: 2.0,
            rssi,
            session_id: "session".to_string(),
        }
    }

    #[test]
    fn test_low_strength_rejected() {
        let eval = SignalQualityEvaluator::new().evaluate(&observation(0.4, 0.9, -50.0, 1.0, true));
        assert!(!eval.is_acceptable);
        assert_eq!(eval.issues, vec![QualityIssue::LowStrength { strength: 0.4 }]);
        assert!(eval
            .recommendations
            .iter()
            .any(|r| r.contains("distance")));
    }

    #[test]
    fn test_good_observation_accepted() {
        let eval = SignalQualityEvaluator::new().evaluate(&observation(0.6, 0.8, -50.0, 1.0, true));
        assert!(eval.is_acceptable);
        assert!(eval.issues.is_empty());
        assert!(eval.recommendations.is_empty());
    }

    #[test]
    fn test_non_fatal_issues() {
        let eval = SignalQualityEvaluator::new().evaluate(&observation(0.9, 0.9, -80.0, 3.5, true));
        assert!(eval.is_acceptable);
        assert_eq!(eval.issues.len(), 2);
        assert_eq!(eval.recommendations.len(), 4);
        assert_eq!(eval.issues[0].to_string(), "RSSI weak: -80.0 dBm");
    }

    #[test]
    fn test_low_confidence_rejected() {
        let eval = SignalQualityEvaluator::new().evaluate(&observation(0.9, 0.5, -50.0, 0.5, true));
        assert!(!eval.is_acceptable);
        assert!(matches!(eval.issues[0], QualityIssue::LowConfidence { .. }));
    }

    #[test]
    fn test_line_of_sight_assessment() {
        let evaluator = SignalQualityEvaluator::new();
        let batch = vec![
            observation(0.8, 0.9, -50.0, 1.0, true),
            observation(0.4, 0.9, -50.0, 1.0, false),
            observation(0.6, 0.9, -50.0, 1.0, false),
        ];
        let assessment = evaluator.assess_line_of_sight(&batch);
        assert_eq!(assessment.sample_count, 3);
        assert_relative_eq!(assessment.line_of_sight_ratio, 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(assessment.average_strength, 0.6, epsilon = 1e-12);
        assert!(assessment.is_non_line_of_sight);

        // Exactly half line-of-sight is not NLoS
        let assessment = evaluator.assess_line_of_sight(&batch[..2]);
        assert!(!assessment.is_non_line_of_sight);

        let empty = evaluator.assess_line_of_sight(&[]);
        assert_eq!(empty.sample_count, 0);
        assert!(!empty.is_non_line_of_sight);
    }
}
