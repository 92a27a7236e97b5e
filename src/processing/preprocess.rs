//! Observation stream conditioning before calibration
//!
//! Pipeline order: trim head/tail samples, optionally drop
//! non-line-of-sight samples, then smooth with a trailing moving average.
//! The window for output `i` covers `[max(0, i - window + 1), i]`, so the
//! first samples average over a growing window.

use crate::core::{ObservationPoint, Point3D, SignalQuality};
use log::debug;
use serde::{Deserialize, Serialize};

/// Preprocessing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Samples dropped from the start
    pub first_trim: usize,
    /// Samples dropped from the end
    pub end_trim: usize,
    pub moving_average_window_size: usize,
    pub filter_non_line_of_sight: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            first_trim: 0,
            end_trim: 0,
            moving_average_window_size: 5,
            filter_non_line_of_sight: false,
        }
    }
}

/// Before/after summary of a preprocessing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingStatistics {
    pub original_count: usize,
    pub processed_count: usize,
    pub trimmed_count: usize,
    /// Positional spread before processing (meters)
    pub std_dev_before: f64,
    /// Positional spread after processing (meters)
    pub std_dev_after: f64,
}

impl PreprocessingStatistics {
    /// Fraction of samples removed (0-1)
    pub fn trim_rate(&self) -> f64 {
        if self.original_count == 0 {
            0.0
        } else {
            self.trimmed_count as f64 / self.original_count as f64
        }
    }

    /// Relative reduction in positional spread; negative when spread grew
    pub fn std_dev_improvement(&self) -> f64 {
        if self.std_dev_before <= 0.0 {
            0.0
        } else {
            (self.std_dev_before - self.std_dev_after) / self.std_dev_before
        }
    }
}

/// Trims, filters and smooths observation sequences
#[derive(Debug, Clone, Default)]
pub struct ObservationPreprocessor {
    pub config: PreprocessingConfig,
}

impl ObservationPreprocessor {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline and return a new sequence
    pub fn process(&self, observations: &[ObservationPoint]) -> Vec<ObservationPoint> {
        let mut result = self.trim(observations);
        if self.config.filter_non_line_of_sight {
            result = filter_line_of_sight(&result);
        }
        let smoothed = moving_average(&result, self.config.moving_average_window_size);

        debug!(
            "preprocessed {} observations into {} (window {})",
            observations.len(),
            smoothed.len(),
            self.config.moving_average_window_size
        );
        smoothed
    }

    /// Run the pipeline and report its effect
    pub fn process_with_statistics(
        &self,
        observations: &[ObservationPoint],
    ) -> (Vec<ObservationPoint>, PreprocessingStatistics) {
        let processed = self.process(observations);
        let statistics = statistics(observations, &processed);
        (processed, statistics)
    }

    /// Drop head/tail samples; short sequences pass through unchanged
    pub fn trim(&self, observations: &[ObservationPoint]) -> Vec<ObservationPoint> {
        let (first, end) = (self.config.first_trim, self.config.end_trim);
        if observations.len() <= first + end {
            return observations.to_vec();
        }
        observations[first..observations.len() - end].to_vec()
    }
}

/// Keep only line-of-sight samples
pub fn filter_line_of_sight(observations: &[ObservationPoint]) -> Vec<ObservationPoint> {
    observations
        .iter()
        .filter(|o| o.quality.is_line_of_sight)
        .cloned()
        .collect()
}

fn window_bounds(i: usize, window: usize) -> std::ops::Range<usize> {
    (i + 1).saturating_sub(window)..i + 1
}

/// Trailing moving average over position, distance, RSSI and quality
///
/// Line of sight is decided by majority vote inside the window; a tie keeps
/// the current sample's flag. Sequences shorter than the window, and windows
/// of 0 or 1, are returned unchanged.
pub fn moving_average(observations: &[ObservationPoint], window: usize) -> Vec<ObservationPoint> {
    if window <= 1 || observations.len() < window {
        return observations.to_vec();
    }

    observations
        .iter()
        .enumerate()
        .map(|(i, current)| {
            let samples = &observations[window_bounds(i, window)];
            let n = samples.len() as f64;

            let mut position = Point3D::ORIGIN;
            let (mut distance, mut rssi) = (0.0, 0.0);
            let (mut strength, mut confidence, mut error) = (0.0, 0.0, 0.0);
            let mut los_votes = 0usize;
            for s in samples {
                position = position + s.position;
                distance += s.distance;
                rssi += s.rssi;
                strength += s.quality.strength;
                confidence += s.quality.confidence_level;
                error += s.quality.error_estimate;
                if s.quality.is_line_of_sight {
                    los_votes += 1;
                }
            }

            let is_line_of_sight = match (2 * los_votes).cmp(&samples.len()) {
                std::cmp::Ordering::Greater => true,
                std::cmp::Ordering::Less => false,
                std::cmp::Ordering::Equal => current.quality.is_line_of_sight,
            };

            ObservationPoint {
                position: position / n,
                distance: distance / n,
                rssi: rssi / n,
                quality: SignalQuality {
                    strength: strength / n,
                    is_line_of_sight,
                    confidence_level: confidence / n,
                    error_estimate: error / n,
                },
                ..current.clone()
            }
        })
        .collect()
}

/// Trailing moving average over bare points
pub fn moving_average_points(points: &[Point3D], window: usize) -> Vec<Point3D> {
    if window <= 1 || points.len() < window {
        return points.to_vec();
    }

    (0..points.len())
        .map(|i| {
            let samples = &points[window_bounds(i, window)];
            Point3D::centroid(samples).unwrap_or(points[i])
        })
        .collect()
}

/// Root-mean-square distance of positions from their centroid
pub fn position_std_dev(points: &[Point3D]) -> f64 {
    match Point3D::centroid(points) {
        Some(center) => {
            let sum_sq: f64 = points.iter().map(|p| (*p - center).dot(&(*p - center))).sum();
            (sum_sq / points.len() as f64).sqrt()
        }
        None => 0.0,
    }
}

/// Compare an original sequence with its processed counterpart
pub fn statistics(original: &[ObservationPoint], processed: &[ObservationPoint]) -> PreprocessingStatistics {
    let before: Vec<Point3D> = original.iter().map(|o| o.position).collect();
    let after: Vec<Point3D> = processed.iter().map(|o| o.position).collect();

    PreprocessingStatistics {
        original_count: original.len(),
        processed_count: processed.len(),
        trimmed_count: original.len().saturating_sub(processed.len()),
        std_dev_before: position_std_dev(&before),
        std_dev_after: position_std_dev(&after),
    }
}
