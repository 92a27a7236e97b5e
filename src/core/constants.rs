//! Numerical tolerances and default thresholds

/// Minimum number of correspondences for any 2D fit
pub const MIN_CORRESPONDENCES: usize = 3;

/// Pairwise distance below which two points are treated as identical
pub const COINCIDENCE_TOLERANCE: f64 = 1e-10;

/// Triangle area threshold for correspondence sets measured in meters
pub const COLLINEARITY_AREA_TOLERANCE_METERS: f64 = 0.01;

/// Triangle area threshold for normalized (0-1) map coordinates
pub const COLLINEARITY_AREA_TOLERANCE_NORMALIZED: f64 = 1e-10;

/// Default collinearity ratio: doubled triangle area over squared extent diagonal
pub const COLLINEARITY_RELATIVE_TOLERANCE: f64 = 1e-9;

/// Smallest usable pivot during Gauss-Jordan elimination
pub const PIVOT_TOLERANCE: f64 = 1e-10;

/// Smallest usable |det| of a 2x2 linear part or covariance
pub const DETERMINANT_TOLERANCE: f64 = 1e-10;

/// Variance below which an axis is considered to carry no information
pub const VARIANCE_TOLERANCE: f64 = 1e-12;

pub const MIN_SIGNAL_STRENGTH: f64 = 0.5;
pub const MIN_CONFIDENCE_LEVEL: f64 = 0.6;
/// dBm
pub const MIN_RSSI_DBM: f64 = -75.0;
/// meters
pub const MAX_ERROR_ESTIMATE_M: f64 = 3.0;
/// Fraction of line-of-sight samples below which a batch is flagged NLoS
pub const MIN_LINE_OF_SIGHT_RATIO: f64 = 0.5;
