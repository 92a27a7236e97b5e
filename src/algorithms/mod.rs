//! Calibration algorithms

pub mod affine;
pub mod decomposition;
pub mod linalg;
pub mod procrustes;

pub use affine::{
    fit_affine, AffineFit, AffineFitStrategy, AffineSolver, AffineTransform, AxisMapping,
    SolverConfig,
};
pub use decomposition::{extract_rotation_scale, rotation_matrix, RotationScale};
pub use procrustes::{estimate_procrustes, CalibrationTransform, ProcrustesEstimator};
