//! Caller-facing API
//!
//! A single blocking engine that owns an `EngineConfig` and runs the
//! calibration and observation pipelines on caller-supplied data.

pub mod blocking;

pub use blocking::CalibrationEngine;
