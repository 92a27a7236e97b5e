//! Core data types for the calibration engine

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// 3D point in either local (measured) or real-world (reference) space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub const ORIGIN: Point3D = Point3D { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Point on the z = 0 plane
    pub fn planar(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn distance_to(&self, other: &Point3D) -> f64 {
        (*self - *other).norm()
    }

    pub fn planar_distance_to(&self, other: &Point3D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn dot(&self, other: &Point3D) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn xy(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Arithmetic mean of a point set, `None` when empty
    pub fn centroid(points: &[Point3D]) -> Option<Point3D> {
        if points.is_empty() {
            return None;
        }
        let sum = points.iter().fold(Point3D::ORIGIN, |acc, p| acc + *p);
        Some(sum / points.len() as f64)
    }
}

impl From<Vector3<f64>> for Point3D {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Point3D> for Vector3<f64> {
    fn from(p: Point3D) -> Self {
        p.to_vector()
    }
}

impl Add for Point3D {
    type Output = Point3D;

    fn add(self, rhs: Point3D) -> Point3D {
        Point3D::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3D {
    type Output = Point3D;

    fn sub(self, rhs: Point3D) -> Point3D {
        Point3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point3D {
    type Output = Point3D;

    fn mul(self, rhs: f64) -> Point3D {
        Point3D::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for Point3D {
    type Output = Point3D;

    fn div(self, rhs: f64) -> Point3D {
        Point3D::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Point3D {
    type Output = Point3D;

    fn neg(self) -> Point3D {
        Point3D::new(-self.x, -self.y, -self.z)
    }
}

/// Pairing of a locally measured point with its known real-world position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrespondencePoint {
    /// Point in local/measured (or map) space
    pub measured: Point3D,
    /// Same point in real-world space
    pub reference: Point3D,
}

impl CorrespondencePoint {
    pub fn new(measured: Point3D, reference: Point3D) -> Self {
        Self { measured, reference }
    }
}

/// Labelled reference position carrying an orientation, as produced by
/// antenna layout loaders (`NAME,POSITION_X,POSITION_Y,ROTATION`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMarker {
    pub point: Point3D,
    pub rotation_degrees: f64,
}

/// Radio link quality attached to every observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalQuality {
    /// Normalised signal strength (0-1)
    pub strength: f64,
    pub is_line_of_sight: bool,
    /// Ranging confidence (0-1)
    pub confidence_level: f64,
    /// Estimated ranging error (meters)
    pub error_estimate: f64,
}

impl Default for SignalQuality {
    fn default() -> Self {
        Self {
            strength: 1.0,
            is_line_of_sight: true,
            confidence_level: 1.0,
            error_estimate: 0.0,
        }
    }
}

/// One range/position reading from an antenna
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationPoint {
    pub id: String,
    pub antenna_id: String,
    pub position: Point3D,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    pub quality: SignalQuality,
    /// Measured distance to the antenna (meters)
    pub distance: f64,
    /// Received signal strength (dBm)
    pub rssi: f64,
    pub session_id: String,
}
