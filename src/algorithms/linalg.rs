//! Shared matrix primitives for the affine solvers
//!
//! Both fitting strategies build the same `2n x 6` design matrix and differ
//! only in how they solve it: normal equations with Gauss-Jordan
//! elimination, or a thin QR factorisation of the design matrix itself.
//! Point sets are normalized first so that the translation columns stay
//! well separated from the coordinate columns for survey-scale offsets.

use crate::core::{CorrespondencePoint, Point3D};
use crate::validation::error::{CalibrationError, CalibrationResult};
use nalgebra::{DMatrix, DVector, Matrix2, Vector2};

/// Number of unknowns in a 2D affine map `[a, b, c, d, tx, ty]`
pub const AFFINE_PARAMS: usize = 6;

/// Design matrix and right-hand side for `x = a*u + c*v + tx`, `y = b*u + d*v + ty`
pub fn affine_design_matrix(points: &[CorrespondencePoint]) -> (DMatrix<f64>, DVector<f64>) {
    let n = points.len();
    let mut design = DMatrix::zeros(2 * n, AFFINE_PARAMS);
    let mut rhs = DVector::zeros(2 * n);

    for (i, c) in points.iter().enumerate() {
        let (u, v) = (c.measured.x, c.measured.y);
        let rx = 2 * i;
        let ry = 2 * i + 1;

        design[(rx, 0)] = u;
        design[(rx, 2)] = v;
        design[(rx, 4)] = 1.0;
        rhs[rx] = c.reference.x;

        design[(ry, 1)] = u;
        design[(ry, 3)] = v;
        design[(ry, 5)] = 1.0;
        rhs[ry] = c.reference.y;
    }

    (design, rhs)
}

/// Similarity that centres a planar point set and scales its mean radius to sqrt(2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarNormalization {
    pub centroid: Vector2<f64>,
    pub scale: f64,
}

impl PlanarNormalization {
    pub fn from_points(points: &[Point3D]) -> Self {
        let n = points.len().max(1) as f64;
        let centroid = points.iter().fold(Vector2::zeros(), |acc, p| acc + p.xy()) / n;
        let mean_dist = points.iter().map(|p| (p.xy() - centroid).norm()).sum::<f64>() / n;
        let scale = if mean_dist > f64::EPSILON {
            std::f64::consts::SQRT_2 / mean_dist
        } else {
            1.0
        };
        Self { centroid, scale }
    }

    /// Normalized copy of `point`; z is left untouched
    pub fn apply(&self, point: &Point3D) -> Point3D {
        let xy = (point.xy() - self.centroid) * self.scale;
        Point3D::new(xy.x, xy.y, point.z)
    }
}

/// Normalize both sides of a correspondence set
pub fn normalize_correspondences(
    points: &[CorrespondencePoint],
) -> (Vec<CorrespondencePoint>, PlanarNormalization, PlanarNormalization) {
    let measured: Vec<Point3D> = points.iter().map(|c| c.measured).collect();
    let reference: Vec<Point3D> = points.iter().map(|c| c.reference).collect();
    let m_norm = PlanarNormalization::from_points(&measured);
    let r_norm = PlanarNormalization::from_points(&reference);

    let normalized = points
        .iter()
        .map(|c| CorrespondencePoint::new(m_norm.apply(&c.measured), r_norm.apply(&c.reference)))
        .collect();
    (normalized, m_norm, r_norm)
}

/// Map an affine fit in normalized coordinates back to the original frames
///
/// With `m' = sm (m - cm)` and `r' = sr (r - cr)`, `r' = A' m' + t'` becomes
/// `r = (A' sm / sr) m + cr - A cm + t' / sr`.
pub fn denormalize_affine(
    linear: &Matrix2<f64>,
    translation: &Vector2<f64>,
    measured: &PlanarNormalization,
    reference: &PlanarNormalization,
) -> (Matrix2<f64>, Vector2<f64>) {
    let a = linear * (measured.scale / reference.scale);
    let t = reference.centroid - a * measured.centroid + translation / reference.scale;
    (a, t)
}

/// Solve a square system by Gauss-Jordan elimination with partial pivoting
pub fn gauss_jordan_solve(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    pivot_tolerance: f64,
) -> CalibrationResult<DVector<f64>> {
    let n = a.nrows();
    if a.ncols() != n || b.len() != n {
        return Err(CalibrationError::invalid(format!(
            "Gauss-Jordan needs a square system, got {}x{} with rhs {}",
            a.nrows(),
            a.ncols(),
            b.len()
        )));
    }

    // Augmented working copy [A | b]
    let mut m = DMatrix::zeros(n, n + 1);
    m.view_mut((0, 0), (n, n)).copy_from(a);
    m.set_column(n, b);

    for k in 0..n {
        let mut pivot_row = k;
        for i in (k + 1)..n {
            if m[(i, k)].abs() > m[(pivot_row, k)].abs() {
                pivot_row = i;
            }
        }

        if m[(pivot_row, k)].abs() < pivot_tolerance {
            return Err(CalibrationError::singular(format!(
                "pivot {:.3e} in column {} below tolerance",
                m[(pivot_row, k)],
                k
            )));
        }

        if pivot_row != k {
            m.swap_rows(k, pivot_row);
        }

        let pivot = m[(k, k)];
        for j in k..=n {
            m[(k, j)] /= pivot;
        }

        for i in 0..n {
            if i == k {
                continue;
            }
            let factor = m[(i, k)];
            if factor == 0.0 {
                continue;
            }
            for j in k..=n {
                m[(i, j)] -= factor * m[(k, j)];
            }
        }
    }

    Ok(m.column(n).into_owned())
}

/// Overdetermined least squares via `A^T A x = A^T b`
pub fn normal_equations_solve(
    design: &DMatrix<f64>,
    rhs: &DVector<f64>,
    pivot_tolerance: f64,
) -> CalibrationResult<DVector<f64>> {
    let at = design.transpose();
    let ata = &at * design;
    let atb = &at * rhs;
    gauss_jordan_solve(&ata, &atb, pivot_tolerance)
}

/// Overdetermined least squares via thin QR: `R x = Q^T b`
pub fn qr_least_squares(
    design: &DMatrix<f64>,
    rhs: &DVector<f64>,
    rank_tolerance: f64,
) -> CalibrationResult<DVector<f64>> {
    if design.nrows() < design.ncols() {
        return Err(CalibrationError::invalid(format!(
            "underdetermined system: {} equations for {} unknowns",
            design.nrows(),
            design.ncols()
        )));
    }

    let qr = design.clone().qr();
    let q = qr.q();
    let r = qr.r();

    let scale = r.diagonal().iter().fold(0.0f64, |acc, v| acc.max(v.abs())).max(1.0);
    if let Some(col) = r.diagonal().iter().position(|v| v.abs() < rank_tolerance * scale) {
        return Err(CalibrationError::singular(format!(
            "design matrix rank deficient at column {}",
            col
        )));
    }

    let qtb = q.transpose() * rhs;
    r.solve_upper_triangular(&qtb)
        .ok_or_else(|| CalibrationError::failed("back substitution on R failed"))
}

/// Fit `output = scale * input + offset`
///
/// Scale falls back to 1 when the input variance (mean squared deviation)
/// is below `variance_tolerance`.
pub fn fit_linear_1d(inputs: &[f64], outputs: &[f64], variance_tolerance: f64) -> (f64, f64) {
    let n = inputs.len().min(outputs.len());
    if n == 0 {
        return (1.0, 0.0);
    }

    let count = n as f64;
    let mean_in = inputs[..n].iter().sum::<f64>() / count;
    let mean_out = outputs[..n].iter().sum::<f64>() / count;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (x, y) in inputs[..n].iter().zip(&outputs[..n]) {
        covariance += (x - mean_in) * (y - mean_out);
        variance += (x - mean_in) * (x - mean_in);
    }
    covariance /= count;
    variance /= count;

    let scale = if variance < variance_tolerance {
        1.0
    } else {
        covariance / variance
    };
    (scale, mean_out - scale * mean_in)
}
