//! Planar homography from four point correspondences.
//!
//! Provides:
//! - Exactly-determined DLT (h33 fixed to 1) solved by Gaussian elimination
//!   with partial pivoting.
//! - Projective application with explicit failure on the vanishing line.
//! - Closed-form 3×3 inverse via the adjugate.
//!
//! The matrix produced by [`compute_homography`] maps the *first* point set
//! (image pixels) onto the *second* (arena meters).

use nalgebra::{Matrix3, SMatrix, Vector3};

/// Number of correspondences consumed by [`compute_homography`].
pub const N_CORRESPONDENCES: usize = 4;

/// Pivot magnitude below which the DLT system is declared singular.
pub const SINGULAR_PIVOT_EPS: f64 = 1e-12;

/// Determinant magnitude below which a homography is not invertible.
pub const SINGULAR_DET_EPS: f64 = 1e-12;

/// Projective denominator magnitude below which `apply` fails.
pub const DEGENERATE_W_EPS: f64 = 1e-12;

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HomographyError {
    /// Wrong number of correspondences.
    InvalidInput { pixel: usize, metric: usize },
    /// A pivot of the 8×9 system fell below [`SINGULAR_PIVOT_EPS`].
    SingularSystem { column: usize, pivot: f64 },
    /// |det H| fell below [`SINGULAR_DET_EPS`].
    NonInvertible { det: f64 },
    /// The point lies on (or numerically at) the vanishing line.
    DegenerateProjection { w: f64 },
}

impl std::fmt::Display for HomographyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput { pixel, metric } => write!(
                f,
                "invalid input: need {} pixel and {} metric points, got {} and {}",
                N_CORRESPONDENCES, N_CORRESPONDENCES, pixel, metric
            ),
            Self::SingularSystem { column, pivot } => write!(
                f,
                "singular system: pivot {:.3e} in column {} (points collinear or coincident)",
                pivot, column
            ),
            Self::NonInvertible { det } => {
                write!(f, "homography not invertible: det = {:.3e}", det)
            }
            Self::DegenerateProjection { w } => {
                write!(f, "degenerate projection: w = {:.3e}", w)
            }
        }
    }
}

impl std::error::Error for HomographyError {}

// ── Homography ───────────────────────────────────────────────────────────

/// Immutable, non-degenerate 3×3 projective transform.
///
/// Serialized as 9 row-major scalars. Only the up-to-scale ratio matters;
/// `h33` is not forced to 1 (an inverse generally has `h33 != 1`).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "[f64; 9]", into = "[f64; 9]")]
pub struct Homography {
    m: Matrix3<f64>,
}

impl Homography {
    /// Wrap a matrix, rejecting it when |det| < [`SINGULAR_DET_EPS`].
    pub fn from_matrix(m: Matrix3<f64>) -> Result<Self, HomographyError> {
        let det = m.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_DET_EPS {
            return Err(HomographyError::NonInvertible { det });
        }
        Ok(Self { m })
    }

    /// Build from 9 row-major scalars.
    pub fn from_row_major(h: [f64; 9]) -> Result<Self, HomographyError> {
        Self::from_matrix(Matrix3::from_row_slice(&h))
    }

    /// Row-major copy of the 9 entries.
    pub fn to_row_major(&self) -> [f64; 9] {
        let m = &self.m;
        [
            m[(0, 0)], m[(0, 1)], m[(0, 2)],
            m[(1, 0)], m[(1, 1)], m[(1, 2)],
            m[(2, 0)], m[(2, 1)], m[(2, 2)],
        ]
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.m
    }

    pub fn determinant(&self) -> f64 {
        self.m.determinant()
    }

    /// See [`apply_homography`].
    pub fn apply(&self, p: [f64; 2]) -> Result<[f64; 2], HomographyError> {
        apply_homography(p, self)
    }

    /// See [`invert_homography`].
    pub fn inverse(&self) -> Result<Homography, HomographyError> {
        invert_homography(self)
    }
}

impl TryFrom<[f64; 9]> for Homography {
    type Error = HomographyError;

    fn try_from(h: [f64; 9]) -> Result<Self, Self::Error> {
        Self::from_row_major(h)
    }
}

impl From<Homography> for [f64; 9] {
    fn from(h: Homography) -> Self {
        h.to_row_major()
    }
}

// ── DLT ──────────────────────────────────────────────────────────────────

/// Estimate the homography mapping `pixel[i]` onto `metric[i]`.
///
/// Exactly four correspondences give eight equations for the eight free
/// entries (h33 = 1). The augmented 8×9 system is solved directly; there is
/// no least-squares or normalization step.
pub fn compute_homography(
    pixel: &[[f64; 2]],
    metric: &[[f64; 2]],
) -> Result<Homography, HomographyError> {
    if pixel.len() != N_CORRESPONDENCES || metric.len() != N_CORRESPONDENCES {
        return Err(HomographyError::InvalidInput {
            pixel: pixel.len(),
            metric: metric.len(),
        });
    }

    let mut a = SMatrix::<f64, 8, 9>::zeros();
    for (i, (p, m)) in pixel.iter().zip(metric).enumerate() {
        let (x, y) = (p[0], p[1]);
        let (mx, my) = (m[0], m[1]);

        // Row 2i:   [ x  y  1 | 0  0  0 | -X*x  -X*y | X ]
        let r = 2 * i;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -mx * x;
        a[(r, 7)] = -mx * y;
        a[(r, 8)] = mx;

        // Row 2i+1: [ 0  0  0 | x  y  1 | -Y*x  -Y*y | Y ]
        let r = 2 * i + 1;
        a[(r, 3)] = x;
        a[(r, 4)] = y;
        a[(r, 5)] = 1.0;
        a[(r, 6)] = -my * x;
        a[(r, 7)] = -my * y;
        a[(r, 8)] = my;
    }

    let h = solve_augmented(a)?;
    let m = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
    Homography::from_matrix(m)
}

/// Gaussian elimination with partial pivoting on an 8×9 augmented matrix.
///
/// Row operations start at the pivot column, so identical columns stay
/// bit-identical and an exactly rank-deficient system yields an exactly
/// zero pivot.
fn solve_augmented(mut a: SMatrix<f64, 8, 9>) -> Result<[f64; 8], HomographyError> {
    const N: usize = 8;
    const M: usize = 9;

    for i in 0..N {
        let mut piv = i;
        for r in (i + 1)..N {
            if a[(r, i)].abs() > a[(piv, i)].abs() {
                piv = r;
            }
        }
        let pivot = a[(piv, i)];
        if !(pivot.abs() >= SINGULAR_PIVOT_EPS) {
            return Err(HomographyError::SingularSystem { column: i, pivot });
        }
        if piv != i {
            a.swap_rows(i, piv);
        }

        for c in i..M {
            a[(i, c)] /= pivot;
        }
        for r in (i + 1)..N {
            let f = a[(r, i)];
            if f == 0.0 {
                continue;
            }
            for c in i..M {
                a[(r, c)] -= f * a[(i, c)];
            }
        }
    }

    let mut x = [0.0f64; N];
    for i in (0..N).rev() {
        let mut s = a[(i, M - 1)];
        for c in (i + 1)..N {
            s -= a[(i, c)] * x[c];
        }
        x[i] = s / a[(i, i)];
    }
    Ok(x)
}

// ── Projection ───────────────────────────────────────────────────────────

/// Project a point through `h`: `[x', y'] = (H · [x, y, 1]ᵀ)` dehomogenized.
///
/// Fails with [`HomographyError::DegenerateProjection`] when `|w|` is below
/// [`DEGENERATE_W_EPS`] or the result is not finite.
pub fn apply_homography(p: [f64; 2], h: &Homography) -> Result<[f64; 2], HomographyError> {
    let q = h.m * Vector3::new(p[0], p[1], 1.0);
    let w = q[2];
    if !(w.abs() >= DEGENERATE_W_EPS) {
        return Err(HomographyError::DegenerateProjection { w });
    }
    let out = [q[0] / w, q[1] / w];
    if !(out[0].is_finite() && out[1].is_finite()) {
        return Err(HomographyError::DegenerateProjection { w });
    }
    Ok(out)
}

// ── Inverse ──────────────────────────────────────────────────────────────

/// Closed-form inverse through the adjugate, divided by the determinant.
pub fn invert_homography(h: &Homography) -> Result<Homography, HomographyError> {
    let [a, b, c, d, e, f, g, hh, i] = h.to_row_major();

    // Cofactors.
    let ca = e * i - f * hh;
    let cb = -(d * i - f * g);
    let cc = d * hh - e * g;
    let cd = -(b * i - c * hh);
    let ce = a * i - c * g;
    let cf = -(a * hh - b * g);
    let cg = b * f - c * e;
    let ch = -(a * f - c * d);
    let ci = a * e - b * d;

    let det = a * ca + b * cb + c * cc;
    if !det.is_finite() || det.abs() < SINGULAR_DET_EPS {
        return Err(HomographyError::NonInvertible { det });
    }

    // Adjugate is the transposed cofactor matrix.
    Homography::from_row_major([
        ca / det, cd / det, cg / det,
        cb / det, ce / det, ch / det,
        cc / det, cf / det, ci / det,
    ])
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::{Rng, SeedableRng};

    const PIXEL_QUAD: [[f64; 2]; 4] = [
        [318.0, 102.0],
        [541.0, 236.0],
        [327.0, 411.0],
        [96.0, 247.0],
    ];

    fn metric_compass(r: f64) -> [[f64; 2]; 4] {
        [[0.0, r], [r, 0.0], [0.0, -r], [-r, 0.0]]
    }

    #[test]
    fn test_exact_calibration_recovery() {
        let metric = metric_compass(30.0);
        let h = compute_homography(&PIXEL_QUAD, &metric).unwrap();

        for (p, m) in PIXEL_QUAD.iter().zip(&metric) {
            let got = apply_homography(*p, &h).unwrap();
            assert_abs_diff_eq!(got[0], m[0], epsilon = 1e-6);
            assert_abs_diff_eq!(got[1], m[1], epsilon = 1e-6);
        }

        let h_inv = invert_homography(&h).unwrap();
        for (p, m) in PIXEL_QUAD.iter().zip(&metric) {
            let got = apply_homography(*m, &h_inv).unwrap();
            assert_relative_eq!(got[0], p[0], max_relative = 1e-6);
            assert_relative_eq!(got[1], p[1], max_relative = 1e-6);
        }
    }

    #[test]
    fn test_h33_is_one() {
        let h = compute_homography(&PIXEL_QUAD, &metric_compass(30.0)).unwrap();
        assert_eq!(h.to_row_major()[8], 1.0);
    }

    #[test]
    fn test_recovers_known_matrix() {
        let h_true = Homography::from_row_major([
            0.21, 0.01, -64.0, //
            -0.004, -0.19, 48.0, //
            0.0001, -0.00005, 1.0,
        ])
        .unwrap();
        let pixel = [[100.0, 80.0], [520.0, 95.0], [560.0, 400.0], [70.0, 380.0]];
        let metric: Vec<[f64; 2]> = pixel
            .iter()
            .map(|p| apply_homography(*p, &h_true).unwrap())
            .collect();

        let h_est = compute_homography(&pixel, &metric).unwrap();
        for (a, b) in h_est.to_row_major().iter().zip(h_true.to_row_major()) {
            assert_relative_eq!(*a, b, epsilon = 1e-9, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_collinear_points_are_singular() {
        let pixel = [[10.0, 10.0], [20.0, 20.0], [30.0, 30.0], [40.0, 40.0]];
        let err = compute_homography(&pixel, &metric_compass(30.0)).unwrap_err();
        assert!(
            matches!(err, HomographyError::SingularSystem { .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_coincident_points_are_singular() {
        let pixel = [[200.0, 150.0]; 4];
        let err = compute_homography(&pixel, &metric_compass(30.0)).unwrap_err();
        assert!(matches!(err, HomographyError::SingularSystem { .. }));
    }

    #[test]
    fn test_wrong_point_count() {
        let err = compute_homography(&PIXEL_QUAD[..3], &metric_compass(30.0)).unwrap_err();
        assert_eq!(err, HomographyError::InvalidInput { pixel: 3, metric: 4 });

        let five = [[0.0, 0.0]; 5];
        let err = compute_homography(&PIXEL_QUAD, &five).unwrap_err();
        assert_eq!(err, HomographyError::InvalidInput { pixel: 4, metric: 5 });
    }

    #[test]
    fn test_round_trip_random_points() {
        let h = compute_homography(&PIXEL_QUAD, &metric_compass(30.0)).unwrap();
        let h_inv = invert_homography(&h).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let p = [rng.gen_range(0.0..640.0), rng.gen_range(0.0..480.0)];
            let q = match apply_homography(p, &h) {
                Ok(q) => q,
                Err(_) => continue,
            };
            let back = apply_homography(q, &h_inv).unwrap();
            assert_relative_eq!(back[0], p[0], epsilon = 1e-6, max_relative = 1e-8);
            assert_relative_eq!(back[1], p[1], epsilon = 1e-6, max_relative = 1e-8);
        }
    }

    #[test]
    fn test_inverse_matches_nalgebra() {
        let h = compute_homography(&PIXEL_QUAD, &metric_compass(30.0)).unwrap();
        let ours = invert_homography(&h).unwrap();
        let reference = h.matrix().try_inverse().unwrap();
        for r in 0..3 {
            for c in 0..3 {
                assert_relative_eq!(
                    ours.matrix()[(r, c)],
                    reference[(r, c)],
                    epsilon = 1e-12,
                    max_relative = 1e-9
                );
            }
        }
    }

    #[test]
    fn test_non_invertible_rejected() {
        let err = Homography::from_row_major([1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 0.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, HomographyError::NonInvertible { .. }));
    }

    #[test]
    fn test_apply_on_vanishing_line_fails() {
        // w = x - 99: the line x = 99 maps to infinity.
        let h = Homography::from_row_major([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, -99.0])
            .unwrap();
        let err = apply_homography([99.0, 5.0], &h).unwrap_err();
        assert!(matches!(err, HomographyError::DegenerateProjection { .. }));
        assert!(apply_homography([100.0, 5.0], &h).is_ok());
    }

    #[test]
    fn test_serde_row_major() {
        let h = compute_homography(&PIXEL_QUAD, &metric_compass(30.0)).unwrap();
        let json = serde_json::to_string(&h).unwrap();
        let back: Homography = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);

        let singular = "[0,0,0,0,0,0,0,0,1]";
        assert!(serde_json::from_str::<Homography>(singular).is_err());
    }
}
