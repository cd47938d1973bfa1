//! One dimensional natural cubic spline

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::SplineError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A natural cubic spline through a set of knots.
///
/// On segment `i` the value is `a·ds³ + b·ds² + c·ds + d` with
/// `ds = t - knots[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    knots: Vec<f64>,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

/// Polynomial coefficients of one segment, highest power first.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cubic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CubicSpline {
    /// Fit a spline passing through `values` at the strictly increasing
    /// `knots`.
    pub fn fit(knots: &[f64], values: &[f64]) -> Result<Self, SplineError> {
        let n = knots.len();

        if n != values.len() {
            return Err(SplineError::LengthMismatch(n, values.len()));
        }
        if n < 2 {
            return Err(SplineError::NotEnoughPoints(n));
        }

        let h: Vec<f64> = knots.windows(2).map(|w| w[1] - w[0]).collect();
        if let Some(i) = h.iter().position(|&hi| !(hi > 0.0)) {
            return Err(SplineError::RepeatedPoint(i + 1));
        }

        // Solve for the quadratic coefficients, the natural end conditions fix
        // them to zero at both ends
        let mut lower = vec![0.0; n];
        let mut diag = vec![1.0; n];
        let mut upper = vec![0.0; n];
        let mut rhs = vec![0.0; n];

        for i in 1..n - 1 {
            lower[i] = h[i - 1];
            diag[i] = 2.0 * (h[i - 1] + h[i]);
            upper[i] = h[i];
            rhs[i] = 3.0 * (values[i + 1] - values[i]) / h[i]
                - 3.0 * (values[i] - values[i - 1]) / h[i - 1];
        }

        let quad = solve_tridiagonal(&lower, &diag, &upper, &rhs)
            .ok_or(SplineError::SingularSystem)?;

        let mut spline = Self {
            knots: knots.to_vec(),
            a: Vec::with_capacity(n - 1),
            b: Vec::with_capacity(n - 1),
            c: Vec::with_capacity(n - 1),
            d: Vec::with_capacity(n - 1),
        };

        for i in 0..n - 1 {
            spline.a.push((quad[i + 1] - quad[i]) / (3.0 * h[i]));
            spline.b.push(quad[i]);
            spline
                .c
                .push((values[i + 1] - values[i]) / h[i] - h[i] * (quad[i + 1] + 2.0 * quad[i]) / 3.0);
            spline.d.push(values[i]);
        }

        Ok(spline)
    }

    pub fn num_segments(&self) -> usize {
        self.a.len()
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Index of the segment containing `t`, clamped to the valid segments.
    pub fn segment_index(&self, t: f64) -> usize {
        // Number of knots at or before t, less one
        let after = self.knots.partition_point(|&k| k <= t);
        after.saturating_sub(1).min(self.num_segments() - 1)
    }

    pub fn segment(&self, index: usize) -> Cubic {
        Cubic {
            a: self.a[index],
            b: self.b[index],
            c: self.c[index],
            d: self.d[index],
        }
    }

    pub fn eval(&self, t: f64) -> f64 {
        let i = self.segment_index(t);
        self.segment(i).eval(t - self.knots[i])
    }

    pub fn deriv(&self, t: f64) -> f64 {
        let i = self.segment_index(t);
        self.segment(i).deriv(t - self.knots[i])
    }
}

impl Cubic {
    pub fn eval(&self, ds: f64) -> f64 {
        ((self.a * ds + self.b) * ds + self.c) * ds + self.d
    }

    pub fn deriv(&self, ds: f64) -> f64 {
        (3.0 * self.a * ds + 2.0 * self.b) * ds + self.c
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve a tridiagonal system with the Thomas algorithm.
///
/// Row `i` reads `lower[i] x[i-1] + diag[i] x[i] + upper[i] x[i+1] = rhs[i]`,
/// `lower[0]` and `upper[n-1]` are ignored. Returns `None` on a zero pivot.
fn solve_tridiagonal(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Option<Vec<f64>> {
    let n = diag.len();
    let mut upper_prime = vec![0.0; n];
    let mut x = vec![0.0; n];

    // Forward sweep
    for i in 0..n {
        let (sub, prev_upper, prev_x) = match i {
            0 => (0.0, 0.0, 0.0),
            _ => (lower[i], upper_prime[i - 1], x[i - 1]),
        };

        let pivot = diag[i] - sub * prev_upper;
        if pivot == 0.0 || !pivot.is_finite() {
            return None;
        }

        upper_prime[i] = if i + 1 < n { upper[i] / pivot } else { 0.0 };
        x[i] = (rhs[i] - sub * prev_x) / pivot;
    }

    // Back substitution
    for i in (0..n.saturating_sub(1)).rev() {
        x[i] -= upper_prime[i] * x[i + 1];
    }

    Some(x)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interpolates_knots() {
        let knots = [0.0, 1.0, 2.5, 4.0];
        let values = [0.0, 2.0, -1.0, 0.5];
        let spline = CubicSpline::fit(&knots, &values).unwrap();

        assert_eq!(spline.num_segments(), 3);
        for (t, v) in knots.iter().zip(values.iter()) {
            assert_relative_eq!(spline.eval(*t), *v, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_continuous_derivative() {
        let knots = [0.0, 1.0, 2.0, 3.0];
        let spline = CubicSpline::fit(&knots, &[0.0, 1.0, 0.0, 1.0]).unwrap();

        for i in 1..3 {
            let left = spline.segment(i - 1).deriv(knots[i] - knots[i - 1]);
            let right = spline.segment(i).deriv(0.0);
            assert_relative_eq!(left, right, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_linear_data() {
        let spline = CubicSpline::fit(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]).unwrap();
        assert_relative_eq!(spline.eval(0.5), 2.0, epsilon = 1e-9);
        assert_relative_eq!(spline.deriv(1.7), 2.0, epsilon = 1e-9);

        let seg = spline.segment(0);
        assert_relative_eq!(seg.a, 0.0, epsilon = 1e-12);
        assert_relative_eq!(seg.b, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tridiagonal_matches_dense() {
        use nalgebra::{DMatrix, DVector};

        let n = 6;
        let lower: Vec<f64> = (0..n).map(|i| 0.5 + i as f64 * 0.1).collect();
        let diag: Vec<f64> = (0..n).map(|i| 4.0 + (i % 3) as f64).collect();
        let upper: Vec<f64> = (0..n).map(|i| 1.0 - i as f64 * 0.05).collect();
        let rhs: Vec<f64> = (0..n).map(|i| (i as f64).sin() * 3.0).collect();

        let mut dense = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            dense[(i, i)] = diag[i];
            if i > 0 {
                dense[(i, i - 1)] = lower[i];
            }
            if i + 1 < n {
                dense[(i, i + 1)] = upper[i];
            }
        }
        let expected = dense.lu().solve(&DVector::from_vec(rhs.clone())).unwrap();

        let x = solve_tridiagonal(&lower, &diag, &upper, &rhs).unwrap();
        for i in 0..n {
            assert_relative_eq!(x[i], expected[i], epsilon = 1e-9);
        }

        assert!(solve_tridiagonal(&[0.0], &[0.0], &[0.0], &[1.0]).is_none());
    }

    #[test]
    fn test_long_path() {
        let knots: Vec<f64> = (0..5000).map(|i| i as f64 * 0.5).collect();
        let values: Vec<f64> = knots.iter().map(|t| (t * 0.05).sin() * 4.0).collect();
        let spline = CubicSpline::fit(&knots, &values).unwrap();

        assert_eq!(spline.num_segments(), 4999);
        for i in (0..knots.len()).step_by(97) {
            assert_relative_eq!(spline.eval(knots[i]), values[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_segment_index() {
        let spline = CubicSpline::fit(&[0.0, 1.0, 2.0], &[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(spline.segment_index(-1.0), 0);
        assert_eq!(spline.segment_index(0.5), 0);
        assert_eq!(spline.segment_index(1.0), 1);
        assert_eq!(spline.segment_index(2.0), 1);
        assert_eq!(spline.segment_index(10.0), 1);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            CubicSpline::fit(&[0.0], &[0.0]),
            Err(SplineError::NotEnoughPoints(1))
        ));
        assert!(matches!(
            CubicSpline::fit(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0]),
            Err(SplineError::RepeatedPoint(2))
        ));
        assert!(matches!(
            CubicSpline::fit(&[0.0, 1.0], &[0.0]),
            Err(SplineError::LengthMismatch(2, 1))
        ));
    }
}
