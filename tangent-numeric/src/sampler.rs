//! Plot sampling with gap and asymptote detection

use crate::viewport::Viewport;
use serde::Serialize;
use tangent_expr::Univariate;

/// Fraction of the viewport width sampled beyond each edge
pub const EDGE_PADDING: f64 = 0.08;

/// Samples above this magnitude are treated as gaps
pub const Y_CAP: f64 = 1e6;

const MIN_SAMPLES: usize = 400;
const MAX_SAMPLES: usize = 8000;

/// Contiguous run of accepted samples, never crossing a gap
pub type Segment = Vec<(f64, f64)>;

/// Geometry of one sampling pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sampling {
    pub segments: Vec<Segment>,
    /// Estimated vertical asymptotes, one per gap run, left to right
    pub asymptotes: Vec<f64>,
    /// Distance between neighbouring abscissas
    pub resolution: f64,
}

/// Number of grid intervals for a plot `px_width` pixels wide
pub fn sample_count(px_width: u32) -> usize {
    (px_width as usize / 2).clamp(MIN_SAMPLES, MAX_SAMPLES)
}

/// Sample `f` across the padded viewport
pub fn sample(f: impl Univariate, viewport: Viewport, px_width: u32) -> Sampling {
    let n = sample_count(px_width);
    let domain = viewport.padded(EDGE_PADDING);
    let (min, max) = (domain.min, domain.max);

    let xs: Vec<f64> = (0..=n).map(|i| min + (i as f64 * (max - min)) / n as f64).collect();
    let mut ys: Vec<Option<f64>> = xs
        .iter()
        .map(|&x| {
            let y = f.at(x);
            (y.is_finite() && y.abs() <= Y_CAP).then_some(y)
        })
        .collect();

    let (lo, hi) = ys.iter().flatten().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &y| {
        (lo.min(y), hi.max(y))
    });
    let span = hi - lo;
    let span = if span.is_finite() && span > 0.0 { span } else { 1.0 };
    let threshold = f64::max(50.0, span * 50.0);

    // A jump opens a gap at its right edge
    for i in 1..=n {
        if let (Some(a), Some(b)) = (ys[i - 1], ys[i]) {
            if (b - a).abs() > threshold {
                ys[i] = None;
            }
        }
    }

    let mut segments = Vec::new();
    let mut current: Segment = Vec::new();
    for (x, y) in xs.iter().zip(&ys) {
        match y {
            Some(y) => current.push((*x, *y)),
            None => {
                if current.len() > 1 {
                    segments.push(std::mem::take(&mut current));
                }
                current.clear();
            }
        }
    }
    if current.len() > 1 {
        segments.push(current);
    }

    let mut asymptotes = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, y) in ys.iter().enumerate() {
        match (y, run_start) {
            (None, None) => run_start = Some(i),
            (Some(_), Some(start)) => {
                asymptotes.push(xs[(start + i - 1) / 2]);
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        asymptotes.push(xs[(start + n) / 2]);
    }

    tracing::trace!(samples = n + 1, segments = segments.len(), asymptotes = asymptotes.len(), "sampled");

    Sampling { segments, asymptotes, resolution: (max - min) / n as f64 }
}

/// Collapse asymptote estimates closer than 1% of the viewport width
///
/// Sorted ascending; within a cluster the lowest estimate is kept.
pub fn merge_asymptotes(xs: &[f64], viewport: Viewport) -> Vec<f64> {
    let tol = viewport.width() * 0.01;
    let mut sorted: Vec<f64> = xs.iter().copied().filter(|x| !x.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);

    let mut out: Vec<f64> = Vec::with_capacity(sorted.len());
    for x in sorted {
        match out.last() {
            Some(&last) if (x - last).abs() <= tol => {}
            _ => out.push(x),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;
    use tangent_expr::CompiledExpr;

    #[test]
    fn test_sample_count_bounds() {
        assert_eq!(sample_count(100), 400);
        assert_eq!(sample_count(1000), 500);
        assert_eq!(sample_count(100_000), 8000);
    }

    #[test]
    fn test_smooth_function_is_one_segment() {
        let e = CompiledExpr::compile("x^2");
        let s = sample(e.bind("x"), Viewport::new(-2.0, 2.0), 960);
        assert_eq!(s.segments.len(), 1);
        assert_eq!(s.segments[0].len(), 481);
        assert!(s.asymptotes.is_empty());
        let (x0, _) = s.segments[0][0];
        assert!((x0 + 2.32).abs() < 1e-12);
    }

    // Only holds because `around(pi/2)` with an even sample count puts a grid
    // point on the pole. Between accepted samples the jump threshold is never
    // exceeded, so an off-grid pole (tan on [1, 2]) stays one segment.
    #[test]
    fn test_tan_splits_at_half_pi() {
        let e = CompiledExpr::compile("tan(x)");
        let s = sample(e.bind("x"), Viewport::around(FRAC_PI_2), 960);
        assert!(s.segments.len() >= 2);
        assert!(s
            .asymptotes
            .iter()
            .any(|a| (a - FRAC_PI_2).abs() <= s.resolution));
    }

    #[test]
    fn test_pole_at_grid_point() {
        let e = CompiledExpr::compile("1/x");
        let s = sample(e.bind("x"), Viewport::new(-1.0, 1.0), 800);
        assert_eq!(s.segments.len(), 2);
        assert_eq!(s.asymptotes.len(), 1);
        assert!(s.asymptotes[0].abs() < 1e-12);
    }

    #[test]
    fn test_gap_open_at_right_edge() {
        let e = CompiledExpr::compile("sqrt(-x)");
        let s = sample(e.bind("x"), Viewport::new(-1.0, 1.0), 800);
        assert_eq!(s.segments.len(), 1);
        assert_eq!(s.asymptotes.len(), 1);
        assert!(s.asymptotes[0] > 0.0);
    }

    #[test]
    fn test_nothing_finite() {
        let s = sample(|_: f64| f64::NAN, Viewport::new(0.0, 1.0), 800);
        assert!(s.segments.is_empty());
        assert_eq!(s.asymptotes.len(), 1);
    }

    #[test]
    fn test_resampling_is_idempotent() {
        let e = CompiledExpr::compile("tan(x) + 1/(x-1)");
        let v = Viewport::new(-4.0, 4.0);
        assert_eq!(sample(e.bind("x"), v, 1200), sample(e.bind("x"), v, 1200));
    }

    #[test]
    fn test_merge_asymptotes() {
        let v = Viewport::new(0.0, 10.0);
        let merged = merge_asymptotes(&[5.05, 1.0, 5.0, 1.2, 9.0], v);
        assert_eq!(merged, vec![1.0, 1.2, 5.0, 9.0]);
    }
}
