//! Composite Simpson integration

use tangent_expr::{CompiledExpr, Univariate};

/// Number of slices (even)
pub const SLICES: usize = 800;

/// Simpson's rule over [lower, upper]
///
/// `None` means no numeric answer is available: a non-finite bound or
/// step, or any non-finite sample. A zero-width interval is exactly 0
/// without evaluating `f`.
pub fn simpson(f: impl Univariate, lower: f64, upper: f64) -> Option<f64> {
    if !lower.is_finite() || !upper.is_finite() {
        return None;
    }
    let h = (upper - lower) / SLICES as f64;
    if !h.is_finite() {
        return None;
    }
    if h == 0.0 {
        return Some(0.0);
    }

    let mut sum = 0.0;
    for i in 0..=SLICES {
        let y = f.at(lower + i as f64 * h);
        if !y.is_finite() {
            return None;
        }
        let coef = if i == 0 || i == SLICES {
            1.0
        } else if i % 2 == 0 {
            2.0
        } else {
            4.0
        };
        sum += coef * y;
    }

    Some(h / 3.0 * sum)
}

/// Definite integral of a compiled expression, `None` if it does not compile
pub fn numeric_integral(expr: &CompiledExpr, var: &str, lower: f64, upper: f64) -> Option<f64> {
    if !expr.is_ok() {
        return None;
    }
    simpson(expr.bind(var), lower, upper)
}
