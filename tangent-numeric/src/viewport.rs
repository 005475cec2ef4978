//! Visible x-range and point input helpers

use serde::{Deserialize, Serialize};

/// Zoom-in factor for one step; zoom out uses its reciprocal
pub const ZOOM_STEP: f64 = 0.85;

/// Visible x-range of the plot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub min: f64,
    pub max: f64,
}

impl Viewport {
    /// Range with ends in either order
    pub fn new(a: f64, b: f64) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    /// Default window centred on `a`
    pub fn around(a: f64) -> Self {
        let span = 2.0 + f64::max(1.0, a.abs());
        Self { min: a - span, max: a + span }
    }

    /// Window centred on an integration range, falling back to 0
    pub fn around_range(lower: f64, upper: f64) -> Self {
        let mid = (lower + upper) / 2.0;
        Self::around(if mid.is_finite() { mid } else { 0.0 })
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Scale the width about the midpoint
    pub fn zoom(&self, factor: f64) -> Self {
        let c = self.center();
        let half = self.width() * factor / 2.0;
        Self { min: c - half, max: c + half }
    }

    pub fn zoom_in(&self) -> Self {
        self.zoom(ZOOM_STEP)
    }

    pub fn zoom_out(&self) -> Self {
        self.zoom(1.0 / ZOOM_STEP)
    }

    /// Widen by `fraction` of the width on each side
    pub fn padded(&self, fraction: f64) -> Self {
        let pad = self.width() * fraction;
        Self { min: self.min - pad, max: self.max + pad }
    }

    /// Non-empty, and finite even after the sampler pads it
    pub fn is_valid(&self) -> bool {
        let padded = self.padded(crate::sampler::EDGE_PADDING);
        self.max > self.min && self.width().is_finite() && padded.min.is_finite() && padded.max.is_finite()
    }
}

/// Parse a point typed by a user
///
/// Accepts decimals with either `.` or `,` as separator and integer
/// fractions such as `-1/2`. Blank or invalid text gives `None`.
pub fn parse_point(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let sanitized = trimmed.replacen(',', ".", 1);

    if let Some((numer, denom)) = sanitized.split_once('/') {
        let numer: i64 = parse_integer(numer)?;
        let denom: i64 = parse_integer(denom)?;
        if denom == 0 {
            return None;
        }
        return Some(numer as f64 / denom as f64);
    }

    let value: f64 = sanitized.parse().ok()?;
    value.is_finite().then_some(value)
}

fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_around_small_point() {
        let v = Viewport::around(0.0);
        assert_eq!((v.min, v.max), (-3.0, 3.0));
    }

    #[test]
    fn test_around_large_point() {
        let v = Viewport::around(-10.0);
        assert_eq!((v.min, v.max), (-22.0, 2.0));
    }

    #[test]
    fn test_around_range_falls_back_to_origin() {
        assert_eq!(Viewport::around_range(f64::NAN, 1.0), Viewport::around(0.0));
        assert_eq!(Viewport::around_range(0.0, 4.0), Viewport::around(2.0));
    }

    #[test]
    fn test_zoom_keeps_center() {
        let v = Viewport::new(2.0, -2.0);
        let z = v.zoom_in();
        assert_eq!(z.center(), 0.0);
        assert!((z.width() - 4.0 * ZOOM_STEP).abs() < 1e-12);
        let back = z.zoom_out();
        assert!((back.width() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_padded() {
        let p = Viewport::new(0.0, 10.0).padded(0.08);
        assert!((p.min + 0.8).abs() < 1e-12);
        assert!((p.max - 10.8).abs() < 1e-12);
    }

    #[test]
    fn test_validity() {
        assert!(Viewport::new(-3.0, 3.0).is_valid());
        assert!(!Viewport::new(1.0, 1.0).is_valid());
        assert!(!Viewport::new(f64::NEG_INFINITY, 0.0).is_valid());
        assert!(!Viewport::new(0.0, f64::NAN).is_valid());
        // Finite ends whose width overflows
        assert!(!Viewport::new(-1e308, 1e308).is_valid());
        assert!(!Viewport::new(0.0, f64::MAX).is_valid());
        assert!(Viewport::new(0.0, 1e300).is_valid());
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("1.5"), Some(1.5));
        assert_eq!(parse_point(" 1,5 "), Some(1.5));
        assert_eq!(parse_point("-1/2"), Some(-0.5));
        assert_eq!(parse_point("3 / 4"), Some(0.75));
        assert_eq!(parse_point("1/0"), None);
        assert_eq!(parse_point("1.5/2"), None);
        assert_eq!(parse_point("   "), None);
        assert_eq!(parse_point("abc"), None);
        assert_eq!(parse_point("inf"), None);
    }
}
