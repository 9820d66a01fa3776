//! Deterministic float ordering for sorts over coordinates.

use core::cmp::Ordering;

use super::Vec2;

/// `-0.0` folds into `0.0` and every NaN into one NaN.
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Total order over canonicalized floats. Use for every float sort.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}

/// Lexicographic `(x, y)` order.
pub fn cmp_xy(a: Vec2, b: Vec2) -> Ordering {
    stable_total_cmp_f64(a.x, b.x).then_with(|| stable_total_cmp_f64(a.y, b.y))
}
