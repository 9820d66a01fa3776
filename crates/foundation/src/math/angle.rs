use std::f64::consts::PI;

/// Normalize an angle in radians into `(-PI, PI]`.
pub fn normalize_angle(theta: f64) -> f64 {
    let mut t = theta % (2.0 * PI);
    if t > PI {
        t -= 2.0 * PI;
    } else if t <= -PI {
        t += 2.0 * PI;
    }
    t
}

#[cfg(test)]
mod tests {
    use super::normalize_angle;
    use std::f64::consts::PI;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn folds_into_half_open_range() {
        assert_close(normalize_angle(0.0), 0.0, 1e-15);
        assert_close(normalize_angle(PI), PI, 1e-15);
        assert_close(normalize_angle(-PI), PI, 1e-12);
        assert_close(normalize_angle(3.0 * PI / 2.0), -PI / 2.0, 1e-12);
        assert_close(normalize_angle(-5.0 * PI / 2.0), -PI / 2.0, 1e-12);
    }

    #[test]
    fn result_is_always_in_range() {
        for i in -50..50 {
            let t = normalize_angle(i as f64 * 0.7);
            assert!(t > -PI && t <= PI, "{t} out of range");
        }
    }
}
