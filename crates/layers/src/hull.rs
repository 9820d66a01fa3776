use foundation::Vec2;
use foundation::math::cmp_xy;

/// Convex hull by Andrew's monotone chain, counter-clockwise, without the
/// closing point.
///
/// Fewer than three points are returned as given (sorted), so one- and
/// two-member clusters yield a degenerate ring rather than an error.
/// Collinear points on the hull boundary are dropped.
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| cmp_xy(*a, *b));
    if pts.len() < 3 {
        return pts;
    }

    fn turn(o: Vec2, a: Vec2, b: Vec2) -> f64 {
        (a - o).cross(b - o)
    }

    let mut lower: Vec<Vec2> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && turn(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Vec2> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && turn(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

#[cfg(test)]
mod tests {
    use super::convex_hull;
    use foundation::Vec2;

    #[test]
    fn square_with_interior_point() {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(
            hull,
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(2.0, 0.0),
                Vec2::new(2.0, 2.0),
                Vec2::new(0.0, 2.0),
            ]
        );
    }

    #[test]
    fn degenerate_inputs_do_not_fail() {
        assert!(convex_hull(&[]).is_empty());
        assert_eq!(convex_hull(&[Vec2::new(3.0, 4.0)]), vec![Vec2::new(3.0, 4.0)]);
        let two = convex_hull(&[Vec2::new(5.0, 0.0), Vec2::new(1.0, 0.0)]);
        assert_eq!(two, vec![Vec2::new(1.0, 0.0), Vec2::new(5.0, 0.0)]);
    }

    #[test]
    fn collinear_and_duplicate_points() {
        let line = convex_hull(&[Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0)]);
        assert_eq!(line, vec![Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0)]);
        let same = convex_hull(&[Vec2::new(1.0, 1.0); 4]);
        assert!(same.len() <= 2);
        assert!(same.iter().all(|p| *p == Vec2::new(1.0, 1.0)));
    }
}
