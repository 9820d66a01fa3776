//! Carry a viewport (center, rotation, resolution) from one projection to
//! another so the same ground area stays in view across a map switch.
//!
//! Local rotation and scale of a projection are estimated by sampling eight
//! points on a circle of `radius` reference units around the center.

use std::f64::consts::FRAC_PI_4;

use foundation::Vec2;
use foundation::math::normalize_angle;
use tracing::debug;

use crate::error::ProjectionError;
use crate::registry::{ProjectionRegistry, REFERENCE_CODE};

/// Default sampling radius, in reference units (meters).
pub const DEFAULT_BASE_RADIUS: f64 = 500.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewParams {
    pub center: Vec2,
    /// Radians.
    pub rotation: f64,
    /// Projection units per screen pixel.
    pub resolution: f64,
}

impl ViewParams {
    pub fn new(center: Vec2, rotation: f64, resolution: f64) -> Self {
        Self {
            center,
            rotation,
            resolution,
        }
    }
}

/// Local frame of `proj` around a reference-space center.
#[derive(Debug, Copy, Clone, PartialEq)]
struct LocalFrame {
    center: Vec2,
    angle: f64,
    mean_distance: f64,
}

fn sample_directions() -> [f64; 8] {
    std::array::from_fn(|k| k as f64 * FRAC_PI_4)
}

fn local_frame(
    registry: &ProjectionRegistry,
    base_center: Vec2,
    radius: f64,
    proj: &str,
) -> Result<LocalFrame, ProjectionError> {
    let to_proj = registry.transformer(REFERENCE_CODE, proj)?;
    let center = to_proj(base_center)?;

    let mut sum_cos = 0.0;
    let mut sum_sin = 0.0;
    let mut sum_dist = 0.0;
    let thetas = sample_directions();
    for theta in thetas {
        let sample = base_center + Vec2::new(theta.sin(), theta.cos()) * radius;
        let d = to_proj(sample)? - center;
        let angle = normalize_angle(d.x.atan2(d.y) - theta);
        sum_cos += angle.cos();
        sum_sin += angle.sin();
        sum_dist += d.length();
    }

    // A collapsed or exploded sample ring has no usable scale.
    let mean_distance = sum_dist / thetas.len() as f64;
    if !(mean_distance.is_finite() && mean_distance > 0.0) {
        return Err(ProjectionError::NonFinite);
    }

    Ok(LocalFrame {
        center,
        angle: sum_sin.atan2(sum_cos),
        mean_distance,
    })
}

/// View in `proj` to the equivalent reference view.
pub fn view_to_reference(
    registry: &ProjectionRegistry,
    view: ViewParams,
    radius: f64,
    proj: &str,
) -> Result<ViewParams, ProjectionError> {
    let center = registry.transform(view.center, proj, REFERENCE_CODE)?;
    let frame = local_frame(registry, center, radius, proj)?;
    Ok(ViewParams::new(
        center,
        normalize_angle(view.rotation + frame.angle),
        view.resolution * radius / frame.mean_distance,
    ))
}

/// Reference view to the equivalent view in `proj`.
pub fn view_from_reference(
    registry: &ProjectionRegistry,
    view: ViewParams,
    radius: f64,
    proj: &str,
) -> Result<ViewParams, ProjectionError> {
    let frame = local_frame(registry, view.center, radius, proj)?;
    Ok(ViewParams::new(
        frame.center,
        normalize_angle(view.rotation - frame.angle),
        view.resolution * frame.mean_distance / radius,
    ))
}

/// Convert a view between two registered projections.
///
/// Returns the input unchanged when `from == to`.
pub fn convert_view(
    registry: &ProjectionRegistry,
    view: ViewParams,
    radius: f64,
    from: &str,
    to: &str,
) -> Result<ViewParams, ProjectionError> {
    if from == to {
        return Ok(view);
    }
    let mid = if from == REFERENCE_CODE {
        view
    } else {
        view_to_reference(registry, view, radius, from)?
    };
    let out = if to == REFERENCE_CODE {
        mid
    } else {
        view_from_reference(registry, mid, radius, to)?
    };
    debug!(from, to, ?view, ?out, "view converted");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use approx::assert_relative_eq;
    use foundation::{Extent, Vec2};

    use super::{DEFAULT_BASE_RADIUS, ViewParams, convert_view};
    use crate::chain::TransformPair;
    use crate::error::ProjectionError;
    use crate::registry::{ProjectionEntry, ProjectionRegistry, REFERENCE_CODE, Units};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn entry(code: &str) -> ProjectionEntry {
        let e = Extent::from_array([0.0, -1000.0, 1000.0, 0.0]);
        ProjectionEntry::new(code, Units::Pixels, e, e)
    }

    /// Pixel space at `scale` pixels per meter, rotated by `angle`.
    fn rotated_scaled(scale: f64, angle: f64) -> TransformPair {
        let (s, c) = angle.sin_cos();
        TransformPair::new(
            move |p: Vec2| {
                let q = p / scale;
                Ok(Vec2::new(q.x * c - q.y * s, q.x * s + q.y * c))
            },
            move |p: Vec2| {
                let q = Vec2::new(p.x * c + p.y * s, -p.x * s + p.y * c);
                Ok(q * scale)
            },
        )
    }

    #[test]
    fn same_projection_returns_input() {
        let reg = ProjectionRegistry::new();
        let view = ViewParams::new(Vec2::new(1.0, 2.0), 0.3, 7.0);
        let out = convert_view(&reg, view, DEFAULT_BASE_RADIUS, "Maplat:x", "Maplat:x").unwrap();
        assert_eq!(out, view);
    }

    #[test]
    fn pure_scale_changes_resolution_only() {
        let mut reg = ProjectionRegistry::new();
        reg.register(entry("Maplat:s"), rotated_scaled(4.0, 0.0));
        let view = ViewParams::new(Vec2::new(400.0, -400.0), 0.0, 2.0);
        let out = convert_view(&reg, view, DEFAULT_BASE_RADIUS, "Maplat:s", REFERENCE_CODE).unwrap();
        assert_relative_eq!(out.center.x, 100.0, epsilon = 1e-9);
        assert_relative_eq!(out.center.y, -100.0, epsilon = 1e-9);
        assert_relative_eq!(out.resolution, 0.5, epsilon = 1e-9);
        assert_close(out.rotation, 0.0, 1e-9);
    }

    #[test]
    fn rotation_is_carried_between_maps() {
        let mut reg = ProjectionRegistry::new();
        reg.register(entry("Maplat:a"), rotated_scaled(1.0, 0.0));
        reg.register(entry("Maplat:b"), rotated_scaled(1.0, FRAC_PI_2));
        let view = ViewParams::new(Vec2::new(10.0, 20.0), 0.0, 1.0);
        let out = convert_view(&reg, view, DEFAULT_BASE_RADIUS, "Maplat:a", "Maplat:b").unwrap();
        assert_close(out.resolution, 1.0, 1e-9);
        assert_close(out.rotation.abs(), FRAC_PI_2, 1e-9);
        assert!(out.rotation > -PI && out.rotation <= PI);

        let back = convert_view(&reg, out, DEFAULT_BASE_RADIUS, "Maplat:b", "Maplat:a").unwrap();
        assert_close(back.center.x, 10.0, 1e-9);
        assert_close(back.center.y, 20.0, 1e-9);
        assert_close(back.rotation, 0.0, 1e-9);
        assert_close(back.resolution, 1.0, 1e-9);
    }

    #[test]
    fn collapsed_projection_is_an_error() {
        let mut reg = ProjectionRegistry::new();
        reg.register(
            entry("Maplat:flat"),
            TransformPair::new(|p: Vec2| Ok(p), |_: Vec2| Ok(Vec2::new(3.0, 3.0))),
        );
        let view = ViewParams::new(Vec2::new(100.0, 100.0), 0.0, 1.0);
        let err = convert_view(&reg, view, DEFAULT_BASE_RADIUS, "Maplat:flat", REFERENCE_CODE).unwrap_err();
        assert!(matches!(err, ProjectionError::NonFinite));
        let err = convert_view(&reg, view, DEFAULT_BASE_RADIUS, REFERENCE_CODE, "Maplat:flat").unwrap_err();
        assert!(matches!(err, ProjectionError::NonFinite));
    }

    #[test]
    fn unknown_projection_fails() {
        let reg = ProjectionRegistry::new();
        let view = ViewParams::new(Vec2::ZERO, 0.0, 1.0);
        assert!(convert_view(&reg, view, DEFAULT_BASE_RADIUS, REFERENCE_CODE, "Maplat:none").is_err());
    }
}
