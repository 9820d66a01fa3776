use foundation::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ProjectionError;

/// Six world file coefficients linking pixel space to a map coordinate
/// system.
///
/// Forward: `X = a*x - b*y + c`, `Y = d*x - e*y + f`. Pixel Y arrives
/// already negated (tile space grows downward), hence the subtractions.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldParams {
    #[serde(rename = "xScale")]
    pub a: f64,
    #[serde(rename = "xRotation")]
    pub b: f64,
    #[serde(rename = "xOrigin")]
    pub c: f64,
    #[serde(rename = "yRotation")]
    pub d: f64,
    #[serde(rename = "yScale")]
    pub e: f64,
    #[serde(rename = "yOrigin")]
    pub f: f64,
}

impl WorldParams {
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }
}

/// The System↔Map stage: an invertible affine transform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WorldFile {
    params: WorldParams,
    det: f64,
}

impl WorldFile {
    /// Rejects coefficient sets whose linear part cannot be inverted.
    pub fn new(params: WorldParams) -> Result<Self, ProjectionError> {
        let det = params.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(ProjectionError::DegenerateWorldFile { determinant: det });
        }
        Ok(Self { params, det })
    }

    pub fn params(&self) -> &WorldParams {
        &self.params
    }

    pub fn forward(&self, p: Vec2) -> Vec2 {
        let WorldParams { a, b, c, d, e, f } = self.params;
        Vec2::new(a * p.x - b * p.y + c, d * p.x - e * p.y + f)
    }

    pub fn inverse(&self, p: Vec2) -> Vec2 {
        let WorldParams { a, b, c, d, e, f } = self.params;
        Vec2::new(
            (p.x * e - p.y * b - c * e + f * b) / self.det,
            -(p.y * a - p.x * d - f * a + c * d) / self.det,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{WorldFile, WorldParams};
    use crate::error::ProjectionError;
    use foundation::Vec2;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn scale_and_offset() {
        let wf = WorldFile::new(WorldParams::new(2.0, 0.0, 10.0, 0.0, 2.0, 20.0)).unwrap();
        let out = wf.forward(Vec2::new(1.0, 1.0));
        assert_eq!(out, Vec2::new(12.0, 18.0));
        let back = wf.inverse(out);
        assert_close(back.x, 1.0, 1e-12);
        assert_close(back.y, 1.0, 1e-12);
    }

    #[test]
    fn rotated_round_trip() {
        let wf = WorldFile::new(WorldParams::new(0.8, 0.3, -5.0, -0.2, 1.1, 7.5)).unwrap();
        for p in [Vec2::new(0.0, 0.0), Vec2::new(123.0, -456.0), Vec2::new(-9.5, 3.25)] {
            let back = wf.inverse(wf.forward(p));
            assert_close(back.x, p.x, 1e-9);
            assert_close(back.y, p.y, 1e-9);
        }
    }

    #[test]
    fn singular_params_are_rejected() {
        let err = WorldFile::new(WorldParams::new(1.0, 2.0, 0.0, 2.0, 4.0, 0.0)).unwrap_err();
        assert!(matches!(err, ProjectionError::DegenerateWorldFile { .. }));
    }

    #[test]
    fn deserializes_named_coefficients() {
        let json = r#"{"xScale":2,"xRotation":0,"xOrigin":10,"yRotation":0,"yScale":2,"yOrigin":20}"#;
        let p: WorldParams = serde_json::from_str(json).unwrap();
        assert_eq!(p, WorldParams::new(2.0, 0.0, 10.0, 0.0, 2.0, 20.0));
    }
}
