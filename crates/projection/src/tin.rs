//! Triangulated irregular network warp built from Maplat compiled data.
//!
//! Inside the mesh a point is interpolated linearly over the triangle that
//! contains it. Outside, the affine map of the triangle whose centroid is
//! nearest is extrapolated.

use std::fmt;

use foundation::Vec2;
use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, warn};

const CONTAINS_EPS: f64 = 1e-10;

#[derive(Debug, Error)]
pub enum TinError {
    #[error("compiled data contains no usable triangles")]
    EmptyMesh,
    #[error("triangle vertex {0} does not resolve to a control point")]
    BadIndex(String),
    #[error("backward transform is not allowed for a strict_error mapping")]
    BackwardForbidden,
}

/// A control point pair: image-side and map-side coordinates.
///
/// The compiled form may carry a trailing id string, which is ignored.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ControlPoint {
    pub forw: [f64; 2],
    pub bakw: [f64; 2],
}

impl<'de> Deserialize<'de> for ControlPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PairVisitor;

        impl<'de> Visitor<'de> for PairVisitor {
            type Value = ControlPoint;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a [forw, bakw] coordinate pair")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ControlPoint, A::Error> {
                let forw = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let bakw = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(ControlPoint { forw, bakw })
            }
        }

        deserializer.deserialize_seq(PairVisitor)
    }
}

/// Triangle vertex reference: a GCP index, or a named auxiliary node
/// (`"c"`, `"b0".."b3"`, `"e<n>"`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TinIndex {
    Point(usize),
    Named(String),
}

impl fmt::Display for TinIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TinIndex::Point(i) => write!(f, "{i}"),
            TinIndex::Named(s) => write!(f, "{s:?}"),
        }
    }
}

/// Compiled TIN data as stored in legacy descriptors.
#[derive(Debug, Clone, Deserialize)]
pub struct CompiledTin {
    pub points: Vec<ControlPoint>,
    pub tins_points: Vec<Vec<[TinIndex; 3]>>,
    #[serde(default)]
    pub centroid_point: Option<ControlPoint>,
    #[serde(default)]
    pub vertices_points: Vec<ControlPoint>,
    #[serde(default, rename = "edgeNodes", alias = "edgesNodes")]
    pub edge_nodes: Vec<ControlPoint>,
    #[serde(default)]
    pub wh: Option<[f64; 2]>,
    #[serde(default)]
    pub strict_status: Option<String>,
    #[serde(default, rename = "yaxisMode")]
    pub yaxis_mode: Option<String>,
}

impl CompiledTin {
    fn resolve(&self, index: &TinIndex) -> Result<ControlPoint, TinError> {
        let bad = || TinError::BadIndex(index.to_string());
        match index {
            TinIndex::Point(i) => self.points.get(*i).copied().ok_or_else(bad),
            TinIndex::Named(name) => {
                if let Ok(i) = name.parse::<usize>() {
                    return self.points.get(i).copied().ok_or_else(bad);
                }
                if name == "c" {
                    return self.centroid_point.ok_or_else(bad);
                }
                let (table, rest) = if let Some(rest) = name.strip_prefix('b') {
                    (&self.vertices_points, rest)
                } else if let Some(rest) = name.strip_prefix('e') {
                    (&self.edge_nodes, rest)
                } else {
                    return Err(bad());
                };
                let i: usize = rest.parse().map_err(|_| bad())?;
                table.get(i).copied().ok_or_else(bad)
            }
        }
    }
}

/// The warp collaborator: maps image coordinates (Y down) to the reference
/// projection and back.
pub trait TinEngine: fmt::Debug {
    fn transform(&self, xy: Vec2, inverse: bool) -> Result<Vec2, TinError>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum YAxisMode {
    Invert,
    Follow,
}

#[derive(Debug, Clone)]
struct Triangle {
    src: [Vec2; 3],
    dst: [Vec2; 3],
    centroid: Vec2,
    area2: f64,
}

impl Triangle {
    fn new(src: [Vec2; 3], dst: [Vec2; 3]) -> Option<Self> {
        let area2 = (src[1] - src[0]).cross(src[2] - src[0]);
        if area2.abs() <= f64::EPSILON || !area2.is_finite() {
            return None;
        }
        let centroid = (src[0] + src[1] + src[2]) / 3.0;
        Some(Self {
            src,
            dst,
            centroid,
            area2,
        })
    }

    fn weights(&self, p: Vec2) -> [f64; 3] {
        let [a, b, c] = self.src;
        let w0 = (b - p).cross(c - p) / self.area2;
        let w1 = (c - p).cross(a - p) / self.area2;
        [w0, w1, 1.0 - w0 - w1]
    }

    fn apply(&self, w: [f64; 3]) -> Vec2 {
        self.dst[0] * w[0] + self.dst[1] * w[1] + self.dst[2] * w[2]
    }
}

fn build_mesh(
    compiled: &CompiledTin,
    indices: &[[TinIndex; 3]],
    backward: bool,
) -> Result<Vec<Triangle>, TinError> {
    let mut out = Vec::with_capacity(indices.len());
    for tri in indices {
        let mut src = [Vec2::ZERO; 3];
        let mut dst = [Vec2::ZERO; 3];
        for (k, idx) in tri.iter().enumerate() {
            let cp = compiled.resolve(idx)?;
            let (s, d) = if backward {
                (cp.bakw, cp.forw)
            } else {
                (cp.forw, cp.bakw)
            };
            src[k] = s.into();
            dst[k] = d.into();
        }
        match Triangle::new(src, dst) {
            Some(t) => out.push(t),
            None => warn!(?tri, backward, "skipping degenerate triangle"),
        }
    }
    if out.is_empty() {
        return Err(TinError::EmptyMesh);
    }
    Ok(out)
}

fn locate(mesh: &[Triangle], p: Vec2) -> Vec2 {
    let mut nearest: Option<(&Triangle, f64)> = None;
    for tri in mesh {
        let w = tri.weights(p);
        if w.iter().all(|v| *v >= -CONTAINS_EPS) {
            return tri.apply(w);
        }
        let d = tri.centroid.distance(p);
        if nearest.is_none_or(|(_, best)| d < best) {
            nearest = Some((tri, d));
        }
    }
    match nearest {
        Some((tri, _)) => tri.apply(tri.weights(p)),
        // Meshes are checked non-empty at construction.
        None => p,
    }
}

/// Piecewise-linear TIN transform in both directions.
#[derive(Debug, Clone)]
pub struct Tin {
    forward: Vec<Triangle>,
    backward: Vec<Triangle>,
    y_axis: YAxisMode,
    backward_allowed: bool,
    wh: Option<[f64; 2]>,
}

impl Tin {
    pub fn from_compiled(compiled: &CompiledTin) -> Result<Self, TinError> {
        let forward_idx = compiled.tins_points.first().ok_or(TinError::EmptyMesh)?;
        let backward_idx = compiled.tins_points.get(1).unwrap_or(forward_idx);

        let forward = build_mesh(compiled, forward_idx, false)?;
        let backward = build_mesh(compiled, backward_idx, true)?;

        let y_axis = match compiled.yaxis_mode.as_deref() {
            Some("follow") => YAxisMode::Follow,
            _ => YAxisMode::Invert,
        };
        let backward_allowed = compiled.strict_status.as_deref() != Some("strict_error");

        debug!(
            forward = forward.len(),
            backward = backward.len(),
            ?y_axis,
            backward_allowed,
            "compiled tin loaded"
        );

        Ok(Self {
            forward,
            backward,
            y_axis,
            backward_allowed,
            wh: compiled.wh,
        })
    }

    /// Image size recorded in the compiled data, if any.
    pub fn wh(&self) -> Option<[f64; 2]> {
        self.wh
    }

    pub fn y_axis(&self) -> YAxisMode {
        self.y_axis
    }
}

impl TinEngine for Tin {
    fn transform(&self, xy: Vec2, inverse: bool) -> Result<Vec2, TinError> {
        let follow = self.y_axis == YAxisMode::Follow;
        if inverse {
            if !self.backward_allowed {
                return Err(TinError::BackwardForbidden);
            }
            let out = locate(&self.backward, xy);
            Ok(if follow { out.flip_y() } else { out })
        } else {
            let input = if follow { xy.flip_y() } else { xy };
            Ok(locate(&self.forward, input))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{CompiledTin, Tin, TinEngine, TinError, YAxisMode};
    use foundation::Vec2;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    /// A 100x100 image mapped by `X = 10x + 1000`, `Y = -10y + 2000`, split
    /// into two triangles through the centroid node.
    pub(crate) fn square_compiled_json() -> &'static str {
        r#"{
            "points": [
                [[0, 0], [1000, 2000], "a"],
                [[100, 0], [2000, 2000]],
                [[100, 100], [2000, 1000]],
                [[0, 100], [1000, 1000]]
            ],
            "centroid_point": [[50, 50], [1500, 1500]],
            "vertices_points": [
                [[-100, -100], [0, 3000]],
                [[200, -100], [3000, 3000]],
                [[200, 200], [3000, 0]],
                [[-100, 200], [0, 0]]
            ],
            "tins_points": [[
                [0, 1, "c"], [1, 2, "c"], [2, 3, "c"], [3, 0, "c"]
            ]],
            "wh": [100, 100],
            "strict_status": "strict",
            "yaxisMode": "invert"
        }"#
    }

    fn square() -> Tin {
        let compiled: CompiledTin = serde_json::from_str(square_compiled_json()).unwrap();
        Tin::from_compiled(&compiled).unwrap()
    }

    #[test]
    fn interpolates_inside_the_mesh() {
        let tin = square();
        let out = tin.transform(Vec2::new(25.0, 40.0), false).unwrap();
        assert_close(out.x, 1250.0, 1e-9);
        assert_close(out.y, 1600.0, 1e-9);
    }

    #[test]
    fn forward_then_inverse_is_identity_inside_hull() {
        let tin = square();
        for p in [Vec2::new(1.0, 1.0), Vec2::new(50.0, 50.0), Vec2::new(99.0, 12.5), Vec2::new(33.3, 77.7)] {
            let merc = tin.transform(p, false).unwrap();
            let back = tin.transform(merc, true).unwrap();
            assert_close(back.x, p.x, 1e-9);
            assert_close(back.y, p.y, 1e-9);
        }
    }

    #[test]
    fn extrapolates_outside_the_mesh() {
        let tin = square();
        let out = tin.transform(Vec2::new(150.0, 50.0), false).unwrap();
        assert_close(out.x, 2500.0, 1e-9);
        assert_close(out.y, 1500.0, 1e-9);
    }

    #[test]
    fn strict_error_forbids_backward() {
        let mut compiled: CompiledTin = serde_json::from_str(square_compiled_json()).unwrap();
        compiled.strict_status = Some("strict_error".into());
        let tin = Tin::from_compiled(&compiled).unwrap();
        assert!(tin.transform(Vec2::new(10.0, 10.0), false).is_ok());
        let err = tin.transform(Vec2::new(1500.0, 1500.0), true).unwrap_err();
        assert!(matches!(err, TinError::BackwardForbidden));
    }

    #[test]
    fn follow_mode_negates_image_y() {
        let mut compiled: CompiledTin = serde_json::from_str(square_compiled_json()).unwrap();
        compiled.yaxis_mode = Some("follow".into());
        let tin = Tin::from_compiled(&compiled).unwrap();
        assert_eq!(tin.y_axis(), YAxisMode::Follow);
        let out = tin.transform(Vec2::new(25.0, -40.0), false).unwrap();
        assert_close(out.x, 1250.0, 1e-9);
        assert_close(out.y, 1600.0, 1e-9);
        let back = tin.transform(out, true).unwrap();
        assert_close(back.y, -40.0, 1e-9);
    }

    #[test]
    fn unknown_named_index_is_rejected() {
        let mut compiled: CompiledTin = serde_json::from_str(square_compiled_json()).unwrap();
        compiled.tins_points = vec![vec![[
            super::TinIndex::Point(0),
            super::TinIndex::Point(1),
            super::TinIndex::Named("e7".into()),
        ]]];
        let err = Tin::from_compiled(&compiled).unwrap_err();
        assert!(matches!(err, TinError::BadIndex(ref s) if s.contains("e7")));
    }

    #[test]
    fn bounding_vertex_indices_resolve() {
        let mut compiled: CompiledTin = serde_json::from_str(square_compiled_json()).unwrap();
        compiled.tins_points = vec![vec![[
            super::TinIndex::Named("b0".into()),
            super::TinIndex::Named("b1".into()),
            super::TinIndex::Named("b2".into()),
        ]]];
        let tin = Tin::from_compiled(&compiled).unwrap();
        let out = tin.transform(Vec2::new(0.0, 0.0), false).unwrap();
        assert_close(out.x, 1000.0, 1e-9);
        assert_close(out.y, 2000.0, 1e-9);
    }
}
