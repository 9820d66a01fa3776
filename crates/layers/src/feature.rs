//! Vector features: geometry plus free-form properties.

use std::collections::BTreeMap;

use foundation::{Extent, Handle, Vec2};
use serde_json::Value;

pub type Properties = BTreeMap<String, Value>;

/// Handle to a feature in a [`FeatureStore`].
///
/// Carries the store generation, so ids survive neither `clear` nor a
/// swap of stores.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(Handle);

impl FeatureId {
    pub fn index(self) -> u32 {
        self.0.index()
    }

    pub fn generation(self) -> u32 {
        self.0.generation()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Vec2),
    LineString(Vec<Vec2>),
    /// Outer ring first, then holes.
    Polygon(Vec<Vec<Vec2>>),
}

fn segment_intersects_extent(a: Vec2, b: Vec2, e: &Extent) -> bool {
    if e.contains(a) || e.contains(b) {
        return true;
    }
    if !Extent::from_points([a, b]).intersects(e) {
        return false;
    }
    let corners = [
        Vec2::new(e.min[0], e.min[1]),
        Vec2::new(e.max[0], e.min[1]),
        Vec2::new(e.max[0], e.max[1]),
        Vec2::new(e.min[0], e.max[1]),
    ];
    // Corners on both sides of the segment's line means it crosses the box.
    let d = b - a;
    let sides: Vec<f64> = corners.iter().map(|c| d.cross(*c - a)).collect();
    let any_pos = sides.iter().any(|s| *s >= 0.0);
    let any_neg = sides.iter().any(|s| *s <= 0.0);
    any_pos && any_neg
}

fn ring_contains(ring: &[Vec2], p: Vec2) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn path_intersects_extent(path: &[Vec2], e: &Extent) -> bool {
    match path {
        [] => false,
        [p] => e.contains(*p),
        _ => path.windows(2).any(|w| segment_intersects_extent(w[0], w[1], e)),
    }
}

impl Geometry {
    pub fn extent(&self) -> Extent {
        match self {
            Geometry::Point(p) => Extent::from_point(*p),
            Geometry::LineString(pts) => Extent::from_points(pts.iter().copied()),
            Geometry::Polygon(rings) => Extent::from_points(rings.iter().flatten().copied()),
        }
    }

    pub fn as_point(&self) -> Option<Vec2> {
        match self {
            Geometry::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// Apply `f` to every vertex.
    pub fn transform<E>(&self, mut f: impl FnMut(Vec2) -> Result<Vec2, E>) -> Result<Geometry, E> {
        Ok(match self {
            Geometry::Point(p) => Geometry::Point(f(*p)?),
            Geometry::LineString(pts) => {
                Geometry::LineString(pts.iter().map(|p| f(*p)).collect::<Result<_, _>>()?)
            }
            Geometry::Polygon(rings) => {
                let mut out = Vec::with_capacity(rings.len());
                for ring in rings {
                    out.push(ring.iter().map(|p| f(*p)).collect::<Result<Vec<_>, _>>()?);
                }
                Geometry::Polygon(out)
            }
        })
    }

    /// Exact intersection test against an extent (edges included).
    pub fn intersects_extent(&self, e: &Extent) -> bool {
        if !self.extent().intersects(e) {
            return false;
        }
        match self {
            Geometry::Point(p) => e.contains(*p),
            Geometry::LineString(pts) => path_intersects_extent(pts, e),
            Geometry::Polygon(rings) => {
                let edges_hit = rings.iter().any(|ring| {
                    let mut closed = ring.clone();
                    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
                        if first != last {
                            closed.push(*first);
                        }
                    }
                    path_intersects_extent(&closed, e)
                });
                if edges_hit {
                    return true;
                }
                // Extent entirely inside the polygon.
                let c = e.center();
                match rings.split_first() {
                    Some((outer, holes)) => {
                        ring_contains(outer, c) && !holes.iter().any(|h| ring_contains(h, c))
                    }
                    None => false,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: Properties,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            properties: Properties::new(),
        }
    }

    pub fn point(p: Vec2) -> Self {
        Self::new(Geometry::Point(p))
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Ordered feature collection.
///
/// Ordering contract: `iter()` yields features in insertion order.
#[derive(Debug, Clone, Default)]
pub struct FeatureStore {
    features: Vec<Feature>,
    generation: u32,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, feature: Feature) -> FeatureId {
        let id = FeatureId(Handle::new(self.features.len() as u32, self.generation));
        self.features.push(feature);
        id
    }

    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        if !id.0.is_current(self.generation) {
            return None;
        }
        self.features.get(id.index() as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, &Feature)> {
        let generation = self.generation;
        self.features
            .iter()
            .enumerate()
            .map(move |(i, f)| (FeatureId(Handle::new(i as u32, generation)), f))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Remove every feature; previously issued ids stop resolving.
    pub fn clear(&mut self) {
        self.features.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn extent(&self) -> Extent {
        let mut e = Extent::empty();
        for f in &self.features {
            e.extend(&f.geometry.extent());
        }
        e
    }
}

impl FromIterator<Feature> for FeatureStore {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        let mut store = FeatureStore::new();
        for f in iter {
            store.add(f);
        }
        store
    }
}
