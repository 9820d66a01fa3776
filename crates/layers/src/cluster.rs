//! Distance-based point clustering.
//!
//! Clusters are rebuilt wholesale for a resolution; a [`ClusterSet`] is
//! never edited in place. Each rebuild gets a new generation, so
//! [`ClusterId`]s from an earlier set stop resolving.

use foundation::{Extent, Handle, Vec2};
use tracing::debug;

use crate::feature::{FeatureId, FeatureStore};
use crate::spatial::Bvh;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(Handle);

impl ClusterId {
    pub fn index(self) -> u32 {
        self.0.index()
    }

    pub fn generation(self) -> u32 {
        self.0.generation()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    /// Source features, in source order.
    pub members: Vec<FeatureId>,
    /// Mean of the member coordinates.
    pub center: Vec2,
    /// Union of member geometry extents.
    pub extent: Extent,
    /// Member coordinates, aligned with `members`.
    pub coordinates: Vec<Vec2>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_aggregate(&self) -> bool {
        self.members.len() > 1
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClusterSet {
    generation: u32,
    resolution: f64,
    clusters: Vec<Cluster>,
}

impl ClusterSet {
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn get(&self, id: ClusterId) -> Option<&Cluster> {
        if !id.0.is_current(self.generation) {
            return None;
        }
        self.clusters.get(id.index() as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    /// Top-most cluster whose center lies within `tolerance` map units of
    /// `coord`. Later clusters draw above earlier ones; among overlapping
    /// hits the nearest wins.
    pub fn hit_test(&self, coord: Vec2, tolerance: f64) -> Option<ClusterId> {
        let mut best: Option<(f64, ClusterId)> = None;
        for c in self.clusters.iter().rev() {
            let d = c.center.distance(coord);
            if d > tolerance {
                continue;
            }
            if best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, c.id));
            }
        }
        best.map(|(_, id)| id)
    }
}

/// Group the point features of `store` whose coordinates fall within
/// `distance_px * resolution` of a seed, box-wise.
///
/// Features are visited in insertion order; each unclaimed feature seeds a
/// cluster and claims every unclaimed point in its box. Non-point
/// geometries are ignored.
pub fn cluster_features(store: &FeatureStore, distance_px: f64, resolution: f64, generation: u32) -> ClusterSet {
    let map_distance = distance_px * resolution;
    let index = Bvh::from_store(store);
    let mut claimed = vec![false; store.len()];
    let mut clusters = Vec::new();

    for (seed, feature) in store.iter() {
        let Some(p) = feature.geometry.as_point() else {
            continue;
        };
        if claimed[seed.index() as usize] {
            continue;
        }

        let query = Extent::from_point(p).buffer(map_distance);
        let mut members = Vec::new();
        let mut coordinates = Vec::new();
        for id in index.query_extent(&query) {
            let slot = id.index() as usize;
            if claimed[slot] {
                continue;
            }
            let Some(q) = store.get(id).and_then(|f| f.geometry.as_point()) else {
                continue;
            };
            claimed[slot] = true;
            members.push(id);
            coordinates.push(q);
        }

        let sum = coordinates.iter().fold(Vec2::ZERO, |acc, q| acc + *q);
        let center = sum / coordinates.len() as f64;
        let id = ClusterId(Handle::new(clusters.len() as u32, generation));
        clusters.push(Cluster {
            id,
            members,
            center,
            extent: Extent::from_points(coordinates.iter().copied()),
            coordinates,
        });
    }

    debug!(
        features = store.len(),
        clusters = clusters.len(),
        resolution,
        generation,
        "clustered features"
    );
    ClusterSet {
        generation,
        resolution,
        clusters,
    }
}

#[cfg(test)]
mod tests {
    use super::cluster_features;
    use crate::feature::{Feature, FeatureStore, Geometry};
    use foundation::Vec2;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn three_points() -> FeatureStore {
        [
            Feature::point(Vec2::new(0.0, 0.0)),
            Feature::point(Vec2::new(30.0, 0.0)),
            Feature::point(Vec2::new(0.0, 30.0)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn close_points_merge_into_one_cluster() {
        let store = three_points();
        // 35 px * 1.0 = 35 map units covers all three.
        let set = cluster_features(&store, 35.0, 1.0, 0);
        assert_eq!(set.len(), 1);
        let c = set.iter().next().unwrap();
        assert_eq!(c.len(), 3);
        assert!(c.is_aggregate());
        assert_close(c.center.x, 10.0, 1e-12);
        assert_close(c.center.y, 10.0, 1e-12);
        assert_eq!(c.extent.to_array(), [0.0, 0.0, 30.0, 30.0]);
    }

    #[test]
    fn zoomed_in_points_stay_apart() {
        let store = three_points();
        let set = cluster_features(&store, 35.0, 0.1, 1);
        assert_eq!(set.len(), 3);
        assert!(set.iter().all(|c| c.len() == 1));
        let centers: Vec<Vec2> = set.iter().map(|c| c.center).collect();
        assert_eq!(centers[1], Vec2::new(30.0, 0.0));
    }

    #[test]
    fn seed_order_decides_membership() {
        // Chain a-b-c with 30 unit gaps: a claims b, c seeds its own.
        let store: FeatureStore = [
            Feature::point(Vec2::new(0.0, 0.0)),
            Feature::point(Vec2::new(30.0, 0.0)),
            Feature::point(Vec2::new(60.0, 0.0)),
        ]
        .into_iter()
        .collect();
        let set = cluster_features(&store, 35.0, 1.0, 0);
        let sizes: Vec<usize> = set.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[test]
    fn non_points_are_skipped() {
        let store: FeatureStore = [
            Feature::new(Geometry::LineString(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)])),
            Feature::point(Vec2::new(0.5, 0.5)),
        ]
        .into_iter()
        .collect();
        let set = cluster_features(&store, 35.0, 1.0, 0);
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().len(), 1);
    }

    #[test]
    fn ids_from_old_generation_do_not_resolve() {
        let store = three_points();
        let old = cluster_features(&store, 35.0, 1.0, 3);
        let id = old.iter().next().unwrap().id;
        let new = cluster_features(&store, 35.0, 1.0, 4);
        assert!(old.get(id).is_some());
        assert!(new.get(id).is_none());
    }

    #[test]
    fn hit_test_prefers_nearest_center() {
        let store = three_points();
        let set = cluster_features(&store, 35.0, 0.1, 0);
        let hit = set.hit_test(Vec2::new(28.0, 1.0), 5.0).unwrap();
        assert_eq!(set.get(hit).unwrap().center, Vec2::new(30.0, 0.0));
        assert!(set.hit_test(Vec2::new(15.0, 15.0), 5.0).is_none());
    }
}
