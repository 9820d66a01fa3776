//! Deterministic bounding volume hierarchy over feature extents.

use foundation::Extent;
use foundation::math::stable_total_cmp_f64;

use crate::feature::{FeatureId, FeatureStore};

/// A deterministic BVH over 2D `Extent` items.
///
/// Ordering contract:
/// - `query_extent` returns features in ascending `FeatureId::index()` order.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        bounds: Extent,
        items: Vec<Item>,
    },
    Internal {
        bounds: Extent,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Item {
    pub feature: FeatureId,
    pub bounds: Extent,
}

impl Bvh {
    pub fn build(items: Vec<Item>) -> Self {
        let mut nodes = Vec::new();
        let mut items = items;
        if !items.is_empty() {
            build_node(&mut nodes, &mut items);
        }
        Self { nodes }
    }

    /// Index every feature of `store` by its geometry extent.
    pub fn from_store(store: &FeatureStore) -> Self {
        let items = store
            .iter()
            .map(|(feature, f)| Item {
                feature,
                bounds: f.geometry.extent(),
            })
            .filter(|item| !item.bounds.is_empty())
            .collect();
        Self::build(items)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Features whose extent intersects `query`.
    pub fn query_extent(&self, query: &Extent) -> Vec<FeatureId> {
        if self.nodes.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<FeatureId> = Vec::new();
        let mut stack: Vec<usize> = vec![0];

        while let Some(idx) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { bounds, items } => {
                    if !bounds.intersects(query) {
                        continue;
                    }
                    hits.extend(
                        items
                            .iter()
                            .filter(|item| item.bounds.intersects(query))
                            .map(|item| item.feature),
                    );
                }
                Node::Internal {
                    bounds,
                    left,
                    right,
                } => {
                    if bounds.intersects(query) {
                        stack.push(*right);
                        stack.push(*left);
                    }
                }
            }
        }

        hits.sort_by_key(|f| f.index());
        hits.dedup();
        hits
    }
}

const LEAF_MAX: usize = 8;

fn build_node(nodes: &mut Vec<Node>, items: &mut [Item]) -> usize {
    let bounds = bounds_for_items(items);
    if items.len() <= LEAF_MAX {
        let idx = nodes.len();
        nodes.push(Node::Leaf {
            bounds,
            items: items.to_vec(),
        });
        return idx;
    }

    // Deterministic tie-break: prefer X.
    let axis = usize::from(bounds.height() > bounds.width());
    items.sort_by(|a, b| {
        let ca = (a.bounds.min[axis] + a.bounds.max[axis]) * 0.5;
        let cb = (b.bounds.min[axis] + b.bounds.max[axis]) * 0.5;
        stable_total_cmp_f64(ca, cb).then_with(|| a.feature.index().cmp(&b.feature.index()))
    });

    let mid = items.len() / 2;
    let (left_items, right_items) = items.split_at_mut(mid);

    let idx = nodes.len();
    // Placeholder; patched once children exist.
    nodes.push(Node::Leaf {
        bounds,
        items: Vec::new(),
    });

    let left = build_node(nodes, left_items);
    let right = build_node(nodes, right_items);
    nodes[idx] = Node::Internal {
        bounds,
        left,
        right,
    };
    idx
}

fn bounds_for_items(items: &[Item]) -> Extent {
    let mut b = Extent::empty();
    for item in items {
        b.extend(&item.bounds);
    }
    b
}
