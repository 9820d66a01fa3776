//! Point cluster layer with hover hulls and click-to-spiderfy.

use foundation::{Extent, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cluster::{ClusterId, ClusterSet, cluster_features};
use crate::feature::{Feature, FeatureId, FeatureStore};
use crate::hull::convex_hull;
use crate::interaction::{
    ClickOutcome, Cursor, FitRequest, HitKind, HitTicket, HoverOutcome, InteractionPhase, InteractionState, ViewInfo,
};
use crate::layer::{Layer, LayerId};
use crate::spider::SpiderParams;
use crate::symbology::{CircleStyle, ClusterStyles, Fill, Icon, Stroke, TextStyle};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterOptions {
    /// Screen pixels.
    pub cluster_distance: f64,
    pub circle_distance_multiplier: f64,
    /// Screen pixels.
    pub circle_foot_separation: f64,
    /// Radians.
    pub circle_start_angle: f64,
    #[serde(flatten)]
    pub styles: ClusterStyles,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        let spider = SpiderParams::default();
        Self {
            cluster_distance: 35.0,
            circle_distance_multiplier: spider.distance_multiplier,
            circle_foot_separation: spider.foot_separation,
            circle_start_angle: spider.start_angle,
            styles: ClusterStyles::default(),
        }
    }
}

impl ClusterOptions {
    /// Replace unusable numeric settings with their defaults.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();
        let fix = |name: &str, v: &mut f64, fallback: f64| {
            if !(v.is_finite() && *v > 0.0) {
                warn!(option = name, value = *v, fallback, "ignoring cluster option");
                *v = fallback;
            }
        };
        fix("clusterDistance", &mut self.cluster_distance, d.cluster_distance);
        fix(
            "circleDistanceMultiplier",
            &mut self.circle_distance_multiplier,
            d.circle_distance_multiplier,
        );
        fix(
            "circleFootSeparation",
            &mut self.circle_foot_separation,
            d.circle_foot_separation,
        );
        if !self.circle_start_angle.is_finite() {
            warn!(value = self.circle_start_angle, "ignoring circleStartAngle");
            self.circle_start_angle = d.circle_start_angle;
        }
        self
    }

    pub fn spider(&self) -> SpiderParams {
        SpiderParams {
            distance_multiplier: self.circle_distance_multiplier,
            foot_separation: self.circle_foot_separation,
            start_angle: self.circle_start_angle,
        }
    }
}

/// Produces the marker for a single source feature.
pub trait IconGenerator {
    fn icon(&self, member: &Feature) -> Icon;
}

impl<F> IconGenerator for F
where
    F: Fn(&Feature) -> Icon,
{
    fn icon(&self, member: &Feature) -> Icon {
        self(member)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    /// Aggregate marker with the member count.
    Badge {
        cluster: ClusterId,
        at: Vec2,
        outer: CircleStyle,
        inner: CircleStyle,
        text: TextStyle,
    },
    Icon {
        feature: FeatureId,
        at: Vec2,
        icon: Icon,
    },
    Hull {
        cluster: ClusterId,
        ring: Vec<Vec2>,
        fill: Fill,
        stroke: Stroke,
    },
    Leg {
        from: Vec2,
        to: Vec2,
        stroke: Stroke,
    },
}

/// Draw list for one frame, bottom sub-layer first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterRender {
    pub hulls: Vec<Symbol>,
    pub clusters: Vec<Symbol>,
    pub circles: Vec<Symbol>,
}

pub struct ClusterLayer {
    id: LayerId,
    options: ClusterOptions,
    icons: Box<dyn IconGenerator>,
    source: FeatureStore,
    clusters: ClusterSet,
    resolution: Option<f64>,
    generation: u32,
    interaction: InteractionState,
}

impl std::fmt::Debug for ClusterLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterLayer")
            .field("id", &self.id)
            .field("features", &self.source.len())
            .field("clusters", &self.clusters.len())
            .field("resolution", &self.resolution)
            .field("generation", &self.generation)
            .finish()
    }
}

impl ClusterLayer {
    pub fn new(id: LayerId, source: FeatureStore, options: ClusterOptions, icons: impl IconGenerator + 'static) -> Self {
        Self {
            id,
            options: options.sanitized(),
            icons: Box::new(icons),
            source,
            clusters: ClusterSet::default(),
            resolution: None,
            generation: 0,
            interaction: InteractionState::new(),
        }
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    pub fn source(&self) -> &FeatureStore {
        &self.source
    }

    pub fn clusters(&self) -> &ClusterSet {
        &self.clusters
    }

    pub fn resolution(&self) -> Option<f64> {
        self.resolution
    }

    /// Re-cluster for a new view resolution. A no-op if unchanged.
    pub fn set_resolution(&mut self, resolution: f64) {
        if self.resolution == Some(resolution) {
            return;
        }
        self.resolution = Some(resolution);
        self.regenerate();
    }

    pub fn set_source(&mut self, source: FeatureStore) {
        self.source = source;
        self.regenerate();
    }

    fn regenerate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.interaction.reset();
        self.clusters = match self.resolution {
            Some(res) => cluster_features(&self.source, self.options.cluster_distance, res, self.generation),
            None => ClusterSet::default(),
        };
    }

    /// Start a hit lookup; pass the ticket back with its result.
    pub fn begin_hit(&mut self, kind: HitKind) -> HitTicket {
        self.interaction.issue(kind, self.generation)
    }

    /// Apply the top-most cluster found under the pointer.
    pub fn pointer_move(&mut self, ticket: HitTicket, hit: Option<ClusterId>) -> HoverOutcome {
        if ticket.generation != self.generation || !self.interaction.accept_pointer(ticket) {
            debug!(seq = ticket.seq, "discarding stale pointer hit");
            return HoverOutcome::Stale;
        }
        let hit = hit.filter(|id| self.clusters.get(*id).is_some());
        if !self.interaction.set_hover(hit) {
            return HoverOutcome::Unchanged;
        }
        HoverOutcome::Changed(if hit.is_some() { Cursor::Pointer } else { Cursor::Default })
    }

    /// Apply the top-most cluster found under a click.
    pub fn click(&mut self, ticket: HitTicket, hit: Option<ClusterId>, view: &ViewInfo) -> ClickOutcome {
        if ticket.generation != self.generation || !self.interaction.accept_click(ticket) {
            debug!(seq = ticket.seq, "discarding stale click hit");
            return ClickOutcome::Stale;
        }
        let Some(id) = hit else {
            self.interaction.collapse();
            return ClickOutcome::Nothing;
        };
        let Some(cluster) = self.clusters.get(id) else {
            return ClickOutcome::Stale;
        };

        if let [only] = cluster.members.as_slice() {
            if let Some(feature) = self.source.get(*only) {
                debug!(properties = ?feature.properties, "inspect feature");
            }
            return ClickOutcome::Inspect(*only);
        }

        let extent = cluster.extent;
        let collapsed = extent.width() < view.resolution && extent.height() < view.resolution;
        if view.at_max_zoom() || collapsed {
            debug!(cluster = id.index(), members = cluster.len(), "expanding cluster");
            self.interaction.expand(id, view.resolution);
            ClickOutcome::Expanded(id)
        } else {
            debug!(cluster = id.index(), extent = ?extent.to_array(), "fitting view to cluster");
            ClickOutcome::Fit(FitRequest::new(extent))
        }
    }

    /// Hit tolerance in map units: the badge's outer radius.
    fn tolerance(&self) -> f64 {
        f64::from(self.options.styles.outer_circle.radius) * self.clusters.resolution()
    }

    /// Synchronous pointer move at a map coordinate.
    pub fn hover_at(&mut self, coord: Vec2) -> HoverOutcome {
        let ticket = self.begin_hit(HitKind::PointerMove);
        let hit = self.clusters.hit_test(coord, self.tolerance());
        self.pointer_move(ticket, hit)
    }

    /// Synchronous click at a map coordinate.
    pub fn click_at(&mut self, coord: Vec2, view: &ViewInfo) -> ClickOutcome {
        let ticket = self.begin_hit(HitKind::Click);
        let hit = self.clusters.hit_test(coord, self.tolerance());
        self.click(ticket, hit, view)
    }

    pub fn phase(&self) -> InteractionPhase {
        if let Some((cluster, resolution)) = self.interaction.expanded() {
            return InteractionPhase::Expanded { cluster, resolution };
        }
        match self.interaction.hover() {
            Some(id) if self.clusters.get(id).is_some_and(|c| c.is_aggregate()) => InteractionPhase::Hovering(id),
            _ => InteractionPhase::Idle,
        }
    }

    pub fn cursor(&self) -> Cursor {
        if self.interaction.hover().is_some() {
            Cursor::Pointer
        } else {
            Cursor::Default
        }
    }

    fn member_icon(&self, feature: FeatureId, at: Vec2) -> Option<Symbol> {
        let member = self.source.get(feature)?;
        Some(Symbol::Icon {
            feature,
            at,
            icon: self.icons.icon(member),
        })
    }

    pub fn render(&self, resolution: f64) -> ClusterRender {
        let styles = &self.options.styles;
        let mut out = ClusterRender::default();

        for cluster in self.clusters.iter() {
            if cluster.is_aggregate() {
                out.clusters.push(Symbol::Badge {
                    cluster: cluster.id,
                    at: cluster.center,
                    outer: styles.outer_circle,
                    inner: styles.inner_circle,
                    text: styles.count_text(cluster.len()),
                });
            } else if let Some(symbol) = cluster
                .members
                .first()
                .and_then(|m| self.member_icon(*m, cluster.center))
            {
                out.clusters.push(symbol);
            }
        }

        if let Some(cluster) = self.interaction.hover().and_then(|id| self.clusters.get(id)) {
            if cluster.is_aggregate() {
                out.hulls.push(Symbol::Hull {
                    cluster: cluster.id,
                    ring: convex_hull(&cluster.coordinates),
                    fill: styles.convex_hull_fill,
                    stroke: styles.convex_hull_stroke,
                });
            }
        }

        if let Some((id, expanded_at)) = self.interaction.expanded() {
            if expanded_at == resolution {
                if let Some(cluster) = self.clusters.get(id) {
                    let feet = self.options.spider().points_circle(cluster.len(), cluster.center, resolution);
                    let mut icons = Vec::with_capacity(feet.len());
                    for (member, foot) in cluster.members.iter().zip(feet) {
                        out.circles.push(Symbol::Leg {
                            from: cluster.center,
                            to: foot,
                            stroke: styles.convex_hull_stroke,
                        });
                        icons.extend(self.member_icon(*member, foot));
                    }
                    out.circles.extend(icons);
                }
            }
        }
        out
    }
}

impl Layer for ClusterLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn data_extent(&self) -> Option<Extent> {
        let e = self.source.extent();
        (!e.is_empty()).then_some(e)
    }
}

#[cfg(test)]
mod tests {
    use super::{ClusterLayer, ClusterOptions, Symbol};
    use crate::feature::{Feature, FeatureStore};
    use crate::interaction::{ClickOutcome, Cursor, HitKind, HoverOutcome, InteractionPhase, ViewInfo};
    use crate::layer::{Layer, LayerId};
    use crate::symbology::Icon;
    use foundation::Vec2;
    use pretty_assertions::assert_eq;

    fn pin(member: &Feature) -> Icon {
        let name = member.property("name").and_then(|v| v.as_str()).unwrap_or("pin");
        Icon::new(format!("{name}.png"))
    }

    fn layer(points: &[(f64, f64)]) -> ClusterLayer {
        let store: FeatureStore = points
            .iter()
            .enumerate()
            .map(|(i, (x, y))| Feature::point(Vec2::new(*x, *y)).with_property("name", format!("p{i}")))
            .collect();
        ClusterLayer::new(LayerId(7), store, ClusterOptions::default(), pin)
    }

    fn view(zoom: f64, resolution: f64) -> ViewInfo {
        ViewInfo {
            zoom,
            max_zoom: 18.0,
            resolution,
        }
    }

    #[test]
    fn resolution_decides_grouping() {
        let mut l = layer(&[(0.0, 0.0), (30.0, 0.0), (0.0, 30.0)]);
        l.set_resolution(1.0);
        assert_eq!(l.clusters().len(), 1);
        l.set_resolution(0.1);
        assert_eq!(l.clusters().len(), 3);
        let render = l.render(0.1);
        assert_eq!(render.clusters.len(), 3);
        assert!(render.clusters.iter().all(|s| matches!(s, Symbol::Icon { .. })));
    }

    #[test]
    fn aggregate_renders_badge_with_count() {
        let mut l = layer(&[(0.0, 0.0), (1.0, 0.0)]);
        l.set_resolution(1.0);
        let render = l.render(1.0);
        match &render.clusters[..] {
            [Symbol::Badge { text, outer, inner, .. }] => {
                assert_eq!(text.text, "2");
                assert_eq!(outer.radius, 20.0);
                assert_eq!(inner.radius, 14.0);
            }
            other => panic!("unexpected symbols {other:?}"),
        }
        assert!(render.hulls.is_empty());
        assert!(render.circles.is_empty());
    }

    #[test]
    fn hover_draws_hull_until_pointer_leaves() {
        let mut l = layer(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)]);
        l.set_resolution(1.0);
        let center = l.clusters().iter().next().unwrap().center;

        assert_eq!(l.hover_at(center), HoverOutcome::Changed(Cursor::Pointer));
        assert!(matches!(l.phase(), InteractionPhase::Hovering(_)));
        assert_eq!(l.hover_at(center), HoverOutcome::Unchanged);
        let render = l.render(1.0);
        match &render.hulls[..] {
            [Symbol::Hull { ring, .. }] => assert_eq!(ring.len(), 3),
            other => panic!("unexpected hulls {other:?}"),
        }

        assert_eq!(l.hover_at(Vec2::new(500.0, 500.0)), HoverOutcome::Changed(Cursor::Default));
        assert_eq!(l.phase(), InteractionPhase::Idle);
        assert!(l.render(1.0).hulls.is_empty());
    }

    #[test]
    fn two_member_hull_is_degenerate_but_drawn() {
        let mut l = layer(&[(0.0, 0.0), (10.0, 0.0)]);
        l.set_resolution(1.0);
        l.hover_at(Vec2::new(5.0, 0.0));
        match &l.render(1.0).hulls[..] {
            [Symbol::Hull { ring, .. }] => assert_eq!(ring.len(), 2),
            other => panic!("unexpected hulls {other:?}"),
        }
    }

    #[test]
    fn single_member_click_inspects_without_state_change() {
        let mut l = layer(&[(0.0, 0.0)]);
        l.set_resolution(1.0);
        assert_eq!(l.cursor(), Cursor::Default);
        assert_eq!(l.hover_at(Vec2::new(0.0, 0.0)), HoverOutcome::Changed(Cursor::Pointer));
        assert_eq!(l.phase(), InteractionPhase::Idle);
        assert!(l.render(1.0).hulls.is_empty());

        let id = l.source().iter().next().unwrap().0;
        assert_eq!(l.click_at(Vec2::new(0.0, 0.0), &view(10.0, 1.0)), ClickOutcome::Inspect(id));
        assert_eq!(l.phase(), InteractionPhase::Idle);
        assert!(l.render(1.0).circles.is_empty());
    }

    #[test]
    fn click_fits_when_zoom_can_help() {
        let mut l = layer(&[(0.0, 0.0), (20.0, 0.0), (0.0, 20.0)]);
        l.set_resolution(1.0);
        let center = l.clusters().iter().next().unwrap().center;
        match l.click_at(center, &view(10.0, 1.0)) {
            ClickOutcome::Fit(req) => {
                assert_eq!(req.extent.to_array(), [0.0, 0.0, 20.0, 20.0]);
                assert_eq!(req.padding, [50.0; 4]);
                assert_eq!(req.duration_ms, 500);
            }
            other => panic!("expected fit, got {other:?}"),
        }
        assert_eq!(l.phase(), InteractionPhase::Idle);
    }

    #[test]
    fn click_expands_at_max_zoom() {
        let mut l = layer(&[(0.0, 0.0), (20.0, 0.0), (0.0, 20.0), (20.0, 20.0)]);
        l.set_resolution(1.0);
        let cluster = l.clusters().iter().next().unwrap().clone();
        assert_eq!(l.click_at(cluster.center, &view(18.0, 1.0)), ClickOutcome::Expanded(cluster.id));
        assert_eq!(
            l.phase(),
            InteractionPhase::Expanded {
                cluster: cluster.id,
                resolution: 1.0
            }
        );

        let render = l.render(1.0);
        assert_eq!(render.circles.len(), 8);
        assert!(render.circles[..4].iter().all(|s| matches!(s, Symbol::Leg { .. })));
        for s in &render.circles[4..] {
            let Symbol::Icon { at, .. } = s else {
                panic!("expected member icon, got {s:?}");
            };
            assert!((at.distance(cluster.center) - 35.0).abs() < 1e-9);
        }
        // Only drawn at the resolution it was expanded at.
        assert!(l.render(2.0).circles.is_empty());
    }

    #[test]
    fn click_expands_sub_pixel_cluster() {
        let mut l = layer(&[(5.0, 5.0), (5.0, 5.0), (5.2, 5.1)]);
        l.set_resolution(1.0);
        let id = l.clusters().iter().next().unwrap().id;
        assert_eq!(l.click_at(Vec2::new(5.0, 5.0), &view(3.0, 1.0)), ClickOutcome::Expanded(id));
    }

    #[test]
    fn click_elsewhere_collapses() {
        let mut l = layer(&[(0.0, 0.0), (0.1, 0.0)]);
        l.set_resolution(1.0);
        l.click_at(Vec2::new(0.0, 0.0), &view(18.0, 1.0));
        assert!(matches!(l.phase(), InteractionPhase::Expanded { .. }));
        assert_eq!(l.click_at(Vec2::new(900.0, 900.0), &view(18.0, 1.0)), ClickOutcome::Nothing);
        assert_eq!(l.phase(), InteractionPhase::Idle);
    }

    #[test]
    fn resolution_change_drops_expansion_and_hover() {
        let mut l = layer(&[(0.0, 0.0), (0.1, 0.0)]);
        l.set_resolution(1.0);
        l.hover_at(Vec2::new(0.0, 0.0));
        l.click_at(Vec2::new(0.0, 0.0), &view(18.0, 1.0));
        l.set_resolution(0.5);
        assert_eq!(l.phase(), InteractionPhase::Idle);
        assert_eq!(l.cursor(), Cursor::Default);
        let render = l.render(0.5);
        assert!(render.hulls.is_empty());
        assert!(render.circles.is_empty());
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut l = layer(&[(0.0, 0.0), (0.1, 0.0)]);
        l.set_resolution(1.0);
        let id = l.clusters().iter().next().unwrap().id;

        // Issued before a re-cluster: the cluster it names is gone.
        let old = l.begin_hit(HitKind::Click);
        l.set_resolution(2.0);
        assert_eq!(l.click(old, Some(id), &view(18.0, 2.0)), ClickOutcome::Stale);

        // A pointer result issued before a click must not apply after it.
        let id = l.clusters().iter().next().unwrap().id;
        let hover = l.begin_hit(HitKind::PointerMove);
        let click = l.begin_hit(HitKind::Click);
        assert_eq!(l.click(click, None, &view(18.0, 2.0)), ClickOutcome::Nothing);
        assert_eq!(l.pointer_move(hover, Some(id)), HoverOutcome::Stale);
        assert_eq!(l.cursor(), Cursor::Default);
    }

    #[test]
    fn options_from_json_with_fallbacks() {
        let options: ClusterOptions = serde_json::from_str(
            r#"{ "clusterDistance": -4, "circleFootSeparation": 40, "outerCircle": { "radius": 24, "fill": { "color": [1, 0, 0, 1] } } }"#,
        )
        .unwrap();
        let options = options.sanitized();
        assert_eq!(options.cluster_distance, 35.0);
        assert_eq!(options.circle_foot_separation, 40.0);
        assert_eq!(options.styles.outer_circle.radius, 24.0);
        assert_eq!(options.styles.inner_circle.radius, 14.0);
    }

    #[test]
    fn data_extent_covers_source() {
        let l = layer(&[(1.0, 2.0), (3.0, -4.0)]);
        assert_eq!(l.id(), LayerId(7));
        assert_eq!(l.data_extent().unwrap().to_array(), [1.0, -4.0, 3.0, 2.0]);
        assert!(layer(&[]).data_extent().is_none());
    }
}
