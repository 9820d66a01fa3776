//! Hover and click bookkeeping for the cluster layer.
//!
//! Hit-testing may finish asynchronously, so each lookup is issued a
//! [`HitTicket`]. Results are applied only if nothing newer has been
//! applied in the meantime and the clusters they refer to still exist.

use foundation::Extent;
use serde::Serialize;

use crate::cluster::ClusterId;
use crate::feature::FeatureId;

/// Screen padding applied when fitting the view to a cluster.
pub const FIT_PADDING_PX: [f64; 4] = [50.0; 4];
pub const FIT_DURATION_MS: u32 = 500;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HitKind {
    PointerMove,
    Click,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HitTicket {
    pub kind: HitKind,
    pub seq: u64,
    /// Cluster generation the lookup was issued against.
    pub generation: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HoverOutcome {
    Stale,
    Unchanged,
    /// The top-most cluster changed; hulls must be restyled.
    Changed(Cursor),
}

/// View change the host should animate to.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FitRequest {
    pub extent: Extent,
    /// Top, right, bottom, left in screen pixels.
    pub padding: [f64; 4],
    pub duration_ms: u32,
}

impl FitRequest {
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            padding: FIT_PADDING_PX,
            duration_ms: FIT_DURATION_MS,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Nothing under the pointer.
    Nothing,
    Stale,
    /// Single-member cluster; the host may show the feature's properties.
    Inspect(FeatureId),
    Expanded(ClusterId),
    Fit(FitRequest),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewInfo {
    pub zoom: f64,
    pub max_zoom: f64,
    pub resolution: f64,
}

impl ViewInfo {
    pub fn at_max_zoom(&self) -> bool {
        self.zoom >= self.max_zoom
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InteractionPhase {
    Idle,
    Hovering(ClusterId),
    Expanded { cluster: ClusterId, resolution: f64 },
}

#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    next_seq: u64,
    applied_hover: u64,
    applied_click: u64,
    hover: Option<ClusterId>,
    expanded: Option<(ClusterId, f64)>,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, kind: HitKind, generation: u32) -> HitTicket {
        self.next_seq += 1;
        HitTicket {
            kind,
            seq: self.next_seq,
            generation,
        }
    }

    /// A pointer result loses to any hover or click applied after it was issued.
    pub fn accept_pointer(&mut self, ticket: HitTicket) -> bool {
        if ticket.kind != HitKind::PointerMove || ticket.seq <= self.applied_hover || ticket.seq <= self.applied_click {
            return false;
        }
        self.applied_hover = ticket.seq;
        true
    }

    pub fn accept_click(&mut self, ticket: HitTicket) -> bool {
        if ticket.kind != HitKind::Click || ticket.seq <= self.applied_click {
            return false;
        }
        self.applied_click = ticket.seq;
        true
    }

    /// Returns true when the hovered cluster changed.
    pub fn set_hover(&mut self, cluster: Option<ClusterId>) -> bool {
        if self.hover == cluster {
            return false;
        }
        self.hover = cluster;
        true
    }

    pub fn hover(&self) -> Option<ClusterId> {
        self.hover
    }

    pub fn expand(&mut self, cluster: ClusterId, resolution: f64) {
        self.expanded = Some((cluster, resolution));
    }

    pub fn collapse(&mut self) {
        self.expanded = None;
    }

    pub fn expanded(&self) -> Option<(ClusterId, f64)> {
        self.expanded
    }

    /// Drop hover and expansion; ticket ordering is kept.
    pub fn reset(&mut self) {
        self.hover = None;
        self.expanded = None;
    }
}
