//! Spiderfy placement: members of an expanded cluster on a circle.

use std::f64::consts::TAU;

use foundation::Vec2;

/// Shortest leg, in pixels, so members clear the cluster badge.
pub const MIN_LEG_PX: f64 = 35.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpiderParams {
    pub distance_multiplier: f64,
    /// Pixels between neighbouring feet along the circle.
    pub foot_separation: f64,
    /// Radians; the first member is placed here.
    pub start_angle: f64,
}

impl Default for SpiderParams {
    fn default() -> Self {
        Self {
            distance_multiplier: 1.0,
            foot_separation: 28.0,
            start_angle: std::f64::consts::FRAC_PI_2,
        }
    }
}

impl SpiderParams {
    /// Leg length in map units for `count` members at `resolution`.
    pub fn leg_length(&self, count: usize, resolution: f64) -> f64 {
        let circumference = self.distance_multiplier * self.foot_separation * (2 + count) as f64;
        (circumference / TAU).max(MIN_LEG_PX) * resolution
    }

    /// `count` positions evenly spaced around `center`, starting at
    /// `start_angle` and advancing counter-clockwise in map coordinates.
    pub fn points_circle(&self, count: usize, center: Vec2, resolution: f64) -> Vec<Vec2> {
        if count == 0 {
            return Vec::new();
        }
        let leg = self.leg_length(count, resolution);
        let step = TAU / count as f64;
        (0..count)
            .map(|i| {
                let angle = self.start_angle + i as f64 * step;
                center + Vec2::new(angle.cos(), angle.sin()) * leg
            })
            .collect()
    }
}
