//! Tile addressing: Zoomify-style pyramids for pixel images and the global
//! XYZ grid for reference-projection tiles.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Tile coordinate in ZXY scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Row counted from the bottom of a `2^z` grid.
    pub fn flipped_y(&self) -> u32 {
        let n = 1u64.checked_shl(u32::from(self.z)).unwrap_or(u64::MAX);
        (n - 1).saturating_sub(u64::from(self.y)) as u32
    }
}

/// Image pyramid laid out in the fourth quadrant: extent `[0, -h, w, 0]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileGrid {
    pub tile_size: u32,
    pub tile_pixel_ratio: u32,
    pub extent: [f64; 4],
    /// Coarsest first.
    pub resolutions: Vec<f64>,
    /// Tiles per tier `[columns, rows]`, coarsest first.
    pub tier_sizes: Vec<[u64; 2]>,
}

impl TileGrid {
    pub fn zoomify(size: [f64; 2], tile_size: u32, tile_pixel_ratio: u32) -> Self {
        let tile_pixel_ratio = tile_pixel_ratio.max(1);
        let step = u64::from(tile_size.max(1)) * u64::from(tile_pixel_ratio);

        let mut width = size[0].max(0.0) as u64;
        let mut height = size[1].max(0.0) as u64;
        let mut tier_sizes = Vec::new();
        while width > step || height > step {
            tier_sizes.push([width.div_ceil(step), height.div_ceil(step)]);
            width >>= 1;
            height >>= 1;
        }
        tier_sizes.push([1, 1]);
        tier_sizes.reverse();

        let mut resolutions: Vec<f64> = (0..tier_sizes.len())
            .map(|i| f64::from(tile_pixel_ratio) * (1u64 << i) as f64)
            .collect();
        resolutions.reverse();

        Self {
            tile_size,
            tile_pixel_ratio,
            extent: [0.0, -size[1], size[0], 0.0],
            resolutions,
            tier_sizes,
        }
    }

    pub fn max_zoom(&self) -> u8 {
        self.resolutions.len().saturating_sub(1) as u8
    }
}

/// Zoom levels needed to show a `size` image at native resolution in
/// 256-pixel tiles. Negative for images smaller than one tile.
pub fn max_zoom_for_size(size: [f64; 2]) -> i32 {
    let levels = (size[0] / 256.0).log2().max((size[1] / 256.0).log2()).ceil();
    if levels.is_finite() { levels as i32 } else { 0 }
}

/// Side of the square world extent holding a `size` image.
pub fn world_extent_size(size: [f64; 2]) -> f64 {
    256.0 * 2f64.powi(max_zoom_for_size(size))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum TileScheme {
    /// Pixel image pyramid.
    Zoomify(TileGrid),
    /// Global reference grid, row 0 at the top.
    Xyz,
    /// Global reference grid, row 0 at the bottom.
    Tms,
}

impl TileScheme {
    /// Expand `{z}`, `{x}`, `{y}` and `{-y}` in `template`.
    ///
    /// Each placeholder is substituted once, matching how tile URL templates
    /// are written in descriptors.
    pub fn tile_url(&self, template: &str, coord: TileCoord) -> String {
        let y = match self {
            TileScheme::Tms => coord.flipped_y(),
            _ => coord.y,
        };
        template
            .replacen("{z}", &coord.z.to_string(), 1)
            .replacen("{x}", &coord.x.to_string(), 1)
            .replacen("{-y}", &coord.flipped_y().to_string(), 1)
            .replacen("{y}", &y.to_string(), 1)
    }
}
