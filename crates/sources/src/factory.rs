//! Source factory: descriptor in, tile source with a registered projection
//! out.

use std::rc::Rc;

use foundation::Extent;
use foundation::math::lonlat_to_mercator;
use projection::{
    DatumProvider, OperationStage, ProjectionEntry, ProjectionError, ProjectionRegistry,
    Proj4Datums, REFERENCE_CODE, SystemStage, Tin, TransformChain, TransformPair, Units, WarpStage,
    WorldFile,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::descriptor::{LocaleText, MapDescriptor, TileSourceType, map_id_from_url};
use crate::error::SourceError;
use crate::strategy::{PixelWarp, ProjectionStrategy, StrategyKind, sub_map_specs};
use crate::tile_grid::{DEFAULT_TILE_SIZE, TileCoord, TileGrid, TileScheme, world_extent_size};

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

fn default_tile_pixel_ratio() -> u32 {
    1
}

/// Caller overrides applied on top of the descriptor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceOptions {
    #[serde(default, rename = "mapID")]
    pub map_id: Option<String>,
    #[serde(default)]
    pub size: Option<[f64; 2]>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_tile_size", rename = "tileSize")]
    pub tile_size: u32,
    #[serde(default = "default_tile_pixel_ratio", rename = "tilePixelRatio")]
    pub tile_pixel_ratio: u32,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            map_id: None,
            size: None,
            url: None,
            tile_size: default_tile_size(),
            tile_pixel_ratio: default_tile_pixel_ratio(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubSource {
    pub projection: String,
    pub priority: Option<i64>,
    pub importance: Option<i64>,
}

/// A tile source ready to hand to a renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaplatSource {
    pub map_id: String,
    pub kind: StrategyKind,
    /// Projection the tiles are addressed in.
    pub projection: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<[f64; 2]>,
    pub tiles: TileScheme,
    /// Coverage in the reference projection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envelope: Option<[f64; 4]>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_maps: Vec<SubSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<LocaleText>,
}

impl MaplatSource {
    pub fn tile_url(&self, coord: TileCoord) -> String {
        self.tiles.tile_url(&self.url, coord)
    }

    pub fn envelope_extent(&self) -> Option<Extent> {
        self.envelope.map(Extent::from_array)
    }
}

/// Projection code for a map id, with an optional sub map index (from 1).
pub fn maplat_code(map_id: &str, sub: Option<usize>) -> String {
    match sub {
        Some(n) => format!("Maplat:{map_id}#{n}"),
        None => format!("Maplat:{map_id}"),
    }
}

/// Builds sources and registers their projections in a shared registry.
pub struct SourceFactory {
    datums: Rc<dyn DatumProvider>,
}

impl Default for SourceFactory {
    fn default() -> Self {
        Self::new(Rc::new(Proj4Datums::new()))
    }
}

impl SourceFactory {
    pub fn new(datums: Rc<dyn DatumProvider>) -> Self {
        Self { datums }
    }

    fn chain_for(&self, warp: &PixelWarp) -> Result<TransformChain, ProjectionError> {
        match warp {
            PixelWarp::Tin(compiled) => Ok(TransformChain::tin(Rc::new(Tin::from_compiled(compiled)?))),
            PixelWarp::WorldFile {
                params,
                map_coord,
                via,
                shift,
            } => {
                let system = SystemStage::WorldFile(WorldFile::new(*params)?);
                let warp = shift.map_or(WarpStage::Identity, WarpStage::Shift);
                let route = self.datums.route(map_coord, via.as_deref())?;
                let operation = if route.hops().is_empty() {
                    OperationStage::Identity
                } else {
                    OperationStage::Datum(route)
                };
                Ok(TransformChain::new(system, warp, operation))
            }
        }
    }

    /// Entry and transforms for a pixel projection, or `None` if `code` is
    /// already registered. Nothing is registered here.
    fn prepare_pixel(
        &self,
        registry: &ProjectionRegistry,
        code: &str,
        size: [f64; 2],
        warp: &PixelWarp,
    ) -> Result<Option<(ProjectionEntry, TransformPair)>, SourceError> {
        if registry.contains(code) {
            return Ok(None);
        }
        let extent = Extent::from_array([0.0, -size[1], size[0], 0.0]);
        let w = world_extent_size(size);
        let world = Extent::from_array([0.0, -w, w, 0.0]);
        let entry = ProjectionEntry::new(code, Units::Pixels, extent, world);
        let pair = self.chain_for(warp)?.into_pair();
        Ok(Some((entry, pair)))
    }

    /// Build a source, registering its projection(s) on first use.
    pub fn build(
        &self,
        registry: &mut ProjectionRegistry,
        descriptor: &MapDescriptor,
        options: &SourceOptions,
    ) -> Result<MaplatSource, SourceError> {
        let map_id = options
            .map_id
            .clone()
            .or_else(|| descriptor.map_id().map(str::to_string))
            .ok_or(SourceError::MissingField("mapID"))?;
        let url = options
            .url
            .clone()
            .or_else(|| descriptor.url().map(str::to_string))
            .ok_or(SourceError::MissingField("url"))?;
        let strategy = ProjectionStrategy::decide(descriptor)?;

        let envelope = descriptor.envelope_lnglats().map(|pts| {
            Extent::from_points(pts.iter().map(|p| lonlat_to_mercator((*p).into()))).to_array()
        });

        let (projection, size, tiles, sub_maps) = match &strategy {
            ProjectionStrategy::PassThrough => {
                (REFERENCE_CODE.to_string(), None, reference_scheme(descriptor), Vec::new())
            }
            ProjectionStrategy::ShiftedReference { shift } => {
                let code = maplat_code(&map_id, None);
                let reference = ProjectionEntry::reference();
                let entry = ProjectionEntry::new(&code, Units::Meters, reference.extent, reference.world_extent);
                registry.register(entry, TransformChain::shift(*shift).into_pair());
                (code, None, reference_scheme(descriptor), Vec::new())
            }
            ProjectionStrategy::CustomPixel(warp) => {
                let size = options
                    .size
                    .or_else(|| descriptor.size())
                    .ok_or(SourceError::MissingField("size"))?;
                if !(size[0] > 0.0 && size[1] > 0.0) {
                    return Err(SourceError::InvalidField {
                        field: "size",
                        message: format!("{size:?} is not a positive image size"),
                    });
                }
                let code = maplat_code(&map_id, None);
                // Every chain is built before anything is registered, so a
                // failing sub map leaves the registry untouched.
                let mut pending = vec![self.prepare_pixel(registry, &code, size, warp)?];
                let mut subs = Vec::new();
                for (i, sub) in sub_map_specs(descriptor)?.into_iter().enumerate() {
                    let sub_code = maplat_code(&map_id, Some(i + 1));
                    pending.push(self.prepare_pixel(registry, &sub_code, size, &sub.warp)?);
                    subs.push(SubSource {
                        projection: sub_code,
                        priority: sub.priority,
                        importance: sub.importance,
                    });
                }
                for (entry, pair) in pending.into_iter().flatten() {
                    registry.register(entry, pair);
                }

                let grid = TileGrid::zoomify(size, options.tile_size, options.tile_pixel_ratio);
                (code, Some(size), TileScheme::Zoomify(grid), subs)
            }
        };

        info!(map_id, projection, kind = ?strategy.kind(), "source built");
        Ok(MaplatSource {
            map_id,
            kind: strategy.kind(),
            projection,
            url,
            size,
            tiles,
            envelope,
            sub_maps,
            title: descriptor.title().cloned(),
        })
    }

    /// Parse a descriptor fetched from `location` and build it.
    ///
    /// Without an id in `options` or in the document, the id is derived from
    /// `location`.
    pub fn build_from_json(
        &self,
        registry: &mut ProjectionRegistry,
        json: &str,
        location: &str,
        options: &SourceOptions,
    ) -> Result<MaplatSource, SourceError> {
        let mut descriptor = MapDescriptor::from_json(json)?;
        let id = match (&options.map_id, descriptor.map_id()) {
            (Some(id), _) => Some(id.clone()),
            (None, Some(_)) => None,
            (None, None) => map_id_from_url(location),
        };
        if let Some(id) = id {
            descriptor.set_map_id(id);
        }
        self.build(registry, &descriptor, options)
    }
}

fn reference_scheme(descriptor: &MapDescriptor) -> TileScheme {
    match descriptor {
        MapDescriptor::Modern(d) if d.source_spec.tile_source_type == TileSourceType::Tms => {
            TileScheme::Tms
        }
        _ => TileScheme::Xyz,
    }
}
