//! Which projection a source needs, decided once from its descriptor.

use foundation::Vec2;
use projection::{CompiledTin, REFERENCE_CODE, WorldParams};
use serde::Serialize;
use tracing::debug;

use crate::descriptor::{
    LegacyDescriptor, MapDescriptor, ModernDescriptor, ModernSubMap, ProjectionSpec,
    TileSourceType, WarpMode,
};
use crate::error::SourceError;

/// How pixel coordinates of a custom projection reach the reference.
#[derive(Debug, Clone)]
pub enum PixelWarp {
    /// Compiled TIN straight to the reference.
    Tin(CompiledTin),
    /// World file into `map_coord`, optional shift, then a datum route.
    WorldFile {
        params: WorldParams,
        map_coord: String,
        via: Option<String>,
        shift: Option<Vec2>,
    },
}

#[derive(Debug, Clone)]
pub enum ProjectionStrategy {
    /// Tiles are already in the reference projection.
    PassThrough,
    /// Reference tiles offset by a constant vector.
    ShiftedReference { shift: Vec2 },
    /// Pixel-space image with its own registered projection.
    CustomPixel(PixelWarp),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum StrategyKind {
    PassThrough,
    ShiftedReference,
    CustomPixel,
}

/// A secondary warp region inside a pixel map.
#[derive(Debug, Clone)]
pub struct SubMapSpec {
    pub warp: PixelWarp,
    pub priority: Option<i64>,
    pub importance: Option<i64>,
}

fn shift_of(x: Option<f64>, y: Option<f64>) -> Option<Vec2> {
    match (x, y) {
        (None, None) => None,
        (x, y) => Some(Vec2::new(x.unwrap_or(0.0), y.unwrap_or(0.0))),
    }
}

fn world_file_warp(spec: &ProjectionSpec) -> Option<PixelWarp> {
    spec.world_params.map(|params| PixelWarp::WorldFile {
        params,
        map_coord: spec.map_coord.clone(),
        via: spec.inter_operation_code.clone(),
        shift: spec.coord_shift.map(Vec2::from),
    })
}

impl ProjectionStrategy {
    pub fn decide(descriptor: &MapDescriptor) -> Result<Self, SourceError> {
        let strategy = match descriptor {
            MapDescriptor::Legacy(d) => Self::decide_legacy(d)?,
            MapDescriptor::Modern(d) => Self::decide_modern(d)?,
        };
        debug!(kind = ?strategy.kind(), map_id = descriptor.map_id(), "projection strategy decided");
        Ok(strategy)
    }

    fn decide_legacy(d: &LegacyDescriptor) -> Result<Self, SourceError> {
        if d.maptype.is_some_and(|t| t.is_reference_tiled()) {
            return Ok(match shift_of(d.mercator_x_shift, d.mercator_y_shift) {
                Some(shift) => Self::ShiftedReference { shift },
                None => Self::PassThrough,
            });
        }
        let compiled = d.compiled.clone().ok_or(SourceError::MissingField("compiled"))?;
        Ok(Self::CustomPixel(PixelWarp::Tin(compiled)))
    }

    fn decide_modern(d: &ModernDescriptor) -> Result<Self, SourceError> {
        let spec = &d.projection_spec;
        let tiled = matches!(
            d.source_spec.tile_source_type,
            TileSourceType::Wmts | TileSourceType::Tms
        );
        let warped = d.source_spec.warp == WarpMode::Warp || spec.warp == Some(WarpMode::Warp);

        if tiled && !warped && spec.map_coord == REFERENCE_CODE {
            return Ok(match spec.coord_shift {
                Some(s) => Self::ShiftedReference { shift: s.into() },
                None => Self::PassThrough,
            });
        }
        if warped {
            let compiled = d.compiled.clone().ok_or(SourceError::MissingField("compiled"))?;
            return Ok(Self::CustomPixel(PixelWarp::Tin(compiled)));
        }
        world_file_warp(spec)
            .map(Self::CustomPixel)
            .ok_or(SourceError::MissingField("projectionSpec.worldParams"))
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::PassThrough => StrategyKind::PassThrough,
            Self::ShiftedReference { .. } => StrategyKind::ShiftedReference,
            Self::CustomPixel(_) => StrategyKind::CustomPixel,
        }
    }
}

fn modern_sub_map(sub: &ModernSubMap) -> Result<SubMapSpec, SourceError> {
    let warp = match (&sub.compiled, &sub.projection_spec) {
        (Some(c), _) => PixelWarp::Tin(c.clone()),
        (None, Some(spec)) => {
            world_file_warp(spec).ok_or(SourceError::MissingField("sub_maps.projectionSpec.worldParams"))?
        }
        (None, None) => return Err(SourceError::MissingField("sub_maps.compiled")),
    };
    Ok(SubMapSpec {
        warp,
        priority: sub.priority,
        importance: sub.importance,
    })
}

/// Sub map warps in document order.
pub fn sub_map_specs(descriptor: &MapDescriptor) -> Result<Vec<SubMapSpec>, SourceError> {
    match descriptor {
        MapDescriptor::Legacy(d) => Ok(d
            .sub_maps
            .iter()
            .map(|s| SubMapSpec {
                warp: PixelWarp::Tin(s.compiled.clone()),
                priority: s.priority,
                importance: s.importance,
            })
            .collect()),
        MapDescriptor::Modern(d) => d.sub_maps.iter().map(modern_sub_map).collect(),
    }
}
