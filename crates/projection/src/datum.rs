//! Named coordinate systems and the transforms between them.
//!
//! Definitions are proj4 strings evaluated with `proj4rs`. Polyconic
//! definitions, which `proj4rs` lacks, are projected natively on top of a
//! geographic system on the same ellipsoid. The reference projection is
//! never handed to `proj4rs`: transforms that end in `EPSG:3857` go through
//! WGS84 lon/lat and finish with exact spherical Mercator math.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use foundation::Vec2;
use foundation::math::{lonlat_to_mercator, mercator_to_lonlat};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use tracing::debug;

use crate::error::ProjectionError;
use crate::polyconic::Polyconic;
use crate::registry::{LONLAT_CODE, REFERENCE_CODE};

const WGS84_LONLAT: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Built-in named systems used by Japanese historical maps.
pub const BUILTIN_DEFINITIONS: &[(&str, &str)] = &[
    (LONLAT_CODE, WGS84_LONLAT),
    (
        "TOKYO",
        "+proj=longlat +ellps=bessel +towgs84=-146.336,506.832,680.254",
    ),
    ("JCP:NAD27", "+proj=longlat +ellps=clrk66 +no_defs"),
    (
        "JCP:ZONEA:NAD27",
        "+proj=poly +lat_0=40.5 +lon_0=143 +x_0=914398.5307444408 +y_0=1828797.0614888816 +ellps=clrk66 +to_meter=0.9143985307444408 +no_defs",
    ),
    (
        "JCP:ZONEB:NAD27",
        "+proj=poly +lat_0=40.5 +lon_0=135 +x_0=914398.5307444408 +y_0=1828797.0614888816 +ellps=clrk66 +to_meter=0.9143985307444408 +no_defs",
    ),
    (
        "JCP:ZONEC:NAD27",
        "+proj=poly +lat_0=40.5 +lon_0=127 +x_0=914398.5307444408 +y_0=1828797.0614888816 +ellps=clrk66 +to_meter=0.9143985307444408 +no_defs",
    ),
];

/// Zone systems whose lon/lat output is read on the Tokyo datum.
const JCP_ZONES: &[&str] = &["JCP:ZONEA:NAD27", "JCP:ZONEB:NAD27", "JCP:ZONEC:NAD27"];

fn is_geographic(definition: &str) -> bool {
    definition.contains("+proj=longlat") || definition.contains("+proj=latlong")
}

/// One side of a named transform.
struct Endpoint {
    proj: Proj,
    geographic: bool,
    /// Projected on top of `proj`, which is then geographic.
    polyconic: Option<Polyconic>,
}

impl Endpoint {
    fn is_geographic(&self) -> bool {
        self.geographic && self.polyconic.is_none()
    }
}

/// A bidirectional transform between two named coordinate systems.
pub struct NamedTransform {
    from: String,
    to: String,
    source: Endpoint,
    target: Endpoint,
    /// Target is the reference; `target` then holds WGS84 lon/lat.
    target_mercator: bool,
}

impl fmt::Debug for NamedTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedTransform")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("source_geographic", &self.source.is_geographic())
            .field("target_geographic", &self.target.is_geographic())
            .field("target_mercator", &self.target_mercator)
            .finish_non_exhaustive()
    }
}

impl NamedTransform {
    pub fn from_code(&self) -> &str {
        &self.from
    }

    pub fn to_code(&self) -> &str {
        &self.to
    }

    fn error(&self, message: String) -> ProjectionError {
        ProjectionError::Datum {
            from: self.from.clone(),
            to: self.to.clone(),
            message,
        }
    }

    fn run(&self, src: &Endpoint, dst: &Endpoint, p: Vec2) -> Result<Vec2, ProjectionError> {
        let p = match &src.polyconic {
            Some(poly) => poly
                .inverse(p)
                .ok_or_else(|| self.error("polyconic inverse did not converge".into()))?,
            None => p,
        };
        let mut point = if src.geographic {
            (p.x.to_radians(), p.y.to_radians(), 0.0)
        } else {
            (p.x, p.y, 0.0)
        };
        transform(&src.proj, &dst.proj, &mut point).map_err(|e| self.error(format!("{e:?}")))?;
        let out = if dst.geographic {
            Vec2::new(point.0.to_degrees(), point.1.to_degrees())
        } else {
            Vec2::new(point.0, point.1)
        };
        let out = match &dst.polyconic {
            Some(poly) => poly.forward(out),
            None => Some(out),
        };
        match out {
            Some(out) if out.is_finite() => Ok(out),
            _ => Err(self.error("non-finite result".into())),
        }
    }

    pub fn forward(&self, p: Vec2) -> Result<Vec2, ProjectionError> {
        let out = self.run(&self.source, &self.target, p)?;
        Ok(if self.target_mercator {
            lonlat_to_mercator(out)
        } else {
            out
        })
    }

    pub fn inverse(&self, p: Vec2) -> Result<Vec2, ProjectionError> {
        let p = if self.target_mercator {
            mercator_to_lonlat(p)
        } else {
            p
        };
        self.run(&self.target, &self.source, p)
    }
}

/// An ordered list of named transforms taking a map coordinate system to the
/// reference projection.
#[derive(Debug, Clone, Default)]
pub struct DatumRoute {
    hops: Vec<Rc<NamedTransform>>,
}

impl DatumRoute {
    pub fn new(hops: Vec<Rc<NamedTransform>>) -> Self {
        Self { hops }
    }

    pub fn hops(&self) -> &[Rc<NamedTransform>] {
        &self.hops
    }

    pub fn forward(&self, p: Vec2) -> Result<Vec2, ProjectionError> {
        self.hops.iter().try_fold(p, |acc, hop| hop.forward(acc))
    }

    pub fn inverse(&self, p: Vec2) -> Result<Vec2, ProjectionError> {
        self.hops.iter().rev().try_fold(p, |acc, hop| hop.inverse(acc))
    }
}

/// Source of named-datum transforms.
pub trait DatumProvider {
    /// Transform pair between two named systems.
    fn get_transform(&self, from: &str, to: &str) -> Result<Rc<NamedTransform>, ProjectionError>;

    /// Route from `map_coord` to the reference projection, optionally via an
    /// explicit intermediate system.
    fn route(&self, map_coord: &str, via: Option<&str>) -> Result<DatumRoute, ProjectionError>;
}

/// `proj4rs`-backed provider with the built-in definitions preloaded.
///
/// Constructed transforms are cached per `(from, to)` pair.
#[derive(Debug)]
pub struct Proj4Datums {
    definitions: BTreeMap<String, String>,
    cache: RefCell<HashMap<(String, String), Rc<NamedTransform>>>,
}

impl Default for Proj4Datums {
    fn default() -> Self {
        let definitions = BUILTIN_DEFINITIONS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            definitions,
            cache: RefCell::new(HashMap::new()),
        }
    }
}

impl Proj4Datums {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named definition. Cached transforms are dropped.
    pub fn define(&mut self, name: impl Into<String>, proj_string: impl Into<String>) {
        self.definitions.insert(name.into(), proj_string.into());
        self.cache.get_mut().clear();
    }

    pub fn is_defined(&self, name: &str) -> bool {
        name == REFERENCE_CODE || self.definitions.contains_key(name)
    }

    /// Proj definition for `code`, with the reference resolved to WGS84 lon/lat.
    fn definition(&self, code: &str) -> Result<&str, ProjectionError> {
        if code == REFERENCE_CODE {
            return Ok(WGS84_LONLAT);
        }
        self.definitions
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| ProjectionError::UnsupportedProjection(code.to_string()))
    }

    fn parse(&self, code: &str) -> Result<Endpoint, ProjectionError> {
        let def = self.definition(code)?;
        let invalid = |message: String| ProjectionError::InvalidDefinition {
            code: code.to_string(),
            message,
        };
        let polyconic = Polyconic::from_proj_string(def).map_err(invalid)?;
        let base = match &polyconic {
            Some(poly) => poly.geographic_definition(def),
            None => def.to_string(),
        };
        let proj = Proj::from_proj_string(&base).map_err(|e| invalid(format!("{e:?}")))?;
        Ok(Endpoint {
            proj,
            geographic: is_geographic(&base),
            polyconic,
        })
    }
}

impl DatumProvider for Proj4Datums {
    fn get_transform(&self, from: &str, to: &str) -> Result<Rc<NamedTransform>, ProjectionError> {
        let key = (from.to_string(), to.to_string());
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(hit.clone());
        }

        let named = Rc::new(NamedTransform {
            from: key.0.clone(),
            to: key.1.clone(),
            source: self.parse(from)?,
            target: self.parse(to)?,
            target_mercator: to == REFERENCE_CODE,
        });
        debug!(from, to, "named transform constructed");
        self.cache.borrow_mut().insert(key, named.clone());
        Ok(named)
    }

    fn route(&self, map_coord: &str, via: Option<&str>) -> Result<DatumRoute, ProjectionError> {
        if map_coord == REFERENCE_CODE {
            return Ok(DatumRoute::default());
        }
        let hops = match via {
            Some(via) => vec![
                self.get_transform(map_coord, via)?,
                self.get_transform(via, REFERENCE_CODE)?,
            ],
            // Historical survey zones: NAD27 lon/lat is reinterpreted on the
            // Tokyo datum before reaching the reference.
            None if JCP_ZONES.contains(&map_coord) => vec![
                self.get_transform(map_coord, "JCP:NAD27")?,
                self.get_transform("TOKYO", REFERENCE_CODE)?,
            ],
            None => vec![self.get_transform(map_coord, REFERENCE_CODE)?],
        };
        Ok(DatumRoute::new(hops))
    }
}
