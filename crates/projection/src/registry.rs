//! Session-scoped projection registry.
//!
//! Holds every known projection and the coordinate transforms between them.
//! Registration is idempotent per code: the first registration wins and
//! later calls return the existing entry without rebuilding anything.
//!
//! Ordering contract: `codes()` yields projections in registration order.

use std::collections::HashMap;
use std::rc::Rc;

use foundation::Extent;
use foundation::Vec2;
use foundation::math::{MERCATOR_HALF_EXTENT, lonlat_to_mercator, mercator_to_lonlat};
use tracing::{debug, info};

use crate::chain::{TransformFn, TransformPair};
use crate::error::ProjectionError;

/// Shared Web Mercator reference projection.
pub const REFERENCE_CODE: &str = "EPSG:3857";
/// Longitude/latitude in degrees.
pub const LONLAT_CODE: &str = "EPSG:4326";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Units {
    Pixels,
    Meters,
    Degrees,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionEntry {
    pub code: String,
    pub units: Units,
    pub extent: Extent,
    pub world_extent: Extent,
}

impl ProjectionEntry {
    pub fn new(code: impl Into<String>, units: Units, extent: Extent, world_extent: Extent) -> Self {
        Self {
            code: code.into(),
            units,
            extent,
            world_extent,
        }
    }

    pub fn reference() -> Self {
        let h = MERCATOR_HALF_EXTENT;
        let extent = Extent::from_array([-h, -h, h, h]);
        Self::new(REFERENCE_CODE, Units::Meters, extent, extent)
    }

    pub fn lonlat() -> Self {
        let extent = Extent::from_array([-180.0, -90.0, 180.0, 90.0]);
        Self::new(LONLAT_CODE, Units::Degrees, extent, extent)
    }
}

/// Projection entries plus a `(from, to)` keyed transform table.
pub struct ProjectionRegistry {
    entries: HashMap<String, ProjectionEntry>,
    order: Vec<String>,
    transforms: HashMap<(String, String), TransformFn>,
}

impl std::fmt::Debug for ProjectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectionRegistry")
            .field("codes", &self.order)
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

impl Default for ProjectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectionRegistry {
    /// Registry holding the reference and lon/lat projections.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: HashMap::new(),
            order: Vec::new(),
            transforms: HashMap::new(),
        };
        registry.insert_entry(ProjectionEntry::reference());
        registry.register(
            ProjectionEntry::lonlat(),
            TransformPair::new(
                |p| Ok(lonlat_to_mercator(p)),
                |p| Ok(mercator_to_lonlat(p)),
            ),
        );
        registry
    }

    fn insert_entry(&mut self, entry: ProjectionEntry) {
        self.order.push(entry.code.clone());
        self.entries.insert(entry.code.clone(), entry);
    }

    pub fn get(&self, code: &str) -> Option<&ProjectionEntry> {
        self.entries.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Codes in registration order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Register `entry` with transforms to and from the reference.
    ///
    /// On first registration, composed transforms through the reference are
    /// installed between the new projection and every existing one. A code
    /// that is already registered is returned unchanged and `pair` is
    /// dropped.
    pub fn register(&mut self, entry: ProjectionEntry, pair: TransformPair) -> &ProjectionEntry {
        let code = entry.code.clone();
        if self.entries.contains_key(&code) {
            debug!(code, "projection already registered");
            return &self.entries[&code];
        }

        let existing: Vec<String> = self
            .order
            .iter()
            .filter(|c| c.as_str() != REFERENCE_CODE)
            .cloned()
            .collect();

        for other in existing {
            let (Some(ref_to_other), Some(other_to_ref)) = (
                self.transforms.get(&(REFERENCE_CODE.to_string(), other.clone())).cloned(),
                self.transforms.get(&(other.clone(), REFERENCE_CODE.to_string())).cloned(),
            ) else {
                continue;
            };
            let to_ref = pair.forward.clone();
            let from_ref = pair.inverse.clone();
            self.transforms.insert(
                (code.clone(), other.clone()),
                Rc::new(move |p: Vec2| ref_to_other(to_ref(p)?)),
            );
            self.transforms.insert(
                (other.clone(), code.clone()),
                Rc::new(move |p: Vec2| from_ref(other_to_ref(p)?)),
            );
        }

        self.transforms
            .insert((code.clone(), REFERENCE_CODE.to_string()), pair.forward);
        self.transforms
            .insert((REFERENCE_CODE.to_string(), code.clone()), pair.inverse);

        info!(code, units = ?entry.units, "projection registered");
        self.insert_entry(entry);
        &self.entries[&code]
    }

    /// Like [`register`](Self::register) but only builds the transform pair
    /// when `entry.code` is new.
    pub fn register_with<F>(
        &mut self,
        entry: ProjectionEntry,
        build: F,
    ) -> Result<&ProjectionEntry, ProjectionError>
    where
        F: FnOnce() -> Result<TransformPair, ProjectionError>,
    {
        if self.entries.contains_key(&entry.code) {
            debug!(code = entry.code.as_str(), "projection already registered");
            return Ok(&self.entries[&entry.code]);
        }
        let pair = build()?;
        Ok(self.register(entry, pair))
    }

    /// Install a direct transform pair between two registered projections,
    /// replacing any composed one.
    pub fn add_coordinate_transforms(
        &mut self,
        from: &str,
        to: &str,
        pair: TransformPair,
    ) -> Result<(), ProjectionError> {
        for code in [from, to] {
            if !self.contains(code) {
                return Err(ProjectionError::UnknownProjection(code.to_string()));
            }
        }
        self.transforms
            .insert((from.to_string(), to.to_string()), pair.forward);
        self.transforms
            .insert((to.to_string(), from.to_string()), pair.inverse);
        Ok(())
    }

    /// The transform from `from` to `to`.
    pub fn transformer(&self, from: &str, to: &str) -> Result<TransformFn, ProjectionError> {
        for code in [from, to] {
            if !self.contains(code) {
                return Err(ProjectionError::UnknownProjection(code.to_string()));
            }
        }
        if from == to {
            let identity: TransformFn = Rc::new(|p: Vec2| Ok::<_, ProjectionError>(p));
            return Ok(identity);
        }
        self.transforms
            .get(&(from.to_string(), to.to_string()))
            .cloned()
            .ok_or_else(|| ProjectionError::NoTransform {
                from: from.to_string(),
                to: to.to_string(),
            })
    }

    pub fn transform(&self, p: Vec2, from: &str, to: &str) -> Result<Vec2, ProjectionError> {
        let f = self.transformer(from, to)?;
        let out = f(p)?;
        if !out.is_finite() {
            return Err(ProjectionError::NonFinite);
        }
        Ok(out)
    }
}
