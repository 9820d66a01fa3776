//! Reprojecting extent filter over lon/lat feature stores.

use foundation::{Extent, Vec2};
use projection::{LONLAT_CODE, ProjectionError, ProjectionRegistry};
use tracing::debug;

use crate::feature::{Feature, FeatureStore};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    /// Keep only features intersecting this extent, in output coordinates.
    pub extent: Option<Extent>,
    /// Reproject from lon/lat into this projection first.
    pub project_to: Option<String>,
}

/// Copy the features of a lon/lat `source` into a new store, reprojected
/// and clipped per `options`. `source` is not modified.
pub fn filter(
    source: &FeatureStore,
    registry: &ProjectionRegistry,
    options: &FilterOptions,
) -> Result<FeatureStore, ProjectionError> {
    let transform = options
        .project_to
        .as_deref()
        .map(|to| registry.transformer(LONLAT_CODE, to))
        .transpose()?;

    let mut out = FeatureStore::new();
    for (_, feature) in source.iter() {
        let geometry = match &transform {
            Some(t) => feature.geometry.transform(|p: Vec2| t(p))?,
            None => feature.geometry.clone(),
        };
        if let Some(extent) = &options.extent {
            if !geometry.intersects_extent(extent) {
                continue;
            }
        }
        out.add(Feature {
            geometry,
            properties: feature.properties.clone(),
        });
    }
    debug!(kept = out.len(), total = source.len(), "filtered features");
    Ok(out)
}
