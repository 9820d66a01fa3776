//! Map descriptor documents.
//!
//! Two schemes exist: the legacy one (no `version` field, TIN compiled data
//! at the top level) and the versioned one (`projectionSpec` +
//! `sourceSpec`). A document is classified once at parse time and never
//! re-inspected.

use std::collections::BTreeMap;

use projection::{CompiledTin, WorldParams};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::SourceError;

/// Title text, either plain or keyed by language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocaleText {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacyMapType {
    Base,
    Overlay,
    Mapbox,
    Maplat,
    #[serde(other)]
    Other,
}

impl LegacyMapType {
    /// Tiles already in the reference projection.
    pub fn is_reference_tiled(self) -> bool {
        matches!(self, Self::Base | Self::Overlay | Self::Mapbox)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacySubMap {
    pub compiled: CompiledTin,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub importance: Option<i64>,
    #[serde(default)]
    pub bounds: Option<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyDescriptor {
    #[serde(default, rename = "mapID")]
    pub map_id: Option<String>,
    #[serde(default)]
    pub title: Option<LocaleText>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub compiled: Option<CompiledTin>,
    #[serde(default)]
    pub maptype: Option<LegacyMapType>,
    #[serde(default, rename = "mercatorXShift")]
    pub mercator_x_shift: Option<f64>,
    #[serde(default, rename = "mercatorYShift")]
    pub mercator_y_shift: Option<f64>,
    #[serde(default, rename = "envelopLngLats", alias = "envelopeLngLats")]
    pub envelope_lnglats: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    pub sub_maps: Vec<LegacySubMap>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileSourceType {
    #[serde(rename = "PIXEL")]
    Pixel,
    #[serde(rename = "WMTS")]
    Wmts,
    #[serde(rename = "TMS")]
    Tms,
    #[serde(rename = "IIIF")]
    Iiif,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WarpMode {
    #[serde(rename = "WARP")]
    Warp,
    #[default]
    #[serde(rename = "NONE")]
    None,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectionSpec {
    #[serde(default)]
    pub size: Option<[f64; 2]>,
    #[serde(rename = "mapCoord")]
    pub map_coord: String,
    #[serde(default, rename = "worldParams")]
    pub world_params: Option<WorldParams>,
    #[serde(default, rename = "interOperationCode")]
    pub inter_operation_code: Option<String>,
    #[serde(default, rename = "coordShift")]
    pub coord_shift: Option<[f64; 2]>,
    /// Some descriptors carry the warp mode here instead of in `sourceSpec`.
    #[serde(default)]
    pub warp: Option<WarpMode>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceSpec {
    #[serde(rename = "tileSourceType")]
    pub tile_source_type: TileSourceType,
    #[serde(default)]
    pub warp: WarpMode,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModernSubMap {
    #[serde(default, rename = "projectionSpec")]
    pub projection_spec: Option<ProjectionSpec>,
    #[serde(default)]
    pub compiled: Option<CompiledTin>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub importance: Option<i64>,
    #[serde(default)]
    pub bounds: Option<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModernDescriptor {
    #[serde(deserialize_with = "version_string")]
    pub version: String,
    #[serde(default, rename = "mapID")]
    pub map_id: Option<String>,
    #[serde(default)]
    pub title: Option<LocaleText>,
    #[serde(rename = "projectionSpec")]
    pub projection_spec: ProjectionSpec,
    #[serde(rename = "sourceSpec")]
    pub source_spec: SourceSpec,
    #[serde(default)]
    pub compiled: Option<CompiledTin>,
    #[serde(default, rename = "envelopeLngLats", alias = "envelopLngLats")]
    pub envelope_lnglats: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    pub sub_maps: Vec<ModernSubMap>,
}

fn version_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "version must be a string or number, got {other}"
        ))),
    }
}

#[derive(Debug, Clone)]
pub enum MapDescriptor {
    Legacy(LegacyDescriptor),
    Modern(ModernDescriptor),
}

impl MapDescriptor {
    pub fn from_json(text: &str) -> Result<Self, SourceError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Documents with a non-null `version` use the versioned scheme.
    pub fn from_value(value: Value) -> Result<Self, SourceError> {
        if !value.is_object() {
            return Err(SourceError::InvalidField {
                field: "descriptor",
                message: "expected a JSON object".into(),
            });
        }
        let versioned = value.get("version").is_some_and(|v| !v.is_null());
        if versioned {
            Ok(Self::Modern(serde_json::from_value(value)?))
        } else {
            Ok(Self::Legacy(serde_json::from_value(value)?))
        }
    }

    pub fn map_id(&self) -> Option<&str> {
        match self {
            Self::Legacy(d) => d.map_id.as_deref(),
            Self::Modern(d) => d.map_id.as_deref(),
        }
    }

    pub fn set_map_id(&mut self, id: impl Into<String>) {
        let id = Some(id.into());
        match self {
            Self::Legacy(d) => d.map_id = id,
            Self::Modern(d) => d.map_id = id,
        }
    }

    pub fn title(&self) -> Option<&LocaleText> {
        match self {
            Self::Legacy(d) => d.title.as_ref(),
            Self::Modern(d) => d.title.as_ref(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Legacy(d) => d.url.as_deref(),
            Self::Modern(d) => d.source_spec.url.as_deref(),
        }
    }

    /// Image size: explicit width/height first, then what the compiled data
    /// or projection spec records.
    pub fn size(&self) -> Option<[f64; 2]> {
        match self {
            Self::Legacy(d) => match (d.width, d.height) {
                (Some(w), Some(h)) => Some([w, h]),
                _ => d.compiled.as_ref().and_then(|c| c.wh),
            },
            Self::Modern(d) => d
                .projection_spec
                .size
                .or_else(|| d.compiled.as_ref().and_then(|c| c.wh)),
        }
    }

    pub fn envelope_lnglats(&self) -> Option<&[[f64; 2]]> {
        match self {
            Self::Legacy(d) => d.envelope_lnglats.as_deref(),
            Self::Modern(d) => d.envelope_lnglats.as_deref(),
        }
    }
}

/// Map id derived from a descriptor location: the segment before the file
/// extension (`.../maps/tokyo.json` gives `tokyo`).
pub fn map_id_from_url(url: &str) -> Option<String> {
    let parts: Vec<&str> = url.split(['/', '.']).collect();
    if parts.len() < 2 {
        return None;
    }
    let id = parts[parts.len() - 2];
    (!id.is_empty()).then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::{LegacyMapType, LocaleText, MapDescriptor, TileSourceType, WarpMode, map_id_from_url};
    use pretty_assertions::assert_eq;

    #[test]
    fn classifies_by_version_field() {
        let legacy = MapDescriptor::from_json(r#"{"maptype":"base","url":"u"}"#).unwrap();
        assert!(matches!(legacy, MapDescriptor::Legacy(_)));

        let modern = MapDescriptor::from_json(
            r#"{
                "version": 2,
                "projectionSpec": {"mapCoord": "EPSG:3857"},
                "sourceSpec": {"tileSourceType": "WMTS", "url": "u"}
            }"#,
        )
        .unwrap();
        let MapDescriptor::Modern(m) = modern else {
            panic!("expected modern descriptor");
        };
        assert_eq!(m.version, "2");
        assert_eq!(m.source_spec.tile_source_type, TileSourceType::Wmts);
        assert_eq!(m.source_spec.warp, WarpMode::None);
    }

    #[test]
    fn null_version_is_legacy() {
        let d = MapDescriptor::from_json(r#"{"version":null,"maptype":"overlay"}"#).unwrap();
        let MapDescriptor::Legacy(l) = d else {
            panic!("expected legacy descriptor");
        };
        assert_eq!(l.maptype, Some(LegacyMapType::Overlay));
    }

    #[test]
    fn modern_without_projection_spec_is_rejected() {
        let err = MapDescriptor::from_json(r#"{"version":"1","sourceSpec":{"tileSourceType":"PIXEL"}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(MapDescriptor::from_json("[1,2]").is_err());
    }

    #[test]
    fn size_prefers_width_height_over_compiled() {
        let d = MapDescriptor::from_json(
            r#"{"width": 10, "height": 20,
                "compiled": {"points": [], "tins_points": [], "wh": [1, 2]}}"#,
        )
        .unwrap();
        assert_eq!(d.size(), Some([10.0, 20.0]));

        let d = MapDescriptor::from_json(
            r#"{"compiled": {"points": [], "tins_points": [], "wh": [1, 2]}}"#,
        )
        .unwrap();
        assert_eq!(d.size(), Some([1.0, 2.0]));
    }

    #[test]
    fn titles_accept_plain_and_localized() {
        let d = MapDescriptor::from_json(r#"{"title": {"ja": "東京", "en": "Tokyo"}}"#).unwrap();
        let Some(LocaleText::Localized(map)) = d.title() else {
            panic!("expected localized title");
        };
        assert_eq!(map.get("en").map(String::as_str), Some("Tokyo"));
    }

    #[test]
    fn unknown_maptype_is_tolerated() {
        let d = MapDescriptor::from_json(r#"{"maptype":"satellite"}"#).unwrap();
        let MapDescriptor::Legacy(l) = d else {
            panic!("expected legacy descriptor");
        };
        assert_eq!(l.maptype, Some(LegacyMapType::Other));
    }

    #[test]
    fn map_id_derives_from_file_name() {
        assert_eq!(map_id_from_url("https://example.org/maps/tokyo.json").as_deref(), Some("tokyo"));
        assert_eq!(map_id_from_url("maps/naramachi.json").as_deref(), Some("naramachi"));
        assert_eq!(map_id_from_url("noext"), None);
    }
}
