//! Command implementations behind the `maplat` binary.

use std::error::Error;
use std::fs;
use std::path::Path;

use foundation::{Extent, Vec2};
use projection::{DEFAULT_BASE_RADIUS, ProjectionRegistry, REFERENCE_CODE, ViewParams, convert_view};
use serde::Serialize;
use serde_json::{Value, json};
use sources::{MaplatSource, SourceFactory, SourceOptions};
use tracing::info;

pub type ToolResult<T> = Result<T, Box<dyn Error>>;

/// Registers maps from descriptor files into one registry.
#[derive(Default)]
pub struct Workspace {
    pub registry: ProjectionRegistry,
    factory: SourceFactory,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_str(&mut self, json: &str, location: &str) -> ToolResult<MaplatSource> {
        let source = self
            .factory
            .build_from_json(&mut self.registry, json, location, &SourceOptions::default())?;
        info!(map_id = source.map_id.as_str(), projection = source.projection.as_str(), "loaded map");
        Ok(source)
    }

    pub fn load(&mut self, path: &Path) -> ToolResult<MaplatSource> {
        let json = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
        self.load_str(&json, &path.to_string_lossy())
    }
}

fn extent_json(e: &Extent) -> Value {
    json!(e.to_array())
}

/// Strategy, projection and tiling summary of one map.
pub fn inspect(ws: &Workspace, source: &MaplatSource) -> ToolResult<Value> {
    let mut report = serde_json::to_value(source)?;
    if let (Some(entry), Value::Object(map)) = (ws.registry.get(&source.projection), &mut report) {
        map.insert("extent".into(), extent_json(&entry.extent));
        map.insert("worldExtent".into(), extent_json(&entry.world_extent));
    }
    Ok(report)
}

/// Transform one point; `from` defaults to the map, `to` to the reference.
pub fn transform_point(
    ws: &Workspace,
    source: &MaplatSource,
    from: Option<&str>,
    to: Option<&str>,
    p: Vec2,
) -> ToolResult<Vec2> {
    let from = from.unwrap_or(&source.projection);
    let to = to.unwrap_or(REFERENCE_CODE);
    Ok(ws.registry.transform(p, from, to)?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewReport {
    pub from: String,
    pub to: String,
    pub center: [f64; 2],
    pub rotation: f64,
    pub resolution: f64,
}

/// Carry a view from one map's projection to another's.
pub fn switch_view(ws: &Workspace, from: &MaplatSource, to: &MaplatSource, view: ViewParams) -> ToolResult<ViewReport> {
    let out = convert_view(&ws.registry, view, DEFAULT_BASE_RADIUS, &from.projection, &to.projection)?;
    Ok(ViewReport {
        from: from.projection.clone(),
        to: to.projection.clone(),
        center: out.center.to_array(),
        rotation: out.rotation,
        resolution: out.resolution,
    })
}

/// Parse `x,y`.
pub fn parse_pair(s: &str) -> ToolResult<Vec2> {
    let parts: Vec<_> = s.split(',').collect();
    if parts.len() != 2 {
        return Err(format!("expected x,y but got {s:?}").into());
    }
    let x: f64 = parts[0].trim().parse()?;
    let y: f64 = parts[1].trim().parse()?;
    Ok(Vec2::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::{Workspace, inspect, parse_pair, switch_view, transform_point};
    use foundation::Vec2;
    use pretty_assertions::assert_eq;
    use projection::ViewParams;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn world_file_map(scale: f64) -> String {
        format!(
            r#"{{
                "version": "2.0",
                "projectionSpec": {{
                    "mapCoord": "EPSG:3857",
                    "size": [300, 100],
                    "worldParams": {{"xScale": {scale}, "xRotation": 0, "xOrigin": 10,
                                    "yRotation": 0, "yScale": {scale}, "yOrigin": 20}}
                }},
                "sourceSpec": {{"tileSourceType": "PIXEL", "url": "https://t/{{z}}/{{x}}/{{y}}.png"}}
            }}"#
        )
    }

    #[test]
    fn inspect_reports_extents() {
        let mut ws = Workspace::new();
        let src = ws.load_str(&world_file_map(2.0), "maps/survey.json").unwrap();
        assert_eq!(src.projection, "Maplat:survey");
        let report = inspect(&ws, &src).unwrap();
        assert_eq!(report["extent"], serde_json::json!([0.0, -100.0, 300.0, 0.0]));
        assert_eq!(report["worldExtent"], serde_json::json!([0.0, -512.0, 512.0, 0.0]));
        assert_eq!(report["map_id"], "survey");
    }

    #[test]
    fn transform_defaults_to_reference() {
        let mut ws = Workspace::new();
        let src = ws.load_str(&world_file_map(2.0), "survey.json").unwrap();
        let out = transform_point(&ws, &src, None, None, Vec2::new(1.0, 1.0)).unwrap();
        assert_eq!(out, Vec2::new(12.0, 18.0));
        let back = transform_point(&ws, &src, Some("EPSG:3857"), Some("Maplat:survey"), out).unwrap();
        assert_close(back.x, 1.0, 1e-9);
        assert_close(back.y, 1.0, 1e-9);
        assert!(transform_point(&ws, &src, Some("Maplat:other"), None, out).is_err());
    }

    #[test]
    fn switch_between_scaled_maps() {
        let mut ws = Workspace::new();
        let a = ws.load_str(&world_file_map(2.0), "a.json").unwrap();
        let b = ws.load_str(&world_file_map(4.0), "b.json").unwrap();
        let view = ViewParams::new(Vec2::new(100.0, -50.0), 0.0, 1.0);
        let report = switch_view(&ws, &a, &b, view).unwrap();
        // a: X = 2x + 10, b: X = 4x + 10, so b pixels are half as many.
        assert_close(report.center[0], 50.0, 1e-6);
        assert_close(report.resolution, 0.5, 1e-6);
        assert_close(report.rotation, 0.0, 1e-9);
    }

    #[test]
    fn parses_pairs() {
        assert_eq!(parse_pair("1.5, -2").unwrap(), Vec2::new(1.5, -2.0));
        assert!(parse_pair("1,2,3").is_err());
        assert!(parse_pair("a,b").is_err());
    }
}
