use crate::error::{MapError, Result};
use crate::names::NameNormalizer;
use crate::types::{Coordinate, Entity, ProcessingType, RegionFeature};
use anyhow::Context;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{GeoJson, Geometry, PolygonType, Value};
use serde_json::Value as Json;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Per-type tonnage of one district, as served by the `alldata` feed
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    pub name: String,
    pub total: f64,
    pub self_treated: f64,
    pub consigned: f64,
    pub public: f64,
}

impl Breakdown {
    pub fn value(&self, kind: ProcessingType) -> f64 {
        match kind {
            ProcessingType::Total => self.total,
            ProcessingType::SelfTreated => self.self_treated,
            ProcessingType::Consigned => self.consigned,
            ProcessingType::Public => self.public,
        }
    }
}

/// Load a boundary file, naming each feature from `name_property`
pub fn load_boundaries(path: &Path, name_property: &str) -> anyhow::Result<Vec<RegionFeature>> {
    let mut bytes = fs::read(path).with_context(|| format!("reading boundary file {}", path.display()))?;
    let features = parse_boundaries(&mut bytes, name_property)
        .with_context(|| format!("parsing boundary file {}", path.display()))?;
    info!(path = %path.display(), features = features.len(), "loaded boundaries");
    Ok(features)
}

/// Parse a GeoJSON FeatureCollection of polygon features.
///
/// Features without a usable name are skipped. Non-polygon geometry and
/// malformed positions are dropped, leaving possibly empty geometry.
pub fn parse_boundaries(bytes: &mut [u8], name_property: &str) -> Result<Vec<RegionFeature>> {
    let json: Json = simd_json::serde::from_slice(bytes)?;
    let geojson = GeoJson::from_json_value(json).map_err(|e| MapError::Geometry(e.to_string()))?;

    let GeoJson::FeatureCollection(fc) = geojson else {
        return Err(MapError::Geometry("expected a FeatureCollection".into()));
    };

    let mut features = Vec::with_capacity(fc.features.len());
    for (i, feature) in fc.features.into_iter().enumerate() {
        let name = feature
            .properties
            .as_ref()
            .and_then(|p| p.get(name_property))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let Some(name) = name else {
            let err = MapError::MissingData(format!("feature {i} has no {name_property}"));
            warn!(%err, "skipping feature");
            continue;
        };

        let mut polygons = Vec::new();
        if let Some(ref geometry) = feature.geometry {
            collect_polygons(geometry, &mut polygons);
        }
        if polygons.is_empty() {
            debug!(region = name, "feature has no polygon geometry");
        }

        features.push(RegionFeature {
            name: name.to_string(),
            geometry: MultiPolygon::new(polygons),
        });
    }
    Ok(features)
}

fn collect_polygons(geometry: &Geometry, out: &mut Vec<Polygon<f64>>) {
    match &geometry.value {
        Value::Polygon(rings) => out.extend(to_polygon(rings)),
        Value::MultiPolygon(polygons) => out.extend(polygons.iter().filter_map(to_polygon)),
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

/// Outer ring first, holes after. Positions with fewer than two finite
/// components are skipped.
fn to_polygon(rings: &PolygonType) -> Option<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| {
        LineString::new(
            ring.iter()
                .filter(|pos| pos.len() >= 2 && pos[0].is_finite() && pos[1].is_finite())
                .map(|pos| Coord { x: pos[0], y: pos[1] })
                .collect(),
        )
    });
    let exterior = rings.next()?;
    if exterior.0.is_empty() {
        return None;
    }
    Some(Polygon::new(exterior, rings.filter(|r| !r.0.is_empty()).collect()))
}

/// Numeric feed field: a JSON number or a numeric string
fn number(value: &Json) -> Option<f64> {
    let parsed = match value {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Parse a `{ region: tons }` statistics feed.
///
/// Entries whose value is not a number are skipped.
pub fn parse_stats(bytes: &mut [u8]) -> Result<Vec<(String, f64)>> {
    let json: Json = simd_json::serde::from_slice(bytes)?;
    let Json::Object(map) = json else {
        return Err(MapError::MissingData("statistics feed is not an object".into()));
    };

    Ok(map
        .into_iter()
        .filter_map(|(name, value)| match number(&value) {
            Some(v) => Some((name, v)),
            None => {
                debug!(region = %name, %value, "skipping non-numeric value");
                None
            }
        })
        .collect())
}

/// Parse the per-district breakdown feed. Missing fields count as zero.
pub fn parse_breakdown(bytes: &mut [u8]) -> Result<Vec<Breakdown>> {
    let json: Json = simd_json::serde::from_slice(bytes)?;
    let Json::Object(map) = json else {
        return Err(MapError::MissingData("breakdown feed is not an object".into()));
    };

    Ok(map
        .into_iter()
        .map(|(name, fields)| {
            let field = |key: &str| fields.get(key).and_then(number).unwrap_or(0.0);
            Breakdown {
                total: field("total"),
                self_treated: field("self"),
                consigned: field("consigned"),
                public: field("public"),
                name,
            }
        })
        .collect())
}

/// Parse the company directory, skipping records without a name or a valid
/// coordinate.
pub fn parse_entities(bytes: &mut [u8]) -> Result<Vec<Entity>> {
    let json: Json = simd_json::serde::from_slice(bytes)?;
    let Json::Array(records) = json else {
        return Err(MapError::MissingData("company list is not an array".into()));
    };

    let text = |record: &Json, key: &str| {
        record
            .get(key)
            .and_then(|v| match v {
                Json::String(s) => Some(s.trim().to_string()),
                Json::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_default()
    };

    let mut entities = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let name = text(record, "entrps_nm");
        let lat = record.get("latitude").and_then(number);
        let lng = record.get("longitude").and_then(number);

        let entity = match (lat, lng) {
            (Some(lat), Some(lng)) if !name.is_empty() && Coordinate::new(lat, lng).is_valid() => Entity {
                coordinate: Coordinate::new(lat, lng),
                representative: text(record, "rprsntv"),
                phone: text(record, "telno"),
                waste_type: text(record, "wste"),
                name,
            },
            _ => {
                let err = MapError::MissingData(format!("company record {i} ({name}) has no usable coordinate"));
                debug!(%err, "skipping company");
                continue;
            }
        };
        entities.push(entity);
    }

    info!(kept = entities.len(), total = records.len(), "parsed company directory");
    Ok(entities)
}

/// Unique canonical region names, sorted, for the district selector
pub fn region_names(features: &[RegionFeature], normalizer: &NameNormalizer) -> Vec<String> {
    let mut names: Vec<String> = features.iter().map(|f| normalizer.normalize(&f.name)).collect();
    names.sort();
    names.dedup();
    names
}
