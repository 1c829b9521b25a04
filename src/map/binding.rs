//! Joins boundary polygons to statistics through canonical names.

use crate::config::ScaleConfig;
use crate::error::Result;
use crate::map::scale::{format_tons, ColorScale};
use crate::names::NameNormalizer;
use crate::types::{RegionFeature, Rgb};
use geo::{Contains, MultiPolygon, Point};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Two differently named source regions that normalized to one key
#[derive(Debug, Clone, PartialEq)]
pub struct NameCollision {
    pub key: String,
    pub kept: String,
    pub replaced: String,
}

/// Feed values keyed by canonical name.
///
/// Later entries overwrite earlier ones with the same canonical key; every
/// overwrite between distinct raw names is recorded in [`collisions`].
///
/// [`collisions`]: ValueIndex::collisions
#[derive(Debug, Clone, Default)]
pub struct ValueIndex {
    entries: HashMap<String, (String, f64)>,
    collisions: Vec<NameCollision>,
}

impl ValueIndex {
    pub fn from_pairs<I, S>(pairs: I, normalizer: &NameNormalizer) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut index = Self::default();
        for (raw, value) in pairs {
            let raw = raw.as_ref();
            let key = normalizer.normalize(raw);
            if let Some((previous, _)) = index.entries.insert(key.clone(), (raw.to_string(), value)) {
                if previous != raw {
                    warn!(key = %key, kept = %raw, replaced = %previous, "canonical name collision");
                    index.collisions.push(NameCollision {
                        key,
                        kept: raw.to_string(),
                        replaced: previous,
                    });
                }
            }
        }
        index
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.get(key).map(|(_, v)| *v)
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.values().map(|(_, v)| *v).collect()
    }

    /// (canonical name, value) pairs in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(k, (_, v))| (k.as_str(), *v))
    }

    pub fn collisions(&self) -> &[NameCollision] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A boundary feature with its joined value and fill
#[derive(Debug, Clone)]
pub struct BoundRegion {
    /// Canonical key used for the join
    pub name: String,
    /// Name as it appears in the boundary file
    pub raw_name: String,
    pub value: Option<f64>,
    pub color: Rgb,
    pub geometry: MultiPolygon<f64>,
}

impl BoundRegion {
    pub fn has_data(&self) -> bool {
        self.value.is_some()
    }

    /// Hover text: name, then floored tonnage or a no-data marker
    pub fn tooltip(&self) -> String {
        match self.value {
            Some(v) => format!("{}\n{}", self.name, format_tons(v)),
            None => format!("{}\n데이터 없음", self.name),
        }
    }
}

/// Color every feature by its value, falling back for unmatched names.
///
/// Never fails on a single feature: empty or degenerate geometry is carried
/// through untouched and only affects label placement.
pub fn bind<I>(
    features: I,
    values: &ValueIndex,
    normalizer: &NameNormalizer,
    scale: &ColorScale,
    fallback: Rgb,
) -> Vec<BoundRegion>
where
    I: IntoIterator<Item = RegionFeature>,
{
    features
        .into_iter()
        .map(|feature| {
            let name = normalizer.normalize(&feature.name);
            let value = values.get(&name);
            let color = match value {
                Some(v) => scale.color(v),
                None => {
                    debug!(region = %feature.name, key = %name, "no value for region");
                    fallback
                }
            };
            BoundRegion {
                name,
                raw_name: feature.name,
                value,
                color,
                geometry: feature.geometry,
            }
        })
        .collect()
}

/// A bound choropleth and the scale it was colored with
#[derive(Debug, Clone)]
pub struct Choropleth {
    pub regions: Vec<BoundRegion>,
    /// `None` when the view has boundaries but no statistics
    pub scale: Option<ColorScale>,
}

impl Choropleth {
    /// Build the scale from every feed value, then bind the features.
    ///
    /// Fails only when the value set cannot form a domain.
    pub fn build(
        features: Vec<RegionFeature>,
        values: &ValueIndex,
        normalizer: &NameNormalizer,
        palette: &ScaleConfig,
    ) -> Result<Self> {
        let scale = ColorScale::new(&values.values(), &palette.stops)?;
        let regions = bind(features, values, normalizer, &scale, palette.fallback);
        Ok(Self {
            regions,
            scale: Some(scale),
        })
    }

    /// Boundaries only, every region in the fallback color
    pub fn without_data(features: Vec<RegionFeature>, normalizer: &NameNormalizer, fallback: Rgb) -> Self {
        let regions = features
            .into_iter()
            .map(|feature| BoundRegion {
                name: normalizer.normalize(&feature.name),
                raw_name: feature.name,
                value: None,
                color: fallback,
                geometry: feature.geometry,
            })
            .collect();
        Self { regions, scale: None }
    }

    /// Region by canonical name
    pub fn region(&self, name: &str) -> Option<&BoundRegion> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// First region whose polygon strictly contains the point
    pub fn region_at(&self, lon: f64, lat: f64) -> Option<&BoundRegion> {
        let point = Point::new(lon, lat);
        self.regions.iter().find(|r| r.geometry.contains(&point))
    }

    pub fn matched(&self) -> usize {
        self.regions.iter().filter(|r| r.has_data()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamesConfig;
    use geo::{LineString, MultiPolygon, Polygon};

    fn normalizer() -> NameNormalizer {
        NameNormalizer::from_config(&NamesConfig::default())
    }

    fn square(name: &str, x: f64, y: f64) -> RegionFeature {
        RegionFeature {
            name: name.to_string(),
            geometry: MultiPolygon::new(vec![Polygon::new(
                LineString::from(vec![(x, y), (x + 1.0, y), (x + 1.0, y + 1.0), (x, y + 1.0), (x, y)]),
                vec![],
            )]),
        }
    }

    fn palette() -> ScaleConfig {
        ScaleConfig::default()
    }

    #[test]
    fn test_bind_matches_through_normalizer() {
        let n = normalizer();
        let values = ValueIndex::from_pairs([("수원시", 10.0), ("성남시", 50.0)], &n);
        let features = vec![square("경기도 수원시", 0.0, 0.0), square("경기도 성남시", 1.0, 0.0)];
        let map = Choropleth::build(features, &values, &n, &palette()).unwrap();

        assert_eq!(map.regions[0].name, "수원시");
        assert_eq!(map.regions[0].value, Some(10.0));
        assert_eq!(map.regions[0].color, palette().stops[0]);
        assert_eq!(map.regions[1].color, palette().stops[4]);
        assert_eq!(map.matched(), 2);
    }

    #[test]
    fn test_unmatched_gets_fallback_even_with_broken_geometry() {
        let n = normalizer();
        let values = ValueIndex::from_pairs([("서울", 3.0)], &n);
        let scale = ColorScale::new(&values.values(), &palette().stops).unwrap();
        let broken = RegionFeature {
            name: "어딘가".to_string(),
            geometry: MultiPolygon::new(vec![]),
        };
        let bound = bind(vec![broken], &values, &n, &scale, palette().fallback);

        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].color, palette().fallback);
        assert_ne!(bound[0].color, palette().stops[0]);
        assert!(bound[0].tooltip().ends_with("데이터 없음"));
    }

    #[test]
    fn test_zero_value_is_data() {
        let n = normalizer();
        let values = ValueIndex::from_pairs([("부산", 0.0), ("대구", 100.0)], &n);
        let map = Choropleth::build(vec![square("부산광역시", 0.0, 0.0)], &values, &n, &palette()).unwrap();
        assert_eq!(map.regions[0].value, Some(0.0));
        assert_eq!(map.regions[0].color, palette().stops[0]);
    }

    #[test]
    fn test_empty_feed_is_invalid_domain() {
        let n = normalizer();
        let values = ValueIndex::default();
        let result = Choropleth::build(vec![square("서울특별시", 0.0, 0.0)], &values, &n, &palette());
        assert!(matches!(result, Err(crate::error::MapError::InvalidDomain(_))));

        let map = Choropleth::without_data(vec![square("서울특별시", 0.0, 0.0)], &n, palette().fallback);
        assert!(map.scale.is_none());
        assert_eq!(map.region("서울").map(|r| r.color), Some(palette().fallback));
    }

    #[test]
    fn test_collisions_are_reported() {
        let n = normalizer();
        let values = ValueIndex::from_pairs([("경기도 광주시", 1.0), ("광주시", 2.0)], &n);
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("광주시"), Some(2.0));
        assert_eq!(values.collisions().len(), 1);
        assert_eq!(values.collisions()[0].replaced, "경기도 광주시");
    }

    #[test]
    fn test_region_at() {
        let n = normalizer();
        let values = ValueIndex::from_pairs([("수원시", 1.0)], &n);
        let features = vec![square("수원시", 0.0, 0.0), square("용인시", 2.0, 0.0)];
        let map = Choropleth::build(features, &values, &n, &palette()).unwrap();
        assert_eq!(map.region_at(2.5, 0.5).map(|r| r.name.as_str()), Some("용인시"));
        assert!(map.region_at(1.5, 0.5).is_none());
    }
}
