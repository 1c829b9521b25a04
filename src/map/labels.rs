use crate::config::{LabelOffset, LabelsConfig};
use crate::map::binding::BoundRegion;
use crate::map::projection::Viewport;
use geo::{Area, Centroid, Coord, MapCoords, MultiPolygon};
use glam::DVec2;
use std::collections::{HashMap, HashSet};

/// A region label anchored in screen space
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub name: String,
    pub position: DVec2,
    /// False when the centroid was undefined and `position` is the origin
    pub anchored: bool,
}

/// Places region labels at projected centroids plus per-region nudges.
#[derive(Debug, Clone, Default)]
pub struct LabelPlacer {
    offsets: HashMap<String, LabelOffset>,
    /// Multiplier applied to every offset (canvas width / tuned width)
    offset_scale: f64,
}

impl LabelPlacer {
    pub fn new(offsets: HashMap<String, LabelOffset>) -> Self {
        Self {
            offsets,
            offset_scale: 1.0,
        }
    }

    /// Offsets scaled from `config.reference_width` to `canvas_width`
    pub fn from_config(config: &LabelsConfig, canvas_width: usize) -> Self {
        let scale = if config.reference_width > 0.0 {
            canvas_width as f64 / config.reference_width
        } else {
            1.0
        };
        Self::new(config.offsets.clone()).with_offset_scale(scale)
    }

    pub fn with_offset_scale(mut self, scale: f64) -> Self {
        self.offset_scale = scale;
        self
    }

    /// Override for a canonical name, (0, 0) when absent
    pub fn offset(&self, name: &str) -> DVec2 {
        self.offsets
            .get(name)
            .map(|o| DVec2::new(o.dx, o.dy) * self.offset_scale)
            .unwrap_or(DVec2::ZERO)
    }

    /// Area-weighted centroid in screen space, plus the region's override.
    ///
    /// When the centroid is undefined (no polygons, zero projected area, or
    /// a projection that produced non-finite coordinates) the label goes to
    /// the origin and the override is not applied.
    pub fn place(&self, name: &str, geometry: &MultiPolygon<f64>, viewport: &Viewport) -> DVec2 {
        self.try_place(name, geometry, viewport).unwrap_or(DVec2::ZERO)
    }

    /// Like [`place`](Self::place), but `None` for an undefined centroid
    pub fn try_place(&self, name: &str, geometry: &MultiPolygon<f64>, viewport: &Viewport) -> Option<DVec2> {
        projected_centroid(geometry, viewport).map(|c| c + self.offset(name))
    }

    /// One label per canonical name; the first region with a name wins
    pub fn place_all(&self, regions: &[BoundRegion], viewport: &Viewport) -> Vec<Label> {
        let mut seen = HashSet::new();
        regions
            .iter()
            .filter(|r| seen.insert(r.name.as_str()))
            .map(|r| {
                let placed = self.try_place(&r.name, &r.geometry, viewport);
                Label {
                    name: r.name.clone(),
                    position: placed.unwrap_or(DVec2::ZERO),
                    anchored: placed.is_some(),
                }
            })
            .collect()
    }
}

fn projected_centroid(geometry: &MultiPolygon<f64>, viewport: &Viewport) -> Option<DVec2> {
    let projected = geometry.map_coords(|c| {
        let p = viewport.project_f64(c.x, c.y);
        Coord { x: p.x, y: p.y }
    });
    let area = projected.unsigned_area();
    if !area.is_finite() || area == 0.0 {
        return None;
    }
    let centroid = projected.centroid()?;
    let p = DVec2::new(centroid.x(), centroid.y());
    p.is_finite().then_some(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rgb;
    use geo::{LineString, Polygon};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )
    }

    fn region(name: &str, geometry: MultiPolygon<f64>) -> BoundRegion {
        BoundRegion {
            name: name.to_string(),
            raw_name: name.to_string(),
            value: None,
            color: Rgb::new(0xee, 0xee, 0xee),
            geometry,
        }
    }

    fn viewport() -> Viewport {
        Viewport::new(0.0, 0.0, 1.0, 360, 360)
    }

    #[test]
    fn test_centroid_of_square_at_equator() {
        let placer = LabelPlacer::default();
        let geom = MultiPolygon::new(vec![rect(-1.0, -1.0, 1.0, 1.0)]);
        let p = placer.place("x", &geom, &viewport());
        assert!((p.x - 180.0).abs() < 1e-6);
        assert!((p.y - 180.0).abs() < 1e-3);
    }

    #[test]
    fn test_override_is_added() {
        let mut offsets = HashMap::new();
        offsets.insert("수원시".to_string(), LabelOffset::new(0.0, 14.0));
        let placer = LabelPlacer::new(offsets).with_offset_scale(0.5);
        let geom = MultiPolygon::new(vec![rect(-1.0, -1.0, 1.0, 1.0)]);
        let plain = LabelPlacer::default().place("수원시", &geom, &viewport());
        let moved = placer.place("수원시", &geom, &viewport());
        assert!((moved.y - plain.y - 7.0).abs() < 1e-9);
        assert_eq!(moved.x, plain.x);
    }

    #[test]
    fn test_empty_geometry_goes_to_origin() {
        let mut offsets = HashMap::new();
        offsets.insert("빈곳".to_string(), LabelOffset::new(30.0, 30.0));
        let placer = LabelPlacer::new(offsets);
        let p = placer.place("빈곳", &MultiPolygon::new(vec![]), &viewport());
        assert_eq!(p, DVec2::ZERO);
    }

    #[test]
    fn test_flat_polygon_goes_to_origin() {
        let mut offsets = HashMap::new();
        offsets.insert("선".to_string(), LabelOffset::new(30.0, 30.0));
        let placer = LabelPlacer::new(offsets);
        let flat = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (0.0, 0.0)]),
            vec![],
        );
        let geom = MultiPolygon::new(vec![flat]);
        assert_eq!(placer.place("선", &geom, &viewport()), DVec2::ZERO);
        assert_eq!(placer.try_place("선", &geom, &viewport()), None);
    }

    #[test]
    fn test_undefined_centroid_is_not_anchored() {
        let placer = LabelPlacer::default();
        let regions = vec![
            region("빈곳", MultiPolygon::new(vec![])),
            region("목포시", MultiPolygon::new(vec![rect(2.0, 2.0, 3.0, 3.0)])),
        ];
        let labels = placer.place_all(&regions, &viewport());
        assert_eq!(labels[0].position, DVec2::ZERO);
        assert!(!labels[0].anchored);
        assert!(labels[1].anchored);
    }

    #[test]
    fn test_area_weighting() {
        // big square dominates the small one far to the right
        let placer = LabelPlacer::default();
        let geom = MultiPolygon::new(vec![rect(-2.0, -2.0, 2.0, 2.0), rect(10.0, -0.5, 11.0, 0.5)]);
        let p = placer.place("x", &geom, &viewport());
        let expected_x = 180.0 + (16.0 * 0.0 + 1.0 * 10.5) / 17.0;
        assert!((p.x - expected_x).abs() < 1e-3);
    }

    #[test]
    fn test_multipart_names_get_one_label() {
        let placer = LabelPlacer::default();
        let regions = vec![
            region("신안군", MultiPolygon::new(vec![rect(0.0, 0.0, 1.0, 1.0)])),
            region("신안군", MultiPolygon::new(vec![rect(5.0, 5.0, 6.0, 6.0)])),
            region("목포시", MultiPolygon::new(vec![rect(2.0, 2.0, 3.0, 3.0)])),
        ];
        let labels = placer.place_all(&regions, &viewport());
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].name, "신안군");
        assert_eq!(labels[1].name, "목포시");
        assert!(labels[0].position.x < 182.0);
    }

    #[test]
    fn test_from_config_scales_offsets() {
        let placer = LabelPlacer::from_config(&LabelsConfig::default(), 350);
        assert_eq!(placer.offset("제주시"), DVec2::new(150.0, -70.0));
        assert_eq!(placer.offset("서울"), DVec2::ZERO);
    }
}
