use crate::types::{Coordinate, Entity};
use geo::{Contains, LineString, MultiPolygon, Point, Polygon};
use rayon::prelude::*;

/// Build a polygon from `[lng, lat]` rings: the first is the outer ring,
/// the rest are holes. Rings are closed automatically.
fn polygon_from_rings(rings: &[Vec<[f64; 2]>]) -> Option<Polygon<f64>> {
    let (outer, holes) = rings.split_first()?;
    let ring = |coords: &Vec<[f64; 2]>| LineString::from(coords.iter().map(|c| (c[0], c[1])).collect::<Vec<_>>());
    Some(Polygon::new(ring(outer), holes.iter().map(ring).collect()))
}

/// Strict interior test: a point on the outer ring or on a hole's ring is
/// outside, and so is a point inside a hole.
#[inline]
pub fn contains_point(region: &MultiPolygon<f64>, at: Coordinate) -> bool {
    region.contains(&Point::new(at.lng, at.lat))
}

/// Entities strictly inside the polygon described by `rings`, in input order.
///
/// An empty ring list contains nothing.
pub fn within<'a>(rings: &[Vec<[f64; 2]>], entities: &'a [Entity]) -> Vec<&'a Entity> {
    match polygon_from_rings(rings) {
        Some(polygon) => within_region(&MultiPolygon::new(vec![polygon]), entities),
        None => Vec::new(),
    }
}

/// Entities strictly inside any part of a multi-part region, in input order
pub fn within_region<'a>(region: &MultiPolygon<f64>, entities: &'a [Entity]) -> Vec<&'a Entity> {
    entities
        .par_iter()
        .filter(|e| contains_point(region, e.coordinate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(name: &str, lng: f64, lat: f64) -> Entity {
        Entity {
            name: name.to_string(),
            coordinate: Coordinate::new(lat, lng),
            representative: String::new(),
            phone: String::new(),
            waste_type: String::new(),
        }
    }

    fn unit_square() -> Vec<Vec<[f64; 2]>> {
        vec![vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]]
    }

    #[test]
    fn test_square_inside_and_outside() {
        let entities = vec![company("in", 0.5, 0.5), company("out", 2.0, 2.0)];
        let hits = within(&unit_square(), &entities);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "in");
    }

    #[test]
    fn test_boundary_points_excluded() {
        let entities = vec![
            company("edge", 0.0, 0.5),
            company("corner", 1.0, 1.0),
            company("top", 0.5, 1.0),
        ];
        assert!(within(&unit_square(), &entities).is_empty());
    }

    #[test]
    fn test_hole_is_subtracted() {
        let mut rings = vec![vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]]];
        rings.push(vec![[1.0, 1.0], [3.0, 1.0], [3.0, 3.0], [1.0, 3.0], [1.0, 1.0]]);
        let entities = vec![
            company("ring", 0.5, 0.5),
            company("hole", 2.0, 2.0),
            company("hole-edge", 1.0, 2.0),
        ];
        let names: Vec<&str> = within(&rings, &entities).iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["ring"]);
    }

    #[test]
    fn test_unclosed_ring_and_empty_rings() {
        let open = vec![vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]];
        let entities = vec![company("in", 0.5, 0.5)];
        assert_eq!(within(&open, &entities).len(), 1);
        assert!(within(&[], &entities).is_empty());
    }

    #[test]
    fn test_multipart_region_keeps_order() {
        let a = polygon_from_rings(&unit_square()).unwrap();
        let b = polygon_from_rings(&[vec![[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 6.0]]]).unwrap();
        let region = MultiPolygon::new(vec![a, b]);
        let entities = vec![
            company("second", 5.5, 5.5),
            company("none", 3.0, 3.0),
            company("first", 0.25, 0.75),
        ];
        let names: Vec<&str> = within_region(&region, &entities).iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["second", "first"]);
    }
}
