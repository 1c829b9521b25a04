use crate::types::{Coordinate, Entity};
use rayon::prelude::*;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometers on a spherical earth.
///
/// The haversine term is clamped to [0, 1] before `sqrt`/`asin`, so antipodal
/// and polar pairs never produce NaN from rounding overshoot.
#[inline(always)]
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Entities within `radius_km` of `origin` (inclusive), in input order
pub fn nearby<'a>(origin: Coordinate, entities: &'a [Entity], radius_km: f64) -> Vec<&'a Entity> {
    nearby_with_distance(origin, entities, radius_km)
        .into_iter()
        .map(|(entity, _)| entity)
        .collect()
}

/// Like [`nearby`] but keeps each distance for display
pub fn nearby_with_distance<'a>(
    origin: Coordinate,
    entities: &'a [Entity],
    radius_km: f64,
) -> Vec<(&'a Entity, f64)> {
    entities
        .par_iter()
        .filter_map(|entity| {
            let d = haversine_km(origin, entity.coordinate);
            (d <= radius_km).then_some((entity, d))
        })
        .collect()
}
