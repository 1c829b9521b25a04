//! Geospatial filters over the company directory.

mod containment;
mod proximity;

pub use containment::{contains_point, within, within_region};
pub use proximity::{haversine_km, nearby, nearby_with_distance, EARTH_RADIUS_KM};

/// Radius of the "nearby companies" search
pub const DEFAULT_RADIUS_KM: f64 = 5.0;
