//! Supported-region check.
//!
//! The forecast grid covers The Netherlands and its surroundings. The grid
//! itself is not rectangular in lat/lon, so the box below is the enclosing
//! rectangle of its corners; anything outside it has no forecast.

/// A half-open latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Region covered by the forecast grid.
pub const NETHERLANDS: BoundingBox = BoundingBox {
    min_lat: 48.895301818847656,
    max_lat: 55.973602294921875,
    min_lon: 0.0,
    max_lon: 10.856452941894531,
};

impl BoundingBox {
    /// `min <= value < max` on both axes. Non-finite input is never inside.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat.is_finite()
            && lon.is_finite()
            && lat >= self.min_lat
            && lat < self.max_lat
            && lon >= self.min_lon
            && lon < self.max_lon
    }
}

/// Whether `(lat, lon)` is inside the supported region.
pub fn within_bounds(lat: f64, lon: f64) -> bool {
    NETHERLANDS.contains(lat, lon)
}
