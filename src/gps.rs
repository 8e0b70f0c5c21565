//! Module with GPS specific structures and geodesic math

/// Mean earth radius in meters, used by the haversine distance formula
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Stores a single geospatial point in WGS84 degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    /// latitude coordinate in degrees
    latitude: f64,
    /// longitude coordinate in degrees
    longitude: f64,
}

impl Coordinate {
    /// Create a coordinate from latitude and longitude in degrees
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
        }
    }

    /// Return latitude in degrees
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Return longitude in degrees
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Great circle distance between two coordinates in meters
///
/// Symmetric in its arguments and zero for identical points. The haversine
/// form stays well conditioned for nearly identical points, which is the
/// common case when matching successive GPS fixes against a route.
pub fn distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    // clamp guards rounding drift above 1.0 for near antipodal points
    let h = h.min(1.0);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Angle in degrees between the north axis and the line from `a` to `b`
///
/// Returns a value in `[0, 360)` measured counterclockwise from north, so a
/// point due north yields 0, due south 180 and due east 270. Identical
/// points yield 0 rather than NaN.
pub fn bearing(a: &Coordinate, b: &Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let y = d_lon.sin() * lat_b.cos();
    let x = lat_a.cos() * lat_b.sin() - lat_a.sin() * lat_b.cos() * d_lon.cos();
    // atan2 gives the clockwise compass angle, flip it to match the
    // north-axis convention used by the rest of the pipeline
    let clockwise = y.atan2(x).to_degrees();
    (360.0 - clockwise).rem_euclid(360.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric() {
        let a = Coordinate::new(35.69982, 51.341621);
        let b = Coordinate::new(35.69982, 51.34590);
        assert!((distance(&a, &b) - distance(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn distance_of_identical_points_is_zero() {
        let a = Coordinate::new(35.69982, 51.341621);
        assert_eq!(distance(&a, &a), 0.0);
    }

    #[test]
    fn distance_of_nearby_points_is_reasonable() {
        // roughly 387m apart along a parallel in Tehran
        let a = Coordinate::new(35.69982, 51.341621);
        let b = Coordinate::new(35.69982, 51.34590);
        let d = distance(&a, &b);
        assert!(d > 380.0 && d < 395.0, "got {}", d);
    }

    #[test]
    fn bearing_matches_cardinal_directions() {
        let point = Coordinate::new(35.70, 51.40);
        let north = bearing(&point, &Coordinate::new(35.71, 51.40));
        let south = bearing(&point, &Coordinate::new(35.69, 51.40));
        let east = bearing(&point, &Coordinate::new(35.70, 51.41));
        let west = bearing(&point, &Coordinate::new(35.70, 51.39));

        assert!(north < 1.0 || north > 359.0, "north: {}", north);
        assert!((south - 180.0).abs() < 1.0, "south: {}", south);
        assert!((east - 270.0).abs() < 1.0, "east: {}", east);
        assert!((west - 90.0).abs() < 1.0, "west: {}", west);
    }

    #[test]
    fn bearing_is_always_in_range() {
        let a = Coordinate::new(35.70, 51.40);
        for (lat, lon) in &[(36.0, 51.0), (35.0, 52.0), (34.9, 50.8), (35.7, 51.4)] {
            let angle = bearing(&a, &Coordinate::new(*lat, *lon));
            assert!((0.0..360.0).contains(&angle), "angle: {}", angle);
        }
    }

    #[test]
    fn bearing_of_identical_points_is_zero() {
        let a = Coordinate::new(35.70, 51.40);
        assert_eq!(bearing(&a, &a), 0.0);
    }
}
