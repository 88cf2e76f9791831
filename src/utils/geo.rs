const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two coordinates given in
/// degrees, using the haversine formula.
///
/// Latitudes outside ±90° are not validated and may yield NaN.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn distance_to(&self, lat: f64, lon: f64) -> f64 {
        distance(self.lat, self.lon, lat, lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance(40.7128, -74.0060, 40.7128, -74.0060), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let ab = distance(40.7128, -74.0060, 40.7589, -73.9851);
        let ba = distance(40.7589, -73.9851, 40.7128, -74.0060);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_nyc_reference_distances() {
        // Lower Manhattan to Midtown
        let short = distance(40.7128, -74.0060, 40.7589, -73.9851);
        // Lower Manhattan to Jamaica, Queens
        let long = distance(40.7128, -74.0060, 40.7282, -73.7949);

        assert!((short - 5.4).abs() < 0.5, "short leg was {short}");
        assert!(long > 17.0 && long < 19.0, "long leg was {long}");
        assert!(short < long);
    }

    #[test]
    fn test_short_pair_sorts_before_long_pair() {
        // Central Park to Lower Manhattan, ~8.5 km
        let short = distance(40.7829, -73.9654, 40.7128, -74.0060);
        // Times Square to St. George, Staten Island, ~24 km
        let long = distance(40.7580, -73.9855, 40.5795, -74.1502);

        assert!((short - 8.4).abs() < 0.3, "short pair was {short}");
        assert!((long - 24.0).abs() < 0.5, "long pair was {long}");
        assert!(short < long);
    }
}
