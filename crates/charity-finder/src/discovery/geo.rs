use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers.
///
/// Inputs are degrees; range checking is the caller's job (see [`Coordinates::new`]).
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1.0 for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("missing {0} coordinate")]
    Missing(&'static str),
    #[error("{0} must be a number")]
    NotNumeric(&'static str),
    #[error("latitude must be between -90 and 90 (got {0})")]
    LatitudeOutOfRange(f64),
    #[error("longitude must be between -180 and 180 (got {0})")]
    LongitudeOutOfRange(f64),
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() {
            return Err(CoordinateError::NotNumeric("latitude"));
        }
        if !longitude.is_finite() {
            return Err(CoordinateError::NotNumeric("longitude"));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parses raw query-string values such as `?lat=40.0&lon=-73.9`.
    pub fn parse(latitude: Option<&str>, longitude: Option<&str>) -> Result<Self, CoordinateError> {
        let latitude = parse_component(latitude, "latitude")?;
        let longitude = parse_component(longitude, "longitude")?;
        Self::new(latitude, longitude)
    }

    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        distance_km(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

fn parse_component(raw: Option<&str>, name: &'static str) -> Result<f64, CoordinateError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(CoordinateError::Missing(name))?;
    raw.parse::<f64>()
        .map_err(|_| CoordinateError::NotNumeric(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEW_YORK: (f64, f64) = (40.7128, -74.0060);
    const LONDON: (f64, f64) = (51.5074, -0.1278);

    #[test]
    fn distance_to_self_is_zero() {
        for (lat, lon) in [NEW_YORK, LONDON, (0.0, 0.0), (-89.9, 179.9)] {
            assert_eq!(distance_km(lat, lon, lat, lon), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let there = distance_km(NEW_YORK.0, NEW_YORK.1, LONDON.0, LONDON.1);
        let back = distance_km(LONDON.0, LONDON.1, NEW_YORK.0, NEW_YORK.1);
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn matches_known_city_distance() {
        let km = distance_km(NEW_YORK.0, NEW_YORK.1, LONDON.0, LONDON.1);
        assert!((km - 5570.2).abs() < 5.0, "unexpected distance {km}");
    }

    #[test]
    fn antipodal_points_stay_finite() {
        let km = distance_km(0.0, 0.0, 0.0, 180.0);
        assert!((km - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let km = distance_km(40.0, -73.9, 41.0, -73.9);
        assert!((km - 111.19).abs() < 0.1);
    }

    #[test]
    fn parse_rejects_missing_and_non_numeric_values() {
        assert_eq!(
            Coordinates::parse(None, Some("-73.9")),
            Err(CoordinateError::Missing("latitude"))
        );
        assert_eq!(
            Coordinates::parse(Some("40.0"), Some("  ")),
            Err(CoordinateError::Missing("longitude"))
        );
        assert_eq!(
            Coordinates::parse(Some("north"), Some("-73.9")),
            Err(CoordinateError::NotNumeric("latitude"))
        );
        assert_eq!(
            Coordinates::parse(Some("40.0"), Some("NaN")),
            Err(CoordinateError::NotNumeric("longitude"))
        );
    }

    #[test]
    fn parse_enforces_ranges() {
        assert!(matches!(
            Coordinates::parse(Some("91"), Some("0")),
            Err(CoordinateError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            Coordinates::parse(Some("0"), Some("-180.5")),
            Err(CoordinateError::LongitudeOutOfRange(_))
        ));
        let point = Coordinates::parse(Some(" 40.0 "), Some("-73.9")).expect("valid point");
        assert_eq!(point.latitude, 40.0);
        assert_eq!(point.longitude, -73.9);
    }
}
