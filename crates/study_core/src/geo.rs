use crate::schema::{StoredLocation, StudyLocation};
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_M: f64 = 6_371_008.8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_m(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

/// Map center used when no position is known: Imperial College London.
pub const DEFAULT_CENTER: Coordinate = Coordinate::new(51.4988, -0.1749);

impl StudyLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Records within `radius_m` of `center`, nearest first.
pub fn nearby<'a>(
    records: &'a [StoredLocation],
    center: &Coordinate,
    radius_m: f64,
) -> Vec<(&'a StoredLocation, f64)> {
    let mut hits: Vec<_> = records
        .iter()
        .map(|record| (record, center.distance_m(&record.location.coordinate())))
        .filter(|(_, distance)| *distance <= radius_m)
        .collect();
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}
