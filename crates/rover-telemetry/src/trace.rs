use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

/// Path driven so far. A point is only appended when it differs from the
/// last one, so a parked vehicle does not grow the trace.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryTrace {
    points: Vec<Point>,
}

impl TrajectoryTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `p` was appended.
    pub fn push(&mut self, p: Point) -> bool {
        if self.points.last() == Some(&p) {
            return false;
        }
        self.points.push(p);
        true
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Driven distance along the trace in meters.
    pub fn length_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| haversine_m(w[0].lat, w[0].lon, w[1].lat, w[1].lon))
            .sum()
    }
}

fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let r = 6_371_000.0_f64;
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat/2.0).sin().powi(2) + lat1.to_radians().cos()*lat2.to_radians().cos()*(dlon/2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0-a).sqrt());
    r * c
}
