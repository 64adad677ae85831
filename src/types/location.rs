use std::fmt;

/// A geographic query point: latitude and longitude in degrees plus
/// elevation in meters. A NaN elevation tells the server to estimate the
/// elevation itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub elevation_m: f64,
}

impl Location {
    pub fn new(latitude_deg: f64, longitude_deg: f64, elevation_m: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            elevation_m,
        }
    }

    /// A location with a server-estimated elevation.
    pub fn without_elevation(latitude_deg: f64, longitude_deg: f64) -> Self {
        Self::new(latitude_deg, longitude_deg, f64::NAN)
    }

    /// Elevation token as it goes on the wire.
    pub(crate) fn elevation_token(&self) -> String {
        if self.elevation_m.is_nan() {
            "NaN".to_string()
        } else {
            format!("{}", self.elevation_m)
        }
    }

    pub fn approx_eq(&self, other: &Location) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() < 1e-8 || (a.is_nan() && b.is_nan());
        close(self.latitude_deg, other.latitude_deg)
            && close(self.longitude_deg, other.longitude_deg)
            && close(self.elevation_m, other.elevation_m)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.latitude_deg, self.longitude_deg, self.elevation_m
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevation_token_handles_nan() {
        assert_eq!(Location::new(46.0, -74.0, 300.0).elevation_token(), "300");
        assert_eq!(
            Location::without_elevation(46.0, -74.0).elevation_token(),
            "NaN"
        );
    }

    #[test]
    fn approx_eq_tolerates_nan_elevation() {
        let a = Location::without_elevation(46.0, -74.0);
        let b = Location::without_elevation(46.0, -74.0);
        assert!(a.approx_eq(&b));
        assert!(!a.approx_eq(&Location::new(46.0, -74.0, 10.0)));
    }
}
