use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::julian::{gmst, julian_date};
use super::observer::Observer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct SunPosition {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

/// Low-precision solar ephemeris (about 0.01 degree over a few decades
/// around J2000), topocentric refraction ignored.
pub fn sun_position(observer: &Observer, t: DateTime<Utc>) -> SunPosition {
    let n = julian_date(t) - 2_451_545.0;
    let mean_longitude = (280.460 + 0.985_647_4 * n).rem_euclid(360.0);
    let mean_anomaly = (357.528 + 0.985_600_3 * n).rem_euclid(360.0).to_radians();
    let ecliptic_longitude = (mean_longitude
        + 1.915 * mean_anomaly.sin()
        + 0.020 * (2.0 * mean_anomaly).sin())
    .to_radians();
    let obliquity = (23.439 - 0.000_000_4 * n).to_radians();

    let right_ascension = (obliquity.cos() * ecliptic_longitude.sin()).atan2(ecliptic_longitude.cos());
    let declination = (obliquity.sin() * ecliptic_longitude.sin()).asin();

    let hour_angle = gmst(t) + observer.lon_rad() - right_ascension;
    let lat = observer.lat_rad();

    let elevation = (lat.sin() * declination.sin()
        + lat.cos() * declination.cos() * hour_angle.cos())
    .asin();
    let azimuth = (-hour_angle.sin())
        .atan2(declination.tan() * lat.cos() - lat.sin() * hour_angle.cos());

    SunPosition {
        azimuth_deg: azimuth.to_degrees().rem_euclid(360.0),
        elevation_deg: elevation.to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn equinox_noon_on_equator_is_near_zenith() {
        let t = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let sun = sun_position(&Observer::default(), t);
        assert!(sun.elevation_deg > 85.0, "elevation {}", sun.elevation_deg);
    }

    #[test]
    fn midnight_is_below_horizon() {
        let t = Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap();
        let sun = sun_position(&Observer::default(), t);
        assert!(sun.elevation_deg < -80.0);
    }

    #[test]
    fn morning_sun_is_in_the_east() {
        let obs = Observer {
            latitude_deg: 46.47,
            longitude_deg: 6.86,
            altitude_m: 500.0,
        };
        // 06:00 UTC in June, shortly after sunrise over Switzerland
        let t = Utc.with_ymd_and_hms(2024, 6, 21, 6, 0, 0).unwrap();
        let sun = sun_position(&obs, t);
        assert!(sun.elevation_deg > 0.0);
        assert!((45.0..=120.0).contains(&sun.azimuth_deg), "azimuth {}", sun.azimuth_deg);
    }
}
