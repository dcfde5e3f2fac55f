use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};

use super::error::PredictError;
use super::geometry::{ecef_to_geodetic, look_angles, teme_to_ecef_position};
use super::julian::julian_date;
use super::observer::Observer;
use super::search::{find_pass, Look};
use super::types::{RawPass, TrackPoint};
use crate::elements::OrbitalElementSet;

/// Numeric orbit propagation, seen from a fixed observer.
pub trait Propagator: Send {
    fn position_at(
        &mut self,
        set: &OrbitalElementSet,
        observer: &Observer,
        t: DateTime<Utc>,
    ) -> Result<TrackPoint, PredictError>;

    /// First pass beginning after `from`, or `None` once `budget` search
    /// windows of about one revolution each are spent.
    fn next_pass(
        &mut self,
        set: &OrbitalElementSet,
        observer: &Observer,
        from: DateTime<Utc>,
        budget: u32,
    ) -> Result<Option<RawPass>, PredictError>;
}

struct Prepared {
    line1: String,
    line2: String,
    elements: Elements,
    constants: Constants,
}

/// SGP4 propagator. Keeps the parsed model for the last element set seen.
#[derive(Default)]
pub struct Sgp4Propagator {
    prepared: Option<Prepared>,
}

impl Sgp4Propagator {
    pub fn new() -> Self {
        Self::default()
    }

    fn prepare(&mut self, set: &OrbitalElementSet) -> Result<&Prepared, PredictError> {
        let reusable = matches!(
            &self.prepared,
            Some(p) if p.line1 == set.line1 && p.line2 == set.line2
        );
        if !reusable {
            let elements = Elements::from_tle(
                Some(set.name.clone()),
                set.line1.as_bytes(),
                set.line2.as_bytes(),
            )
            .map_err(|e| PredictError::Propagation(format!("invalid TLE: {e}")))?;
            let constants = Constants::from_elements(&elements)
                .map_err(|e| PredictError::Propagation(format!("invalid elements: {e}")))?;
            log::debug!("Prepared SGP4 model for {}", set.name);
            self.prepared = Some(Prepared {
                line1: set.line1.clone(),
                line2: set.line2.clone(),
                elements,
                constants,
            });
        }
        self.prepared
            .as_ref()
            .ok_or_else(|| PredictError::Propagation("model not prepared".into()))
    }
}

fn sample(
    prepared: &Prepared,
    observer: &Observer,
    timestamp: DateTime<Utc>,
) -> Result<TrackPoint, PredictError> {
    let minutes = prepared
        .elements
        .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
        .map_err(|e| PredictError::Propagation(e.to_string()))?;

    let prediction = prepared
        .constants
        .propagate(minutes)
        .map_err(|e| PredictError::Propagation(e.to_string()))?;

    let sidereal =
        sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&timestamp.naive_utc()));
    let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);

    let look = look_angles(observer, sat_ecef);
    let (latitude_deg, longitude_deg, altitude_km) = ecef_to_geodetic(sat_ecef);

    Ok(TrackPoint {
        timestamp,
        azimuth_deg: look.azimuth_deg,
        elevation_deg: look.elevation_deg,
        latitude_deg,
        longitude_deg,
        altitude_km,
        distance_km: look.range_km,
    })
}

impl Propagator for Sgp4Propagator {
    fn position_at(
        &mut self,
        set: &OrbitalElementSet,
        observer: &Observer,
        t: DateTime<Utc>,
    ) -> Result<TrackPoint, PredictError> {
        let prepared = self.prepare(set)?;
        sample(prepared, observer, t)
    }

    fn next_pass(
        &mut self,
        set: &OrbitalElementSet,
        observer: &Observer,
        from: DateTime<Utc>,
        budget: u32,
    ) -> Result<Option<RawPass>, PredictError> {
        let prepared = self.prepare(set)?;
        let window = find_pass(
            |t| {
                sample(prepared, observer, t).map(|p| Look {
                    azimuth_deg: p.azimuth_deg,
                    elevation_deg: p.elevation_deg,
                })
            },
            from,
            budget,
        )?;

        Ok(window.map(|w| RawPass {
            aos_jd: julian_date(w.aos),
            tca_jd: julian_date(w.tca),
            los_jd: julian_date(w.los),
            aos_azimuth_deg: w.aos_azimuth_deg,
            los_azimuth_deg: w.los_azimuth_deg,
            max_elevation_deg: w.max_elevation_deg,
            culmination_azimuth_deg: w.culmination_azimuth_deg,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::tle::fixtures::*;
    use crate::elements::tle::parse_epoch;
    use crate::predict::julian::julian_to_utc;
    use chrono::Duration;

    fn iss() -> OrbitalElementSet {
        OrbitalElementSet {
            catalog_id: 25544,
            name: ISS_NAME.into(),
            line1: ISS_LINE1.into(),
            line2: ISS_LINE2.into(),
            retrieved_at: parse_epoch(ISS_LINE1).unwrap(),
        }
    }

    fn observer() -> Observer {
        Observer {
            latitude_deg: 46.4666463,
            longitude_deg: 6.8615008,
            altitude_m: 500.0,
        }
    }

    #[test]
    fn position_is_a_plausible_leo_state() {
        let set = iss();
        let mut propagator = Sgp4Propagator::new();
        let t = set.retrieved_at + Duration::hours(3);
        let point = propagator.position_at(&set, &observer(), t).unwrap();

        assert_eq!(point.timestamp, t);
        assert!((300.0..450.0).contains(&point.altitude_km), "altitude {}", point.altitude_km);
        assert!(point.latitude_deg.abs() <= 52.0);
        assert!((-180.0..=180.0).contains(&point.longitude_deg));
        assert!((0.0..360.0).contains(&point.azimuth_deg));
        assert!(point.distance_km > point.altitude_km - 1.0);
    }

    #[test]
    fn next_pass_is_ordered_and_visible() {
        let set = iss();
        let obs = observer();
        let mut propagator = Sgp4Propagator::new();
        let from = set.retrieved_at + Duration::hours(1);

        let raw = propagator.next_pass(&set, &obs, from, 100).unwrap().unwrap();
        let aos = julian_to_utc(raw.aos_jd).unwrap();
        let tca = julian_to_utc(raw.tca_jd).unwrap();
        let los = julian_to_utc(raw.los_jd).unwrap();

        assert!(from < aos && aos < tca && tca < los);
        assert!(los - aos < Duration::minutes(15));
        assert!(raw.max_elevation_deg > 0.0 && raw.max_elevation_deg <= 90.0);

        let at_tca = propagator.position_at(&set, &obs, tca).unwrap();
        assert!(at_tca.elevation_deg > 0.0);
        let before = propagator.position_at(&set, &obs, aos - Duration::seconds(2)).unwrap();
        assert!(before.elevation_deg <= 0.0);
    }

    #[test]
    fn malformed_lines_are_a_propagation_error() {
        let mut set = iss();
        set.line2 = set.line2.replace("15.72125391", "15.7212539X");
        let mut propagator = Sgp4Propagator::new();
        assert!(matches!(
            propagator.position_at(&set, &observer(), set.retrieved_at),
            Err(PredictError::Propagation(_))
        ));
    }
}
