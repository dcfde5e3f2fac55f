use chrono::{DateTime, Utc};

use super::error::PredictError;
use crate::elements::TleFields;

/// Revolution number at `t`: the count at epoch plus every orbit started
/// since, rounded up.
pub fn orbit_number(fields: &TleFields, t: DateTime<Utc>) -> Result<u64, PredictError> {
    if t <= fields.epoch {
        return Err(PredictError::OrbitOrdering {
            t,
            epoch: fields.epoch,
        });
    }
    let elapsed_days = (t - fields.epoch).num_milliseconds() as f64 / 86_400_000.0;
    let elapsed_orbits = (fields.mean_motion * elapsed_days).ceil();
    Ok(fields.revolution_number + elapsed_orbits as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::tle::{fixtures::*, parse_fields};
    use chrono::Duration;

    #[test]
    fn counts_orbits_since_epoch() {
        let fields = parse_fields(ISS_LINE1, ISS_LINE2).unwrap();
        // 15.72 rev/day: one day later is 16 started orbits
        let n = orbit_number(&fields, fields.epoch + Duration::days(1)).unwrap();
        assert_eq!(n, 56353 + 16);
        let just_after = orbit_number(&fields, fields.epoch + Duration::seconds(1)).unwrap();
        assert_eq!(just_after, 56354);
    }

    #[test]
    fn monotonic_in_time() {
        let fields = parse_fields(ISS_LINE1, ISS_LINE2).unwrap();
        let mut last = 0;
        for minutes in (1..5_000).step_by(37) {
            let n = orbit_number(&fields, fields.epoch + Duration::minutes(minutes)).unwrap();
            assert!(n >= last);
            last = n;
        }
    }

    #[test]
    fn epoch_or_earlier_is_an_ordering_error() {
        let fields = parse_fields(ISS_LINE1, ISS_LINE2).unwrap();
        assert!(matches!(
            orbit_number(&fields, fields.epoch),
            Err(PredictError::OrbitOrdering { .. })
        ));
        assert!(orbit_number(&fields, fields.epoch - Duration::hours(3)).is_err());
    }
}
