use chrono::{DateTime, Utc};

/// Julian date of 1970-01-01T00:00:00Z.
pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;

pub fn julian_date(t: DateTime<Utc>) -> f64 {
    UNIX_EPOCH_JD + t.timestamp_millis() as f64 / 86_400_000.0
}

/// Converts a Julian date to UTC, rounded to the whole second.
pub fn julian_to_utc(jd: f64) -> Option<DateTime<Utc>> {
    if !jd.is_finite() {
        return None;
    }
    let seconds = ((jd - UNIX_EPOCH_JD) * 86_400.0).round();
    if seconds.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(seconds as i64, 0)
}

/// Greenwich mean sidereal time in radians.
pub fn gmst(t: DateTime<Utc>) -> f64 {
    let jd = julian_date(t);
    let ut = (jd + 0.5).fract();
    let jd0 = jd - ut;
    let tu = (jd0 - 2_451_545.0) / 36_525.0;
    let seconds = 24_110.548_41 + tu * (8_640_184.812_866 + tu * (0.093_104 - tu * 6.2e-6));
    let seconds = (seconds + 86_400.0 * 1.002_737_909_34 * ut).rem_euclid(86_400.0);
    std::f64::consts::TAU * seconds / 86_400.0
}
