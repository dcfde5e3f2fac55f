use chrono::{DateTime, Duration, Utc};

use super::error::PredictError;

const HORIZON_ELEVATION: f64 = 0.0;
const MIN_SCAN_STEP_SECONDS: f64 = 30.0;
const MAX_SCAN_STEP_SECONDS: f64 = 600.0;
/// Scan seconds per degree below the horizon.
const SCAN_SECONDS_PER_DEGREE: f64 = 10.0;
const IN_PASS_STEP_SECONDS: i64 = 30;
const FINE_STEP_SECONDS: i64 = 1;
/// Longest pass walked before giving up (objects that never set).
const MAX_PASS_SECONDS: i64 = 12 * 3600;
const TCA_SEARCH_ROUNDS: usize = 40;
/// Scanned time bought by one unit of search budget, about one low-orbit
/// revolution. Refinement around a crossing is not charged.
const SEARCH_UNIT_SECONDS: i64 = 90 * 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Look {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassWindow {
    pub aos: DateTime<Utc>,
    pub tca: DateTime<Utc>,
    pub los: DateTime<Utc>,
    pub aos_azimuth_deg: f64,
    pub los_azimuth_deg: f64,
    pub max_elevation_deg: f64,
    pub culmination_azimuth_deg: f64,
}

fn scan_step(elevation_deg: f64) -> Duration {
    let seconds = (-elevation_deg * SCAN_SECONDS_PER_DEGREE)
        .clamp(MIN_SCAN_STEP_SECONDS, MAX_SCAN_STEP_SECONDS);
    Duration::seconds(seconds as i64)
}

fn above(look: &Look) -> bool {
    look.elevation_deg > HORIZON_ELEVATION
}

/// Finds the first complete pass starting after `from`, scanning at most
/// `budget` orbit-length windows ahead (skipping an ongoing pass counts
/// against it). `None` means the budget ran out.
pub fn find_pass<F>(
    mut look_at: F,
    from: DateTime<Utc>,
    budget: u32,
) -> Result<Option<PassWindow>, PredictError>
where
    F: FnMut(DateTime<Utc>) -> Result<Look, PredictError>,
{
    let limit = from + Duration::seconds(SEARCH_UNIT_SECONDS * i64::from(budget));
    let mut t = from;
    let mut current = look_at(t)?;

    while above(&current) {
        if t >= limit {
            return Ok(None);
        }
        t += Duration::seconds(IN_PASS_STEP_SECONDS);
        current = look_at(t)?;
    }

    let (aos, aos_look) = loop {
        if t >= limit {
            return Ok(None);
        }
        let next_t = t + scan_step(current.elevation_deg);
        let next = look_at(next_t)?;
        if above(&next) {
            break refine_crossing(&mut look_at, t, next_t, true)?;
        }
        t = next_t;
        current = next;
    };

    let mut peak_t = aos;
    let mut peak = aos_look;
    let mut t = aos;
    let (los, los_look) = loop {
        if t - aos > Duration::seconds(MAX_PASS_SECONDS) {
            log::debug!("Pass starting {} does not end within search limits", aos);
            return Ok(None);
        }
        let next_t = t + Duration::seconds(IN_PASS_STEP_SECONDS);
        let next = look_at(next_t)?;
        if !above(&next) {
            break refine_crossing(&mut look_at, t, next_t, false)?;
        }
        if next.elevation_deg > peak.elevation_deg {
            peak_t = next_t;
            peak = next;
        }
        t = next_t;
    };

    let (tca, culmination) = refine_culmination(&mut look_at, aos, los, peak_t)?;

    Ok(Some(PassWindow {
        aos,
        tca,
        los,
        aos_azimuth_deg: aos_look.azimuth_deg,
        los_azimuth_deg: los_look.azimuth_deg,
        max_elevation_deg: culmination.elevation_deg,
        culmination_azimuth_deg: culmination.azimuth_deg,
    }))
}

/// Bisects a horizon crossing between `before` and `after` to one second.
/// Returns the first sampled instant on the far side of the crossing.
fn refine_crossing<F>(
    look_at: &mut F,
    before: DateTime<Utc>,
    after: DateTime<Utc>,
    rising: bool,
) -> Result<(DateTime<Utc>, Look), PredictError>
where
    F: FnMut(DateTime<Utc>) -> Result<Look, PredictError>,
{
    let mut low = before;
    let mut high = after;

    while (high - low).num_seconds() > FINE_STEP_SECONDS {
        let mid = low + (high - low) / 2;
        let is_above = above(&look_at(mid)?);
        if is_above == rising {
            high = mid;
        } else {
            low = mid;
        }
    }

    Ok((high, look_at(high)?))
}

/// Ternary search for maximum elevation around the coarse peak, kept
/// strictly inside (aos, los) when the pass is long enough to allow it.
fn refine_culmination<F>(
    look_at: &mut F,
    aos: DateTime<Utc>,
    los: DateTime<Utc>,
    peak_t: DateTime<Utc>,
) -> Result<(DateTime<Utc>, Look), PredictError>
where
    F: FnMut(DateTime<Utc>) -> Result<Look, PredictError>,
{
    let window = Duration::seconds(IN_PASS_STEP_SECONDS);
    let mut lo = (peak_t - window).max(aos).timestamp_millis() as f64;
    let mut hi = (peak_t + window).min(los).timestamp_millis() as f64;

    let at = |ms: f64| DateTime::from_timestamp_millis(ms.round() as i64).unwrap_or(peak_t);
    for _ in 0..TCA_SEARCH_ROUNDS {
        if hi - lo < 500.0 {
            break;
        }
        let m1 = lo + (hi - lo) / 3.0;
        let m2 = hi - (hi - lo) / 3.0;
        if look_at(at(m1))?.elevation_deg < look_at(at(m2))?.elevation_deg {
            lo = m1;
        } else {
            hi = m2;
        }
    }

    let mut tca = DateTime::from_timestamp(((lo + hi) / 2000.0).round() as i64, 0).unwrap_or(peak_t);
    if los - aos >= Duration::seconds(2) {
        tca = tca
            .max(aos + Duration::seconds(1))
            .min(los - Duration::seconds(1));
    }
    Ok((tca, look_at(tca)?))
}
