use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use strum_macros::Display;
use utoipa::ToSchema;

/// Observer-relative and geodetic position of the tracked object at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct TrackPoint {
    pub timestamp: DateTime<Utc>,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
    pub distance_km: f64,
}

/// Pass as reported by a propagator, times as Julian dates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPass {
    pub aos_jd: f64,
    pub tca_jd: f64,
    pub los_jd: f64,
    pub aos_azimuth_deg: f64,
    pub los_azimuth_deg: f64,
    pub max_elevation_deg: f64,
    pub culmination_azimuth_deg: f64,
}

/// A visibility window above the observer's horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct PassEvent {
    pub aos: DateTime<Utc>,
    pub tca: DateTime<Utc>,
    pub los: DateTime<Utc>,
    pub aos_azimuth_deg: f64,
    pub los_azimuth_deg: f64,
    pub max_elevation_deg: f64,
    pub culmination_azimuth_deg: f64,
    pub orbit_number_at_aos: Option<u64>,
}

impl PassEvent {
    pub fn duration(&self) -> Duration {
        self.los - self.aos
    }

    /// Duration split into whole minutes and remaining seconds.
    pub fn duration_min_sec(&self) -> (i64, i64) {
        let secs = self.duration().num_seconds();
        (secs / 60, secs % 60)
    }

    pub fn is_in_progress(&self, now: DateTime<Utc>) -> bool {
        self.aos <= now && now < self.los
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema, Display)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    BelowHorizon,
    AboveHorizon,
}
