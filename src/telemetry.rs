use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use utoipa::ToSchema;

use crate::display::{clock, PageId};
use crate::predict::{PassEvent, Visibility};
use crate::tracker::TrackingContext;

const RECORD_BUFFER: usize = 16;

/// Flat once-a-second record for external subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub sat_name: String,
    /// Observer local time, `HH:MM:SS`.
    pub time: String,
    pub altitude: f64,
    pub azimuth: f64,
    pub elevation: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub distance: f64,
    pub sun_azimuth: f64,
    pub sun_elevation: f64,
}

impl TelemetryRecord {
    pub fn from_context(ctx: &TrackingContext) -> Option<Self> {
        let track = ctx.track?;
        let sun = ctx.sun.unwrap_or_default();
        Some(Self {
            sat_name: ctx.elements.name.clone(),
            time: clock(&ctx.local_now()),
            altitude: track.altitude_km,
            azimuth: track.azimuth_deg,
            elevation: track.elevation_deg,
            latitude: track.latitude_deg,
            longitude: track.longitude_deg,
            distance: track.distance_km,
            sun_azimuth: sun.azimuth_deg,
            sun_elevation: sun.elevation_deg,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ElementSummary {
    pub catalog_id: u32,
    pub name: String,
    pub epoch: DateTime<Utc>,
    pub retrieved_at: DateTime<Utc>,
    /// Cumulative `H:MM` since epoch.
    pub age: String,
}

/// Tracker state as the web surface reports it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusSnapshot {
    pub updated_at: Option<DateTime<Utc>>,
    pub elements: Option<ElementSummary>,
    pub visibility: Visibility,
    pub orbit_number: Option<u64>,
    pub next_pass: Option<PassEvent>,
    pub active_page: PageId,
    pub alert_enabled: bool,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            updated_at: None,
            elements: None,
            visibility: Visibility::BelowHorizon,
            orbit_number: None,
            next_pass: None,
            active_page: PageId::Main,
            alert_enabled: false,
        }
    }
}

impl StatusSnapshot {
    pub fn from_context(ctx: &TrackingContext, active_page: PageId, alert_enabled: bool) -> Self {
        Self {
            updated_at: Some(ctx.now),
            elements: Some(ElementSummary {
                catalog_id: ctx.elements.catalog_id,
                name: ctx.elements.name.clone(),
                epoch: ctx.fields.epoch,
                retrieved_at: ctx.elements.retrieved_at,
                age: ctx.element_age().hours_minutes(),
            }),
            visibility: ctx.visibility,
            orbit_number: ctx.orbit_number,
            next_pass: ctx.next_pass,
            active_page,
            alert_enabled,
        }
    }
}

/// Receiving ends handed to the web surface.
#[derive(Clone)]
pub struct TelemetryHandle {
    pub records: broadcast::Sender<TelemetryRecord>,
    pub latest: watch::Receiver<Option<TelemetryRecord>>,
    pub status: watch::Receiver<StatusSnapshot>,
}

/// Fan-out of telemetry and status from the control loop.
pub struct TelemetryHub {
    records: broadcast::Sender<TelemetryRecord>,
    latest: watch::Sender<Option<TelemetryRecord>>,
    status: watch::Sender<StatusSnapshot>,
    last_second: Option<i64>,
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryHub {
    pub fn new() -> Self {
        let (records, _) = broadcast::channel(RECORD_BUFFER);
        let (latest, _) = watch::channel(None);
        let (status, _) = watch::channel(StatusSnapshot::default());
        Self {
            records,
            latest,
            status,
            last_second: None,
        }
    }

    pub fn handle(&self) -> TelemetryHandle {
        TelemetryHandle {
            records: self.records.clone(),
            latest: self.latest.subscribe(),
            status: self.status.subscribe(),
        }
    }

    /// Emits a record at most once per wall-clock second. Returns whether one
    /// went out.
    pub fn publish(&mut self, ctx: &TrackingContext) -> bool {
        let second = ctx.now.timestamp();
        if self.last_second == Some(second) {
            return false;
        }
        let Some(record) = TelemetryRecord::from_context(ctx) else {
            return false;
        };
        self.last_second = Some(second);
        // no subscribers is fine
        let listeners = self.records.send(record.clone()).unwrap_or(0);
        log::trace!("Telemetry at {} to {} listeners", record.time, listeners);
        self.latest.send_replace(Some(record));
        true
    }

    pub fn update_status(&self, snapshot: StatusSnapshot) {
        self.status.send_replace(snapshot);
    }
}
