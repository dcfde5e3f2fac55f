use chrono::{DateTime, Duration, FixedOffset, Utc};
use std::sync::mpsc::Receiver;

use super::alarm::{Alarm, CLICK, PASS_ALERT};
use super::context::TrackingContext;
use super::error::TrackerError;
use crate::clock::Clock;
use crate::display::{
    ControllerAction, DisplayPageController, FieldRegistry, InputEvent, PageView, Pages, Surface,
};
use crate::elements::ElementSetCache;
use crate::predict::{PassScheduler, TickOutcome};
use crate::storage::PersistentStore;
use crate::telemetry::{StatusSnapshot, TelemetryHub};

pub const ALERT_SETTING_KEY: &str = "display.alert_enabled";

/// Wait before asking for elements again after the retries ran out.
const ELEMENT_RECHECK_MINUTES: i64 = 5;

/// Collaborators the control loop is assembled from.
pub struct TrackerParts {
    pub catalog_id: u32,
    pub utc_offset: FixedOffset,
    pub tick: std::time::Duration,
    pub cache: ElementSetCache,
    pub scheduler: PassScheduler,
    pub clock: Box<dyn Clock>,
    pub controller: DisplayPageController,
    pub pages: Pages,
    pub surface: Box<dyn Surface>,
    pub alarm: Box<dyn Alarm>,
    pub settings: Box<dyn PersistentStore>,
    pub input: Receiver<InputEvent>,
    pub telemetry: TelemetryHub,
}

/// Reads the operator's alert toggle, falling back to `default`.
pub fn load_alert_setting(store: &dyn PersistentStore, default: bool) -> bool {
    match store.get(ALERT_SETTING_KEY) {
        Ok(Some(value)) => value.trim().parse().unwrap_or(default),
        Ok(None) => default,
        Err(e) => {
            log::warn!("Failed to read alert setting: {}", e);
            default
        }
    }
}

/// The single control loop: elements, prediction, input, rendering and
/// telemetry all advance here, one phase after the other.
pub struct Tracker {
    catalog_id: u32,
    tick: std::time::Duration,
    cache: ElementSetCache,
    scheduler: PassScheduler,
    clock: Box<dyn Clock>,
    controller: DisplayPageController,
    pages: Pages,
    fields: FieldRegistry,
    surface: Box<dyn Surface>,
    alarm: Box<dyn Alarm>,
    settings: Box<dyn PersistentStore>,
    input: Receiver<InputEvent>,
    telemetry: TelemetryHub,
    ctx: TrackingContext,
    started: DateTime<Utc>,
    element_recheck_at: Option<DateTime<Utc>>,
    tick_failing: bool,
}

impl Tracker {
    pub fn start(parts: TrackerParts) -> Result<Self, TrackerError> {
        let TrackerParts {
            catalog_id,
            utc_offset,
            tick,
            mut cache,
            scheduler,
            clock,
            controller,
            pages,
            surface,
            alarm,
            settings,
            input,
            telemetry,
        } = parts;

        let now = clock.now()?;
        let (elements, element_recheck_at) = match cache.get(catalog_id, now).cloned() {
            Ok(set) => (set, None),
            Err(e) => match cache.stale_fallback(catalog_id) {
                Some(stale) => {
                    log::warn!(
                        "{}; starting with stale elements retrieved {}",
                        e,
                        stale.retrieved_at
                    );
                    let recheck = now + Duration::minutes(ELEMENT_RECHECK_MINUTES);
                    (stale.clone(), Some(recheck))
                }
                None => return Err(e.into()),
            },
        };
        let ctx = TrackingContext::new(elements, now, utc_offset)?;
        log::info!(
            "Tracking {} ({}), elements epoch {}, age {}",
            ctx.elements.name,
            catalog_id,
            ctx.fields.epoch,
            ctx.element_age().hours_minutes()
        );

        Ok(Self {
            catalog_id,
            tick,
            cache,
            scheduler,
            clock,
            controller,
            pages,
            fields: FieldRegistry::new(),
            surface,
            alarm,
            settings,
            input,
            telemetry,
            ctx,
            started: now,
            element_recheck_at,
            tick_failing: false,
        })
    }

    #[cfg(test)]
    pub fn context(&self) -> &TrackingContext {
        &self.ctx
    }

    #[cfg(test)]
    pub fn controller(&self) -> &DisplayPageController {
        &self.controller
    }

    pub fn run(mut self) -> Result<(), TrackerError> {
        loop {
            self.step()?;
            std::thread::sleep(self.tick);
        }
    }

    /// One pass through every phase of the loop.
    pub fn step(&mut self) -> Result<(), TrackerError> {
        let now = self.clock.now()?;
        let now_ms = (now - self.started).num_milliseconds().max(0) as u64;
        self.ctx.now = now;

        self.refresh_elements(now)?;
        let outcome = self.advance_prediction();

        if outcome.rose {
            self.fields.reset_live_tracking();
        }
        if outcome.rose || outcome.set || outcome.pass_updated {
            self.controller.request_refresh();
        }
        if outcome.alert_due {
            if self.controller.alert_enabled() {
                self.alarm.sound(&PASS_ALERT);
            } else {
                log::debug!("Pass alert due but muted");
            }
        }

        self.drain_input(now_ms);
        self.render(now_ms);

        if self.telemetry.publish(&self.ctx) {
            self.telemetry.update_status(StatusSnapshot::from_context(
                &self.ctx,
                self.controller.active_page(),
                self.controller.alert_enabled(),
            ));
        }
        Ok(())
    }

    fn refresh_elements(&mut self, now: DateTime<Utc>) -> Result<(), TrackerError> {
        if self.element_recheck_at.is_some_and(|at| now < at) {
            return Ok(());
        }
        match self.cache.get(self.catalog_id, now).cloned() {
            Ok(set) => {
                self.element_recheck_at = None;
                if self.ctx.replace_elements(&set)? {
                    self.controller.request_refresh();
                }
                Ok(())
            }
            Err(e) if self.cache.stale_fallback(self.catalog_id).is_some() => {
                log::warn!(
                    "{}; keeping stale elements, next attempt in {} min",
                    e,
                    ELEMENT_RECHECK_MINUTES
                );
                self.element_recheck_at = Some(now + Duration::minutes(ELEMENT_RECHECK_MINUTES));
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn advance_prediction(&mut self) -> TickOutcome {
        match self.scheduler.tick(&mut self.ctx) {
            Ok(outcome) => {
                if self.tick_failing {
                    log::info!("Tracking recovered");
                    self.tick_failing = false;
                }
                outcome
            }
            Err(e) => {
                if !self.tick_failing {
                    log::error!("Tracking update failed: {}", e);
                    self.tick_failing = true;
                }
                TickOutcome::default()
            }
        }
    }

    fn drain_input(&mut self, now_ms: u64) {
        while let Ok(event) = self.input.try_recv() {
            match self.controller.handle_input(event, now_ms) {
                Some(ControllerAction::AlertToggled(enabled)) => {
                    self.alarm.sound(&CLICK);
                    if let Err(e) = self.settings.set(ALERT_SETTING_KEY, &enabled.to_string()) {
                        log::warn!("Failed to save alert setting: {}", e);
                    }
                }
                Some(ControllerAction::PageChanged { .. }) | None => {}
            }
        }
    }

    fn render(&mut self, now_ms: u64) {
        let Some(request) = self.controller.poll(now_ms) else {
            return;
        };
        let mut view = PageView {
            ctx: &self.ctx,
            scheduler: &mut self.scheduler,
            fields: &mut self.fields,
            alert_enabled: self.controller.alert_enabled(),
        };
        let ops = self.pages.render(request, &mut view);
        log::trace!("{} page: {} draw ops", request.page, ops.len());
        self.surface.apply(&ops);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, Sender};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::DisplayConfig;
    use crate::display::{DrawOp, PageId, RecordingSurface};
    use crate::elements::fakes::ScriptedFetcher;
    use crate::predict::fakes::ScriptedPropagator;
    use crate::predict::{Observer, SearchPolicy};
    use crate::retry::RetryPolicy;
    use crate::storage::{MemoryStore, StoreError};
    use crate::tracker::alarm::RecordingAlarm;
    use crate::tracker::context::fixtures::iss_set;
    use chrono::TimeZone;

    #[derive(Clone, Default)]
    struct SharedStore(Arc<Mutex<MemoryStore>>);

    impl PersistentStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.0.lock().unwrap().get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.0.lock().unwrap().set(key, value)
        }
    }

    struct Harness {
        clock: ManualClock,
        fetcher: ScriptedFetcher,
        propagator: ScriptedPropagator,
        surface: RecordingSurface,
        alarm: RecordingAlarm,
        settings: SharedStore,
        input: Sender<InputEvent>,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2008, 9, 21, 18, 0, 0).unwrap()
    }

    fn build(catalog_id: u32, element_store: MemoryStore, lead_s: i64) -> (Harness, TrackerParts) {
        let clock = ManualClock::new(t0());
        let fetcher = ScriptedFetcher::default();
        let propagator = ScriptedPropagator::default();
        propagator.set_elevation(-20.0);
        let surface = RecordingSurface::default();
        let alarm = RecordingAlarm::default();
        let settings = SharedStore::default();
        let (tx, rx) = mpsc::channel();

        let parts = TrackerParts {
            catalog_id,
            utc_offset: FixedOffset::east_opt(3600).unwrap(),
            tick: std::time::Duration::from_millis(100),
            cache: ElementSetCache::new(
                Box::new(fetcher.clone()),
                Box::new(element_store),
                std::time::Duration::from_secs(3600),
                RetryPolicy::new(2, std::time::Duration::ZERO),
            ),
            scheduler: PassScheduler::new(
                Box::new(propagator.clone()),
                Observer::default(),
                SearchPolicy::default(),
                lead_s,
            ),
            clock: Box::new(clock.clone()),
            controller: DisplayPageController::from_config(&DisplayConfig::default(), true),
            pages: Pages::new(12),
            surface: Box::new(surface.clone()),
            alarm: Box::new(alarm.clone()),
            settings: Box::new(settings.clone()),
            input: rx,
            telemetry: TelemetryHub::new(),
        };
        let harness = Harness {
            clock,
            fetcher,
            propagator,
            surface,
            alarm,
            settings,
            input: tx,
        };
        (harness, parts)
    }

    fn stored_elements() -> MemoryStore {
        let mut store = MemoryStore::default();
        let set = iss_set();
        store
            .set("elements", &serde_yaml::to_string(&set).unwrap())
            .unwrap();
        store
    }

    #[test]
    fn first_step_fetches_and_draws_the_main_page() {
        let (h, parts) = build(25544, MemoryStore::default(), 0);
        let mut tracker = Tracker::start(parts).unwrap();
        assert_eq!(h.fetcher.call_count(), 1);

        tracker.step().unwrap();
        let ops = h.surface.take();
        assert!(matches!(ops[0], DrawOp::ClearScreen { .. }));
        assert_eq!(tracker.controller().active_page(), PageId::Main);
        assert!(tracker.context().track.is_some());

        // 100 ms later nothing on the main page is due
        h.clock.advance(Duration::milliseconds(100));
        tracker.step().unwrap();
        assert!(h.surface.take().is_empty());
    }

    #[test]
    fn advance_moves_to_the_next_page_with_a_full_redraw() {
        let (h, parts) = build(25544, MemoryStore::default(), 0);
        let mut tracker = Tracker::start(parts).unwrap();
        tracker.step().unwrap();
        h.surface.take();

        h.input.send(InputEvent::Advance).unwrap();
        h.input.send(InputEvent::Advance).unwrap();
        h.clock.advance(Duration::milliseconds(100));
        tracker.step().unwrap();

        assert_eq!(tracker.controller().active_page(), PageId::AzElPlot);
        let ops = h.surface.take();
        assert!(matches!(ops[0], DrawOp::ClearScreen { .. }));
    }

    #[test]
    fn alert_toggle_is_saved_and_clicks() {
        let (h, parts) = build(25544, MemoryStore::default(), 15);
        let mut tracker = Tracker::start(parts).unwrap();
        tracker.step().unwrap();

        h.input.send(InputEvent::ToggleAlert).unwrap();
        h.clock.advance(Duration::milliseconds(100));
        tracker.step().unwrap();

        assert!(!tracker.controller().alert_enabled());
        assert_eq!(
            h.settings.get(ALERT_SETTING_KEY).unwrap().as_deref(),
            Some("false")
        );
        assert_eq!(h.alarm.patterns.lock().unwrap().as_slice(), &[CLICK.to_vec()]);
        assert!(!load_alert_setting(&h.settings, true));
    }

    #[test]
    fn pass_alert_sounds_once_when_enabled() {
        let (h, parts) = build(25544, MemoryStore::default(), 15);
        let aos = t0() + Duration::minutes(20);
        h.propagator
            .push_pass(aos, aos + Duration::minutes(5), aos + Duration::minutes(10));
        let mut tracker = Tracker::start(parts).unwrap();
        tracker.step().unwrap();
        assert!(tracker.context().next_pass.is_some());

        for s in [16, 15, 14] {
            let target = aos - Duration::seconds(s);
            let now = tracker.context().now;
            h.clock.advance(target - now);
            tracker.step().unwrap();
        }
        assert_eq!(h.alarm.patterns.lock().unwrap().as_slice(), &[PASS_ALERT.to_vec()]);
    }

    #[test]
    fn stale_elements_keep_the_loop_running() {
        let (h, parts) = build(25544, stored_elements(), 0);
        h.fetcher.fail_next(10);
        let mut tracker = Tracker::start(parts).unwrap();
        assert_eq!(h.fetcher.call_count(), 2);
        assert_eq!(tracker.context().elements, iss_set());

        // within the recheck window nothing is fetched
        tracker.step().unwrap();
        h.clock.advance(Duration::minutes(1));
        tracker.step().unwrap();
        assert_eq!(h.fetcher.call_count(), 2);

        h.clock.advance(Duration::minutes(5));
        tracker.step().unwrap();
        assert_eq!(h.fetcher.call_count(), 4);
        assert_eq!(tracker.context().elements_revision, 0);

        h.fetcher.fail_next(0);
        h.clock.advance(Duration::minutes(6));
        tracker.step().unwrap();
        assert_eq!(h.fetcher.call_count(), 5);
        assert_eq!(tracker.context().elements_revision, 1);
    }

    #[test]
    fn unreachable_elements_without_fallback_are_fatal() {
        let (_h, parts) = build(99999, MemoryStore::default(), 0);
        assert!(matches!(
            Tracker::start(parts),
            Err(TrackerError::Elements(_))
        ));
    }
}
