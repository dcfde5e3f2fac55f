use chrono::{DateTime, Duration, Utc};

use super::error::PredictError;
use super::julian::julian_to_utc;
use super::notifier::LeadTimeNotifier;
use super::observer::Observer;
use super::orbit::orbit_number;
use super::propagator::Propagator;
use super::sun::sun_position;
use super::types::{PassEvent, TrackPoint, Visibility};
use crate::elements::tle::parse_fields;
use crate::elements::OrbitalElementSet;
use crate::tracker::TrackingContext;

/// Wait before searching again after a failed next-pass computation.
const PASS_RETRY_SECONDS: i64 = 60;

#[derive(Debug, Clone, Copy)]
pub struct SearchPolicy {
    /// Offset added to the search start so a pass already underway is not returned.
    pub lookahead: Duration,
    pub max_iterations: u32,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            lookahead: Duration::minutes(10),
            max_iterations: 100,
        }
    }
}

/// What changed during one scheduler tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub rose: bool,
    pub set: bool,
    pub pass_updated: bool,
    pub alert_due: bool,
}

pub struct PassScheduler {
    propagator: Box<dyn Propagator>,
    observer: Observer,
    policy: SearchPolicy,
    notifier: LeadTimeNotifier,
    computed_for_revision: Option<u64>,
    retry_at: Option<DateTime<Utc>>,
    ordering_reported: bool,
}

fn whole_seconds(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(t.timestamp(), 0).unwrap_or(t)
}

impl PassScheduler {
    pub fn new(
        propagator: Box<dyn Propagator>,
        observer: Observer,
        policy: SearchPolicy,
        lead_time_s: i64,
    ) -> Self {
        Self {
            propagator,
            observer,
            policy,
            notifier: LeadTimeNotifier::new(lead_time_s),
            computed_for_revision: None,
            retry_at: None,
            ordering_reported: false,
        }
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// Samples the track every `step` from `from` through `to` inclusive.
    pub fn sample_track(
        &mut self,
        set: &OrbitalElementSet,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        step: Duration,
    ) -> Result<Vec<TrackPoint>, PredictError> {
        let mut cursor = from;
        let mut points = Vec::new();
        while cursor <= to {
            points.push(self.propagator.position_at(set, &self.observer, cursor)?);
            cursor += step;
        }
        Ok(points)
    }

    /// Next pass whose search starts `lookahead` after `from`.
    pub fn compute_next_pass(
        &mut self,
        set: &OrbitalElementSet,
        from: DateTime<Utc>,
    ) -> Result<PassEvent, PredictError> {
        self.find_pass_from(set, from + self.policy.lookahead)
    }

    /// Up to `count` consecutive passes, the first one as `compute_next_pass`
    /// finds it. Stops early at the first search that fails.
    pub fn upcoming_passes(
        &mut self,
        set: &OrbitalElementSet,
        from: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<PassEvent>, PredictError> {
        let mut passes: Vec<PassEvent> = Vec::with_capacity(count);
        let mut start = from + self.policy.lookahead;
        while passes.len() < count {
            match self.find_pass_from(set, start) {
                Ok(pass) => {
                    start = pass.los + Duration::seconds(1);
                    passes.push(pass);
                }
                Err(e) if !passes.is_empty() => {
                    log::warn!("Pass table cut short after {} passes: {}", passes.len(), e);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(passes)
    }

    fn find_pass_from(
        &mut self,
        set: &OrbitalElementSet,
        search_start: DateTime<Utc>,
    ) -> Result<PassEvent, PredictError> {
        let start = whole_seconds(search_start);
        let budget = self.policy.max_iterations;
        let raw = self
            .propagator
            .next_pass(set, &self.observer, start, budget)?
            .ok_or(PredictError::PassNotFound { from: start, budget })?;

        let to_utc = |jd: f64| {
            julian_to_utc(jd)
                .ok_or_else(|| PredictError::InvalidPass(format!("julian date {jd} out of range")))
        };
        let aos = to_utc(raw.aos_jd)?;
        let tca = to_utc(raw.tca_jd)?;
        let los = to_utc(raw.los_jd)?;

        if !(aos < tca && tca < los) {
            return Err(PredictError::InvalidPass(format!(
                "aos {aos}, tca {tca}, los {los} out of order"
            )));
        }
        if aos < start {
            return Err(PredictError::InvalidPass(format!(
                "aos {aos} precedes search start {start}"
            )));
        }

        let orbit_number_at_aos = parse_fields(&set.line1, &set.line2)
            .ok()
            .and_then(|fields| orbit_number(&fields, aos).ok());

        Ok(PassEvent {
            aos,
            tca,
            los,
            aos_azimuth_deg: raw.aos_azimuth_deg,
            los_azimuth_deg: raw.los_azimuth_deg,
            max_elevation_deg: raw.max_elevation_deg,
            culmination_azimuth_deg: raw.culmination_azimuth_deg,
            orbit_number_at_aos,
        })
    }

    fn needs_pass(&self, ctx: &TrackingContext, just_set: bool) -> bool {
        just_set
            || self.computed_for_revision != Some(ctx.elements_revision)
            || ctx.next_pass.is_none_or(|p| p.los <= ctx.now)
    }

    /// Advances position, orbit number, visibility, next pass and alert
    /// state to `ctx.now`.
    pub fn tick(&mut self, ctx: &mut TrackingContext) -> Result<TickOutcome, PredictError> {
        let now = ctx.now;
        let mut outcome = TickOutcome::default();

        let point = self.propagator.position_at(&ctx.elements, &self.observer, now)?;
        ctx.track = Some(point);
        ctx.sun = Some(sun_position(&self.observer, now));

        match orbit_number(&ctx.fields, now) {
            Ok(n) => {
                ctx.orbit_number = Some(n);
                self.ordering_reported = false;
            }
            Err(e) => {
                if !self.ordering_reported {
                    log::warn!("{}; keeping orbit number {:?}", e, ctx.orbit_number);
                    self.ordering_reported = true;
                }
            }
        }

        let above = point.elevation_deg > 0.0;
        match (ctx.visibility, above) {
            (Visibility::BelowHorizon, true) => {
                ctx.visibility = Visibility::AboveHorizon;
                outcome.rose = true;
                log::info!(
                    "{} above the horizon at az {:.1}",
                    ctx.elements.name,
                    point.azimuth_deg
                );
            }
            (Visibility::AboveHorizon, false) => {
                ctx.visibility = Visibility::BelowHorizon;
                outcome.set = true;
                self.retry_at = None;
                log::info!(
                    "{} below the horizon at az {:.1}",
                    ctx.elements.name,
                    point.azimuth_deg
                );
            }
            _ => {}
        }

        let retry_due = self.retry_at.is_none_or(|at| now >= at);
        if ctx.visibility == Visibility::BelowHorizon && retry_due && self.needs_pass(ctx, outcome.set) {
            match self.compute_next_pass(&ctx.elements, now) {
                Ok(pass) => {
                    log::info!(
                        "Next pass: AOS {} (az {:.0}), TCA {} (el {:.1}), LOS {} (az {:.0})",
                        pass.aos,
                        pass.aos_azimuth_deg,
                        pass.tca,
                        pass.max_elevation_deg,
                        pass.los,
                        pass.los_azimuth_deg
                    );
                    ctx.next_pass = Some(pass);
                    self.computed_for_revision = Some(ctx.elements_revision);
                    self.retry_at = None;
                    outcome.pass_updated = true;
                }
                Err(e) => {
                    log::warn!(
                        "Next pass unavailable: {}; retrying in {} s",
                        e,
                        PASS_RETRY_SECONDS
                    );
                    self.retry_at = Some(now + Duration::seconds(PASS_RETRY_SECONDS));
                }
            }
        }

        if let Some(pass) = ctx.next_pass {
            if self.notifier.evaluate(pass.aos, now) {
                log::info!(
                    "Pass alert: AOS in {} s at {}",
                    self.notifier.lead_s(),
                    pass.aos
                );
                outcome.alert_due = true;
            }
        }

        Ok(outcome)
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::ScriptedPropagator;
    use super::*;
    use crate::tracker::context::fixtures::context;

    fn scheduler(propagator: &ScriptedPropagator, lead: i64) -> PassScheduler {
        PassScheduler::new(
            Box::new(propagator.clone()),
            Observer::default(),
            SearchPolicy::default(),
            lead,
        )
    }

    #[test]
    fn search_starts_after_lookahead() {
        let propagator = ScriptedPropagator::default();
        let ctx = context();
        let aos = ctx.now + Duration::minutes(30);
        propagator.push_pass(aos, aos + Duration::minutes(5), aos + Duration::minutes(10));
        let mut sched = scheduler(&propagator, 0);

        let pass = sched.compute_next_pass(&ctx.elements, ctx.now).unwrap();
        assert_eq!(pass.aos, aos);
        assert_eq!(pass.duration_min_sec(), (10, 0));
        assert!(pass.orbit_number_at_aos.is_some());
        let searched_from = propagator.searches.lock().unwrap()[0];
        assert_eq!(searched_from, whole_seconds(ctx.now + Duration::minutes(10)));
    }

    #[test]
    fn pass_inside_lookahead_is_not_returned() {
        let propagator = ScriptedPropagator::default();
        let ctx = context();
        let soon = ctx.now + Duration::minutes(5);
        propagator.push_pass(soon, soon + Duration::minutes(4), soon + Duration::minutes(8));
        let mut sched = scheduler(&propagator, 0);
        assert!(matches!(
            sched.compute_next_pass(&ctx.elements, ctx.now),
            Err(PredictError::PassNotFound { budget: 100, .. })
        ));
    }

    #[test]
    fn disordered_pass_is_rejected() {
        let propagator = ScriptedPropagator::default();
        let ctx = context();
        let aos = ctx.now + Duration::minutes(30);
        propagator.push_pass(aos, aos + Duration::minutes(12), aos + Duration::minutes(10));
        let mut sched = scheduler(&propagator, 0);
        assert!(matches!(
            sched.compute_next_pass(&ctx.elements, ctx.now),
            Err(PredictError::InvalidPass(_))
        ));
    }

    #[test]
    fn upcoming_passes_chain_from_each_los() {
        let propagator = ScriptedPropagator::default();
        let ctx = context();
        for k in 1..=3 {
            let aos = ctx.now + Duration::minutes(95 * k);
            propagator.push_pass(aos, aos + Duration::minutes(4), aos + Duration::minutes(9));
        }
        let mut sched = scheduler(&propagator, 0);
        let passes = sched.upcoming_passes(&ctx.elements, ctx.now, 12).unwrap();
        assert_eq!(passes.len(), 3);
        assert!(passes.windows(2).all(|w| w[0].los < w[1].aos));
    }

    #[test]
    fn visibility_transitions_and_recompute_on_set() {
        let propagator = ScriptedPropagator::default();
        let mut ctx = context();
        let aos = ctx.now + Duration::minutes(20);
        propagator.push_pass(aos, aos + Duration::minutes(5), aos + Duration::minutes(10));
        let later = aos + Duration::minutes(100);
        propagator.push_pass(later, later + Duration::minutes(5), later + Duration::minutes(10));
        let mut sched = scheduler(&propagator, 0);

        propagator.set_elevation(-20.0);
        let first = sched.tick(&mut ctx).unwrap();
        assert!(first.pass_updated);
        assert_eq!(ctx.next_pass.unwrap().aos, aos);
        assert_eq!(propagator.search_count(), 1);

        // nothing to do while the pass is pending
        ctx.now += Duration::seconds(1);
        assert_eq!(sched.tick(&mut ctx).unwrap(), TickOutcome::default());
        assert_eq!(propagator.search_count(), 1);

        ctx.now = aos + Duration::seconds(5);
        propagator.set_elevation(3.0);
        let rose = sched.tick(&mut ctx).unwrap();
        assert!(rose.rose && !rose.pass_updated);
        assert_eq!(ctx.visibility, Visibility::AboveHorizon);

        // never recomputed while above, even past the stored LOS
        ctx.now = aos + Duration::minutes(11);
        sched.tick(&mut ctx).unwrap();
        assert_eq!(propagator.search_count(), 1);

        propagator.set_elevation(-0.5);
        let set = sched.tick(&mut ctx).unwrap();
        assert!(set.set && set.pass_updated);
        assert_eq!(ctx.visibility, Visibility::BelowHorizon);
        assert_eq!(ctx.next_pass.unwrap().aos, later);
    }

    #[test]
    fn failed_search_keeps_stale_pass_and_backs_off() {
        let propagator = ScriptedPropagator::default();
        let mut ctx = context();
        let mut sched = scheduler(&propagator, 0);
        propagator.set_elevation(-20.0);

        sched.tick(&mut ctx).unwrap();
        assert!(ctx.next_pass.is_none());
        assert_eq!(propagator.search_count(), 1);

        ctx.now += Duration::seconds(30);
        sched.tick(&mut ctx).unwrap();
        assert_eq!(propagator.search_count(), 1);

        let aos = ctx.now + Duration::minutes(45);
        propagator.push_pass(aos, aos + Duration::minutes(5), aos + Duration::minutes(10));
        ctx.now += Duration::seconds(31);
        assert!(sched.tick(&mut ctx).unwrap().pass_updated);
        assert_eq!(ctx.next_pass.unwrap().aos, aos);
    }

    #[test]
    fn new_elements_trigger_recompute() {
        let propagator = ScriptedPropagator::default();
        let mut ctx = context();
        let aos = ctx.now + Duration::minutes(20);
        propagator.push_pass(aos, aos + Duration::minutes(5), aos + Duration::minutes(10));
        let mut sched = scheduler(&propagator, 0);
        propagator.set_elevation(-20.0);
        sched.tick(&mut ctx).unwrap();

        let mut refreshed = ctx.elements.clone();
        refreshed.retrieved_at += Duration::hours(1);
        ctx.replace_elements(&refreshed).unwrap();
        ctx.now += Duration::seconds(1);
        assert!(sched.tick(&mut ctx).unwrap().pass_updated);
        assert_eq!(propagator.search_count(), 2);
    }

    #[test]
    fn orbit_number_kept_on_ordering_error() {
        let propagator = ScriptedPropagator::default();
        let mut ctx = context();
        let mut sched = scheduler(&propagator, 0);
        propagator.set_elevation(-20.0);
        sched.tick(&mut ctx).unwrap();
        let held = ctx.orbit_number.unwrap();

        ctx.now = ctx.fields.epoch - Duration::hours(1);
        sched.tick(&mut ctx).unwrap();
        assert_eq!(ctx.orbit_number, Some(held));
    }

    #[test]
    fn alert_fires_once_at_lead_time() {
        let propagator = ScriptedPropagator::default();
        let mut ctx = context();
        let aos = ctx.now + Duration::minutes(20);
        propagator.push_pass(aos, aos + Duration::minutes(5), aos + Duration::minutes(10));
        let mut sched = scheduler(&propagator, 15);
        propagator.set_elevation(-20.0);
        assert!(!sched.tick(&mut ctx).unwrap().alert_due);

        let mut fired = Vec::new();
        for s in [17, 16, 15, 15, 14] {
            ctx.now = aos - Duration::seconds(s);
            fired.push(sched.tick(&mut ctx).unwrap().alert_due);
        }
        assert_eq!(fired, vec![false, false, true, false, false]);
    }

    fn sgp4_scheduler() -> PassScheduler {
        let observer = Observer {
            latitude_deg: 46.4666463,
            longitude_deg: 6.8615008,
            altitude_m: 500.0,
        };
        PassScheduler::new(
            Box::new(crate::predict::Sgp4Propagator::new()),
            observer,
            SearchPolicy::default(),
            0,
        )
    }

    #[test]
    fn default_policy_finds_the_next_iss_pass_from_any_start() {
        let set = crate::tracker::context::fixtures::iss_set();
        let mut sched = sgp4_scheduler();
        for k in 0..96 {
            let from = set.retrieved_at + Duration::minutes(30 * k);
            let pass = sched
                .compute_next_pass(&set, from)
                .unwrap_or_else(|e| panic!("no pass from {from}: {e}"));
            assert!(pass.aos >= from + Duration::minutes(10));
            assert!(pass.aos < pass.tca && pass.tca < pass.los);
            assert!(pass.aos - from < Duration::hours(30), "gap from {from}");
        }
    }

    #[test]
    fn default_policy_fills_a_twelve_row_table() {
        let set = crate::tracker::context::fixtures::iss_set();
        let mut sched = sgp4_scheduler();
        let from = set.retrieved_at + Duration::hours(1);
        let passes = sched.upcoming_passes(&set, from, 12).unwrap();
        assert_eq!(passes.len(), 12);
        for pair in passes.windows(2) {
            assert!(pair[0].los < pair[1].aos);
        }
    }
}
