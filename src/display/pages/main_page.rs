use chrono::{DateTime, FixedOffset};

use crate::display::color::{elevation_color, Color};
use crate::display::draw::{DrawOp, Font, Point};
use crate::display::field::{FieldLayout, IncrementalFieldRenderer};
use crate::display::format::{angle5, angle6, clock, countdown, grouped, grouped_km, hms};
use crate::display::registry::{FieldId, FieldRegistry};
use crate::elements::ElementAge;
use crate::predict::Visibility;
use crate::tracker::TrackingContext;

const LABEL_OFFSET: Point = Point::new(0, -12);

fn text(value: &str) -> String {
    value.to_string()
}

fn orbit(value: &u64) -> String {
    grouped(*value)
}

/// Ages past what the field holds show as a saturated `999:59+`.
const MAX_SHOWN_AGE_S: i64 = 1000 * 3_600;

fn age(value: &ElementAge) -> String {
    if value.total_seconds >= MAX_SHOWN_AGE_S {
        "999:59+".to_string()
    } else {
        value.hours_minutes()
    }
}

fn alert_icon(enabled: &bool) -> String {
    let icon = if *enabled { "ON" } else { "OFF" };
    icon.to_string()
}

fn labelled<T: ?Sized>(
    origin: Point,
    width: usize,
    font: Font,
    format: fn(&T) -> String,
    label: &str,
) -> IncrementalFieldRenderer<T> {
    IncrementalFieldRenderer::new(FieldLayout::new(origin, width, font), format).with_label(
        label,
        LABEL_OFFSET,
        Color::DARK_GREY,
        Font::Small,
    )
}

/// Bottom line: countdown to the next pass, or time left in the current one.
pub fn banner(ctx: &TrackingContext) -> String {
    match (ctx.visibility, ctx.next_pass) {
        (Visibility::BelowHorizon, Some(pass)) if pass.aos > ctx.now => format!(
            "Next pass in {} at {}",
            hms((pass.aos - ctx.now).num_seconds()),
            clock(&ctx.local(pass.aos))
        ),
        (Visibility::BelowHorizon, _) => "Searching for next pass".to_string(),
        (Visibility::AboveHorizon, Some(pass)) if pass.los > ctx.now => format!(
            "Satellite is above horizon for {}",
            countdown((pass.los - ctx.now).num_seconds())
        ),
        (Visibility::AboveHorizon, _) => "Satellite is above horizon".to_string(),
    }
}

/// Live tracking overview.
pub struct MainPage {
    clock: IncrementalFieldRenderer<DateTime<FixedOffset>>,
    elevation: IncrementalFieldRenderer<f64>,
    azimuth: IncrementalFieldRenderer<f64>,
    altitude: IncrementalFieldRenderer<f64>,
    distance: IncrementalFieldRenderer<f64>,
    orbit: IncrementalFieldRenderer<u64>,
    latitude: IncrementalFieldRenderer<f64>,
    longitude: IncrementalFieldRenderer<f64>,
    age: IncrementalFieldRenderer<ElementAge>,
    alert: IncrementalFieldRenderer<bool>,
    banner: IncrementalFieldRenderer<str>,
}

impl Default for MainPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MainPage {
    pub fn new() -> Self {
        Self {
            clock: IncrementalFieldRenderer::new(
                FieldLayout::new(Point::new(112, 24), 8, Font::SevenSegment),
                clock,
            ),
            elevation: labelled(Point::new(16, 100), 5, Font::Large, angle5, "EL"),
            azimuth: labelled(Point::new(176, 100), 5, Font::Large, angle5, "AZ"),
            altitude: labelled(Point::new(16, 160), 6, Font::Medium, grouped_km, "ALT km"),
            distance: labelled(Point::new(176, 160), 6, Font::Medium, grouped_km, "DIST km"),
            orbit: labelled(Point::new(336, 160), 7, Font::Medium, orbit, "ORBIT"),
            latitude: labelled(Point::new(16, 220), 5, Font::Medium, angle5, "LAT"),
            longitude: labelled(Point::new(176, 220), 6, Font::Medium, angle6, "LON"),
            age: labelled(Point::new(336, 220), 7, Font::Medium, age, "TLE AGE"),
            alert: labelled(Point::new(380, 100), 3, Font::Medium, alert_icon, "ALERT"),
            banner: IncrementalFieldRenderer::new(
                FieldLayout::new(Point::new(8, 290), 38, Font::Medium),
                text,
            )
            .with_decoration(DrawOp::Frame {
                origin: Point::new(2, 284),
                width: 476,
                height: 30,
                color: Color::NAVY,
            }),
        }
    }

    pub fn render(
        &self,
        ctx: &TrackingContext,
        alert_enabled: bool,
        fields: &mut FieldRegistry,
        full: bool,
    ) -> Vec<DrawOp> {
        let mut ops = Vec::new();
        if full {
            ops.push(DrawOp::Text {
                origin: Point::new(8, 4),
                text: ctx.elements.name.clone(),
                color: Color::WHITE,
                font: Font::Medium,
            });
        }

        ops.extend(
            self.clock
                .render(&ctx.local_now(), Color::CYAN, fields.state(FieldId::Clock), full),
        );

        if let Some(track) = &ctx.track {
            let color = elevation_color(track.elevation_deg);
            let white = Color::WHITE;
            ops.extend(self.elevation.render(
                &track.elevation_deg,
                color,
                fields.state(FieldId::Elevation),
                full,
            ));
            ops.extend(self.azimuth.render(
                &track.azimuth_deg,
                color,
                fields.state(FieldId::Azimuth),
                full,
            ));
            ops.extend(self.altitude.render(
                &track.altitude_km,
                white,
                fields.state(FieldId::Altitude),
                full,
            ));
            ops.extend(self.distance.render(
                &track.distance_km,
                white,
                fields.state(FieldId::Distance),
                full,
            ));
            ops.extend(self.latitude.render(
                &track.latitude_deg,
                white,
                fields.state(FieldId::Latitude),
                full,
            ));
            ops.extend(self.longitude.render(
                &track.longitude_deg,
                white,
                fields.state(FieldId::Longitude),
                full,
            ));
        }

        if let Some(n) = ctx.orbit_number {
            ops.extend(
                self.orbit
                    .render(&n, Color::WHITE, fields.state(FieldId::OrbitNumber), full),
            );
        }
        ops.extend(self.age.render(
            &ctx.element_age(),
            Color::WHITE,
            fields.state(FieldId::ElementAge),
            full,
        ));

        let alert_color = if alert_enabled {
            Color::GOLD
        } else {
            Color::DARK_GREY
        };
        ops.extend(self.alert.render(
            &alert_enabled,
            alert_color,
            fields.state(FieldId::AlertIcon),
            full,
        ));

        let banner_color = match ctx.visibility {
            Visibility::AboveHorizon => Color::GREEN,
            Visibility::BelowHorizon => Color::WHITE,
        };
        ops.extend(self.banner.render(
            banner(ctx).as_str(),
            banner_color,
            fields.state(FieldId::Banner),
            full,
        ));

        log::trace!("Main page: {} ops", ops.len());
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::{PassEvent, TrackPoint};
    use crate::tracker::context::fixtures::context;
    use chrono::Duration;

    fn pass_at(ctx: &TrackingContext, aos_in: Duration) -> PassEvent {
        let aos = ctx.now + aos_in;
        PassEvent {
            aos,
            tca: aos + Duration::minutes(5),
            los: aos + Duration::minutes(10),
            aos_azimuth_deg: 200.0,
            los_azimuth_deg: 40.0,
            max_elevation_deg: 42.0,
            culmination_azimuth_deg: 120.0,
            orbit_number_at_aos: None,
        }
    }

    fn with_track(mut ctx: TrackingContext, elevation_deg: f64) -> TrackingContext {
        ctx.track = Some(TrackPoint {
            timestamp: ctx.now,
            azimuth_deg: 123.4,
            elevation_deg,
            latitude_deg: 12.3,
            longitude_deg: -45.6,
            altitude_km: 417.2,
            distance_km: 1234.0,
        });
        ctx.orbit_number = Some(56_369);
        ctx
    }

    #[test]
    fn banner_counts_down_to_the_next_pass() {
        let mut ctx = context();
        ctx.next_pass = Some(pass_at(&ctx, Duration::seconds(3_725)));
        // 18:00:00 UTC + 1:02:05, shown at UTC+1
        assert_eq!(banner(&ctx), "Next pass in 01:02:05 at 20:02:05");
    }

    #[test]
    fn banner_above_horizon_shows_time_to_los() {
        let mut ctx = context();
        ctx.next_pass = Some(pass_at(&ctx, Duration::seconds(-75)));
        ctx.visibility = Visibility::AboveHorizon;
        assert_eq!(banner(&ctx), "Satellite is above horizon for 08:45");
    }

    #[test]
    fn banner_without_pass() {
        let ctx = context();
        assert_eq!(banner(&ctx), "Searching for next pass");
    }

    #[test]
    fn element_age_saturates_instead_of_wrapping() {
        assert_eq!(age(&ElementAge::from_seconds(26 * 3_600 + 15 * 60)), "26:15");
        assert_eq!(age(&ElementAge::from_seconds(999 * 3_600 + 59 * 60)), "999:59");
        assert_eq!(age(&ElementAge::from_seconds(1_000 * 3_600)), "999:59+");
        assert_eq!(age(&ElementAge::from_seconds(12_345 * 3_600)), "999:59+");
    }

    #[test]
    fn unchanged_context_renders_nothing_the_second_time() {
        let page = MainPage::new();
        let ctx = with_track(context(), 12.0);
        let mut fields = FieldRegistry::new();

        let first = page.render(&ctx, true, &mut fields, true);
        assert!(first
            .iter()
            .any(|op| matches!(op, DrawOp::Text { text, .. } if text == "EL")));
        assert!(page.render(&ctx, true, &mut fields, false).is_empty());
    }

    #[test]
    fn next_second_only_patches_the_clock() {
        let page = MainPage::new();
        let mut ctx = with_track(context(), 12.0);
        let mut fields = FieldRegistry::new();
        page.render(&ctx, false, &mut fields, true);

        // 19:00:00 -> 19:00:01 local, banner and tracking values unchanged
        ctx.now += Duration::seconds(1);
        let ops = page.render(&ctx, false, &mut fields, false);
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[1], DrawOp::DrawGlyph { glyph: '1', .. }));
    }

    #[test]
    fn elevation_colour_change_redraws_both_angles() {
        let page = MainPage::new();
        let mut fields = FieldRegistry::new();
        page.render(&with_track(context(), -10.0), false, &mut fields, true);

        let ops = page.render(&with_track(context(), -10.0), false, &mut fields, false);
        assert!(ops.is_empty());

        // same digits width, new colour band
        let ops = page.render(&with_track(context(), 10.0), false, &mut fields, false);
        let green = ops
            .iter()
            .filter(|op| matches!(op, DrawOp::DrawGlyph { color, .. } if *color == Color::GREEN))
            .count();
        assert_eq!(green, 10);
    }

    #[test]
    fn alert_toggle_only_touches_the_icon() {
        let page = MainPage::new();
        let ctx = with_track(context(), 12.0);
        let mut fields = FieldRegistry::new();
        page.render(&ctx, true, &mut fields, true);
        let ops = page.render(&ctx, false, &mut fields, false);
        // colour changed: all three positions of the icon
        assert_eq!(ops.len(), 6);
    }
}
