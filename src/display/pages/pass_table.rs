use super::PageView;
use crate::display::color::Color;
use crate::display::draw::{DrawOp, Font, Point};
use crate::display::field::{FieldLayout, IncrementalFieldRenderer};
use crate::display::format::{angle5, day_month, hour_minute};
use crate::display::registry::FieldId;
use crate::predict::PassEvent;
use crate::tracker::TrackingContext;

const HIGH_PASS_DEG: f64 = 35.0;
const ROW_PITCH: i32 = 20;
const FIRST_ROW: Point = Point::new(8, 40);
const HEADER: &str = "DATE  AOS   TCA   LOS   DUR     MAX";
const NO_PASS: &str = "No pass predicted";

fn text(value: &str) -> String {
    value.to_string()
}

/// One table line, local times.
pub fn row(ctx: &TrackingContext, pass: &PassEvent) -> String {
    let (minutes, seconds) = pass.duration_min_sec();
    format!(
        "{} {} {} {} {:02}:{:02} {}",
        day_month(&ctx.local(pass.aos)),
        hour_minute(&ctx.local(pass.aos)),
        hour_minute(&ctx.local(pass.tca)),
        hour_minute(&ctx.local(pass.los)),
        minutes,
        seconds,
        angle5(&pass.max_elevation_deg)
    )
}

/// Upcoming passes, one line each, high passes highlighted.
pub struct PassTablePage {
    rows: Vec<IncrementalFieldRenderer<str>>,
}

impl PassTablePage {
    pub fn new(rows: usize) -> Self {
        let rows = (0..rows)
            .map(|i| {
                IncrementalFieldRenderer::new(
                    FieldLayout::new(
                        FIRST_ROW.offset(0, ROW_PITCH * i as i32),
                        HEADER.len(),
                        Font::Medium,
                    ),
                    text,
                )
            })
            .collect();
        Self { rows }
    }

    pub fn render(&self, view: &mut PageView<'_>, full: bool) -> Vec<DrawOp> {
        let mut ops = Vec::new();
        if full {
            ops.push(DrawOp::Text {
                origin: Point::new(8, 8),
                text: format!("Passes of {}", view.ctx.elements.name),
                color: Color::WHITE,
                font: Font::Medium,
            });
            ops.push(DrawOp::Text {
                origin: FIRST_ROW.offset(0, -ROW_PITCH + 4),
                text: HEADER.to_string(),
                color: Color::DARK_GREY,
                font: Font::Medium,
            });
        }

        let passes = match view
            .scheduler
            .upcoming_passes(&view.ctx.elements, view.ctx.now, self.rows.len())
        {
            Ok(passes) => passes,
            Err(e) => {
                log::warn!("Pass table unavailable: {}", e);
                Vec::new()
            }
        };
        for (i, field) in self.rows.iter().enumerate() {
            let (line, color) = match passes.get(i) {
                Some(pass) if pass.max_elevation_deg > HIGH_PASS_DEG => {
                    (row(view.ctx, pass), Color::GREEN)
                }
                Some(pass) => (row(view.ctx, pass), Color::WHITE),
                None if i == 0 => (NO_PASS.to_string(), Color::DARK_GREY),
                None => (String::new(), Color::WHITE),
            };
            ops.extend(field.render(
                line.as_str(),
                color,
                view.fields.state(FieldId::PassTableRow(i)),
                full,
            ));
        }
        log::debug!("Pass table: {} passes, {} ops", passes.len(), ops.len());
        ops
    }
}
