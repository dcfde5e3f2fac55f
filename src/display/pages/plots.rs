use chrono::Duration;

use super::{PageView, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::display::color::Color;
use crate::display::draw::{DrawOp, Font, Point};
use crate::display::format::hour_minute;
use crate::predict::{PassEvent, PredictError, TrackPoint};

const PASS_STEP_S: i64 = 10;
const GROUND_TRACK_SPAN_MIN: i64 = 90;
const GROUND_TRACK_STEP_S: i64 = 20;

const PLOT_TOP: i32 = 40;
const PLOT_LEFT: i32 = 40;
const PLOT_WIDTH: i32 = SCREEN_WIDTH - 2 * PLOT_LEFT;
const PLOT_HEIGHT: i32 = SCREEN_HEIGHT - PLOT_TOP - 40;

const POLAR_CENTER: Point = Point::new(SCREEN_WIDTH / 2, PLOT_TOP + 125);
const POLAR_RADIUS: f64 = 120.0;

const MAP_TOP: i32 = PLOT_TOP;
const MAP_HEIGHT: i32 = SCREEN_WIDTH / 2;

fn title(text: String) -> DrawOp {
    DrawOp::Text {
        origin: Point::new(8, 8),
        text,
        color: Color::WHITE,
        font: Font::Medium,
    }
}

fn no_pass() -> Vec<DrawOp> {
    vec![DrawOp::Text {
        origin: Point::new(PLOT_LEFT, PLOT_TOP + PLOT_HEIGHT / 2),
        text: "No pass predicted".to_string(),
        color: Color::DARK_GREY,
        font: Font::Medium,
    }]
}

fn pass_track(view: &mut PageView<'_>, pass: &PassEvent) -> Result<Vec<TrackPoint>, PredictError> {
    view.scheduler.sample_track(
        &view.ctx.elements,
        pass.aos,
        pass.los,
        Duration::seconds(PASS_STEP_S),
    )
}

fn track_unavailable(page: &str, e: &PredictError) -> Vec<DrawOp> {
    log::warn!("{} track unavailable: {}", page, e);
    vec![DrawOp::Text {
        origin: Point::new(PLOT_LEFT, PLOT_TOP + PLOT_HEIGHT / 2),
        text: "Track unavailable".to_string(),
        color: Color::DARK_GREY,
        font: Font::Medium,
    }]
}

/// Plots redraw whole; a periodic refresh clears what the last one drew.
fn start(full: bool) -> Vec<DrawOp> {
    if full {
        Vec::new()
    } else {
        vec![DrawOp::ClearScreen {
            color: Color::BLACK,
        }]
    }
}

/// Elevation and azimuth against time over the current or next pass.
pub fn az_el(view: &mut PageView<'_>, full: bool) -> Vec<DrawOp> {
    let mut ops = start(full);
    ops.push(title(format!("{} azimuth / elevation", view.ctx.elements.name)));
    let Some(pass) = view.ctx.next_pass else {
        ops.extend(no_pass());
        return ops;
    };
    let track = match pass_track(view, &pass) {
        Ok(track) => track,
        Err(e) => {
            ops.extend(track_unavailable("Az/el", &e));
            return ops;
        }
    };

    let span = pass.duration().num_seconds().max(1) as f64;
    let x_at = |p: &TrackPoint| {
        PLOT_LEFT + ((p.timestamp - pass.aos).num_seconds() as f64 / span * PLOT_WIDTH as f64) as i32
    };
    let y_at = |fraction: f64| PLOT_TOP + PLOT_HEIGHT - (fraction * PLOT_HEIGHT as f64) as i32;

    ops.push(DrawOp::Frame {
        origin: Point::new(PLOT_LEFT, PLOT_TOP),
        width: PLOT_WIDTH,
        height: PLOT_HEIGHT,
        color: Color::DARK_GREY,
    });
    ops.push(DrawOp::Polyline {
        points: track
            .iter()
            .map(|p| Point::new(x_at(p), y_at(p.elevation_deg.max(0.0) / 90.0)))
            .collect(),
        color: Color::GREEN,
    });
    ops.push(DrawOp::Polyline {
        points: track
            .iter()
            .map(|p| Point::new(x_at(p), y_at(p.azimuth_deg / 360.0)))
            .collect(),
        color: Color::CYAN,
    });
    for (t, x) in [(pass.aos, PLOT_LEFT), (pass.los, PLOT_LEFT + PLOT_WIDTH - 30)] {
        ops.push(DrawOp::Text {
            origin: Point::new(x, PLOT_TOP + PLOT_HEIGHT + 6),
            text: hour_minute(&view.ctx.local(t)),
            color: Color::WHITE,
            font: Font::Small,
        });
    }

    if let Some(now) = view.ctx.track.filter(|p| pass.is_in_progress(p.timestamp)) {
        ops.push(DrawOp::Marker {
            at: Point::new(x_at(&now), y_at(now.elevation_deg.max(0.0) / 90.0)),
            color: Color::YELLOW,
        });
    }
    ops
}

/// Sky position on the polar plot: zenith at the centre, horizon on the rim,
/// north up.
pub fn polar_point(azimuth_deg: f64, elevation_deg: f64) -> Point {
    let r = POLAR_RADIUS * (90.0 - elevation_deg.clamp(0.0, 90.0)) / 90.0;
    let az = azimuth_deg.to_radians();
    Point::new(
        POLAR_CENTER.x + (r * az.sin()).round() as i32,
        POLAR_CENTER.y - (r * az.cos()).round() as i32,
    )
}

fn ring(elevation_deg: f64) -> Vec<Point> {
    (0..=72)
        .map(|i| polar_point(i as f64 * 5.0, elevation_deg))
        .collect()
}

/// Sky track of the current or next pass.
pub fn polar(view: &mut PageView<'_>, full: bool) -> Vec<DrawOp> {
    let mut ops = start(full);
    ops.push(title(format!("{} sky track", view.ctx.elements.name)));
    ops.push(DrawOp::Polyline {
        points: ring(0.0),
        color: Color::DARK_GREY,
    });
    ops.push(DrawOp::Polyline {
        points: ring(45.0),
        color: Color::DARK_GREY,
    });
    ops.push(DrawOp::Text {
        origin: polar_point(0.0, 0.0).offset(-3, -12),
        text: "N".to_string(),
        color: Color::WHITE,
        font: Font::Small,
    });

    let Some(pass) = view.ctx.next_pass else {
        ops.extend(no_pass());
        return ops;
    };
    let track = match pass_track(view, &pass) {
        Ok(track) => track,
        Err(e) => {
            ops.extend(track_unavailable("Polar", &e));
            return ops;
        }
    };
    ops.push(DrawOp::Polyline {
        points: track
            .iter()
            .map(|p| polar_point(p.azimuth_deg, p.elevation_deg))
            .collect(),
        color: Color::CYAN,
    });
    ops.push(DrawOp::Marker {
        at: polar_point(pass.aos_azimuth_deg, 0.0),
        color: Color::GREEN,
    });
    ops.push(DrawOp::Marker {
        at: polar_point(pass.los_azimuth_deg, 0.0),
        color: Color::RED,
    });
    if let Some(now) = view.ctx.track.filter(|p| pass.is_in_progress(p.timestamp)) {
        ops.push(DrawOp::Marker {
            at: polar_point(now.azimuth_deg, now.elevation_deg),
            color: Color::YELLOW,
        });
    }
    ops
}

/// Equirectangular map position.
pub fn map_point(latitude_deg: f64, longitude_deg: f64) -> Point {
    let x = (longitude_deg + 180.0) / 360.0 * SCREEN_WIDTH as f64;
    let y = (90.0 - latitude_deg) / 180.0 * MAP_HEIGHT as f64;
    Point::new(x.round() as i32, MAP_TOP + y.round() as i32)
}

/// Map polylines for a ground track, broken wherever it wraps around the
/// antimeridian.
pub fn split_at_antimeridian(track: &[TrackPoint]) -> Vec<Vec<Point>> {
    let mut segments: Vec<Vec<Point>> = Vec::new();
    let mut previous: Option<f64> = None;
    for p in track {
        let wrapped = previous.is_some_and(|lon| (p.longitude_deg - lon).abs() > 180.0);
        if wrapped || segments.is_empty() {
            segments.push(Vec::new());
        }
        if let Some(segment) = segments.last_mut() {
            segment.push(map_point(p.latitude_deg, p.longitude_deg));
        }
        previous = Some(p.longitude_deg);
    }
    segments.retain(|s| s.len() > 1);
    segments
}

/// Ground track for the next ninety minutes.
pub fn ground_track(view: &mut PageView<'_>, full: bool) -> Vec<DrawOp> {
    let mut ops = start(full);
    ops.push(title(format!("{} ground track", view.ctx.elements.name)));
    ops.push(DrawOp::Frame {
        origin: Point::new(0, MAP_TOP),
        width: SCREEN_WIDTH,
        height: MAP_HEIGHT,
        color: Color::NAVY,
    });

    let now = view.ctx.now;
    let track = match view.scheduler.sample_track(
        &view.ctx.elements,
        now,
        now + Duration::minutes(GROUND_TRACK_SPAN_MIN),
        Duration::seconds(GROUND_TRACK_STEP_S),
    ) {
        Ok(track) => track,
        Err(e) => {
            ops.extend(track_unavailable("Ground", &e));
            Vec::new()
        }
    };
    for points in split_at_antimeridian(&track) {
        ops.push(DrawOp::Polyline {
            points,
            color: Color::YELLOW,
        });
    }

    let observer = view.scheduler.observer();
    ops.push(DrawOp::Marker {
        at: map_point(observer.latitude_deg, observer.longitude_deg),
        color: Color::GREEN,
    });
    if let Some(p) = view.ctx.track.or_else(|| track.first().copied()) {
        ops.push(DrawOp::Marker {
            at: map_point(p.latitude_deg, p.longitude_deg),
            color: Color::RED,
        });
    }
    ops
}
