use chrono::{DateTime, FixedOffset};

/// Signed one-decimal angle, right-aligned to `width`.
pub fn angle(value: f64, width: usize) -> String {
    format!("{:>width$.1}", value, width = width)
}

pub fn angle5(value: &f64) -> String {
    angle(*value, 5)
}

pub fn angle6(value: &f64) -> String {
    angle(*value, 6)
}

/// Integer with an apostrophe between every group of three digits.
pub fn grouped(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('\'');
        }
        out.push(c);
    }
    out
}

/// Whole kilometres, grouped.
pub fn grouped_km(value: &f64) -> String {
    grouped(value.max(0.0).round() as u64)
}

/// `HH:MM:SS` with unbounded hours. Negative input reads as zero.
pub fn hms(total_seconds: i64) -> String {
    let s = total_seconds.max(0);
    format!("{:02}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60)
}

/// `MM:SS` countdown, clamped to [0, 3600] seconds.
pub fn countdown(total_seconds: i64) -> String {
    let s = total_seconds.clamp(0, 3600);
    format!("{:02}:{:02}", s / 60, s % 60)
}

pub fn clock(t: &DateTime<FixedOffset>) -> String {
    t.format("%H:%M:%S").to_string()
}

pub fn hour_minute(t: &DateTime<FixedOffset>) -> String {
    t.format("%H:%M").to_string()
}

pub fn day_month(t: &DateTime<FixedOffset>) -> String {
    t.format("%d.%m").to_string()
}

/// Pads on the left to `width`; longer input keeps its rightmost characters.
pub fn fit_width(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count >= width {
        text.chars().skip(count - width).collect()
    } else {
        let mut out = " ".repeat(width - count);
        out.push_str(text);
        out
    }
}
