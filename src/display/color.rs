use serde::Serialize;

/// RGB565 colour as the panel expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Color(pub u16);

impl Color {
    pub const BLACK: Color = Color(0x0000);
    pub const WHITE: Color = Color(0xFFFF);
    pub const RED: Color = Color(0xF800);
    pub const GREEN: Color = Color(0x07E0);
    pub const YELLOW: Color = Color(0xFFE0);
    pub const CYAN: Color = Color(0x07FF);
    pub const GOLD: Color = Color(0xFEA0);
    pub const DARK_GREY: Color = Color(0x7BEF);
    pub const NAVY: Color = Color(0x000F);

    #[cfg(test)]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color((((r as u16) & 0xF8) << 8) | (((g as u16) & 0xFC) << 3) | ((b as u16) >> 3))
    }
}

/// Green well above the horizon, red well below, yellow in between.
pub fn elevation_color(elevation_deg: f64) -> Color {
    if elevation_deg > 3.0 {
        Color::GREEN
    } else if elevation_deg < -3.0 {
        Color::RED
    } else {
        Color::YELLOW
    }
}
