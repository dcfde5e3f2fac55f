use super::color::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Small,
    Medium,
    Large,
    SevenSegment,
}

impl Font {
    /// Horizontal advance of one monospaced glyph in pixels.
    pub const fn advance(self) -> i32 {
        match self {
            Font::Small => 6,
            Font::Medium => 12,
            Font::Large => 18,
            Font::SevenSegment => 32,
        }
    }
}

/// One primitive drawing instruction for the panel.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    ClearScreen {
        color: Color,
    },
    Text {
        origin: Point,
        text: String,
        color: Color,
        font: Font,
    },
    Frame {
        origin: Point,
        width: i32,
        height: i32,
        color: Color,
    },
    EraseGlyph {
        origin: Point,
        glyph: char,
        font: Font,
    },
    DrawGlyph {
        origin: Point,
        glyph: char,
        color: Color,
        font: Font,
    },
    Polyline {
        points: Vec<Point>,
        color: Color,
    },
    Marker {
        at: Point,
        color: Color,
    },
    Image {
        asset: String,
        origin: Point,
    },
}

pub trait Surface: Send {
    fn apply(&mut self, ops: &[DrawOp]);
}

/// Headless surface: reports what would be drawn through the log.
#[derive(Debug, Default)]
pub struct LogSurface {
    frames: u64,
    ops: u64,
}

impl Surface for LogSurface {
    fn apply(&mut self, ops: &[DrawOp]) {
        if ops.is_empty() {
            return;
        }
        self.frames += 1;
        self.ops += ops.len() as u64;
        for op in ops {
            match op {
                DrawOp::ClearScreen { .. } => log::debug!("surface: clear"),
                DrawOp::Text { text, .. } => log::trace!("surface: text '{}'", text),
                DrawOp::Image { asset, .. } => log::debug!("surface: image {}", asset),
                _ => {}
            }
        }
        log::trace!(
            "surface: frame {} with {} ops ({} total)",
            self.frames,
            ops.len(),
            self.ops
        );
    }
}

/// Keeps every op it is handed. Shares its buffer so a test can inspect it
/// after handing the surface to the control loop.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub ops: std::sync::Arc<std::sync::Mutex<Vec<DrawOp>>>,
}

#[cfg(test)]
impl RecordingSurface {
    pub fn take(&self) -> Vec<DrawOp> {
        std::mem::take(&mut *self.ops.lock().unwrap())
    }
}

#[cfg(test)]
impl Surface for RecordingSurface {
    fn apply(&mut self, ops: &[DrawOp]) {
        self.ops.lock().unwrap().extend_from_slice(ops);
    }
}
