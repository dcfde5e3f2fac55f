use super::color::Color;
use super::draw::{DrawOp, Font, Point};
use super::format::fit_width;

/// What a field last put on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRenderState {
    previous: String,
    previous_color: Option<Color>,
    initialized: bool,
}

impl FieldRenderState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[cfg(test)]
    pub fn previous(&self) -> &str {
        &self.previous
    }
}

/// Fixed character grid a field is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub origin: Point,
    pub width: usize,
    pub font: Font,
    pub pitch: i32,
}

impl FieldLayout {
    pub const fn new(origin: Point, width: usize, font: Font) -> Self {
        Self {
            origin,
            width,
            font,
            pitch: font.advance(),
        }
    }

    fn position(&self, index: usize) -> Point {
        self.origin.offset(self.pitch * index as i32, 0)
    }
}

/// Diff-and-patch renderer for one fixed-width field. Only character
/// positions whose glyph changed are erased and redrawn.
pub struct IncrementalFieldRenderer<T: ?Sized> {
    layout: FieldLayout,
    format: fn(&T) -> String,
    decorations: Vec<DrawOp>,
}

impl<T: ?Sized> IncrementalFieldRenderer<T> {
    pub fn new(layout: FieldLayout, format: fn(&T) -> String) -> Self {
        Self {
            layout,
            format,
            decorations: Vec::new(),
        }
    }

    /// Static drawing emitted on the first render and on forced redraws.
    pub fn with_decoration(mut self, op: DrawOp) -> Self {
        self.decorations.push(op);
        self
    }

    pub fn with_label(self, text: &str, offset: Point, color: Color, font: Font) -> Self {
        let origin = self.layout.origin.offset(offset.x, offset.y);
        self.with_decoration(DrawOp::Text {
            origin,
            text: text.to_string(),
            color,
            font,
        })
    }

    pub fn format(&self, value: &T) -> String {
        fit_width(&(self.format)(value), self.layout.width)
    }

    pub fn render(
        &self,
        value: &T,
        color: Color,
        state: &mut FieldRenderState,
        force: bool,
    ) -> Vec<DrawOp> {
        let formatted = self.format(value);
        let first = !state.initialized;
        let full = first || force || state.previous_color != Some(color);

        let mut ops = Vec::new();
        if first || force {
            ops.extend(self.decorations.iter().cloned());
        }

        let previous: Vec<char> = if first {
            vec![' '; self.layout.width]
        } else {
            state.previous.chars().collect()
        };
        for (i, new) in formatted.chars().enumerate() {
            let old = previous.get(i).copied().unwrap_or(' ');
            if full || new != old {
                let origin = self.layout.position(i);
                ops.push(DrawOp::EraseGlyph {
                    origin,
                    glyph: old,
                    font: self.layout.font,
                });
                ops.push(DrawOp::DrawGlyph {
                    origin,
                    glyph: new,
                    color,
                    font: self.layout.font,
                });
            }
        }

        state.previous = formatted;
        state.previous_color = Some(color);
        state.initialized = true;
        ops
    }
}
