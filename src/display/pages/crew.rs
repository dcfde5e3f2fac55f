use crate::display::draw::{DrawOp, Point};

pub const CREW_ASSET: &str = "crew.png";

/// Static picture; drawn on entry only.
pub fn render(full: bool) -> Vec<DrawOp> {
    if !full {
        return Vec::new();
    }
    vec![DrawOp::Image {
        asset: CREW_ASSET.to_string(),
        origin: Point::new(0, 0),
    }]
}
