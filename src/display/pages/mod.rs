mod crew;
mod main_page;
mod pass_table;
mod plots;

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

use super::color::Color;
use super::controller::RenderRequest;
use super::draw::DrawOp;
use super::registry::FieldRegistry;
use crate::predict::PassScheduler;
use crate::tracker::TrackingContext;

pub use main_page::MainPage;
pub use pass_table::PassTablePage;

pub const SCREEN_WIDTH: i32 = 480;
pub const SCREEN_HEIGHT: i32 = 320;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PageId {
    Main,
    AzElPlot,
    PolarPlot,
    PassTable,
    GroundTrack,
    Crew,
}

/// Everything a page may read or sample while rendering.
pub struct PageView<'a> {
    pub ctx: &'a TrackingContext,
    pub scheduler: &'a mut PassScheduler,
    pub fields: &'a mut FieldRegistry,
    pub alert_enabled: bool,
}

pub struct Pages {
    main: MainPage,
    pass_table: PassTablePage,
}

impl Pages {
    pub fn new(pass_table_rows: usize) -> Self {
        Self {
            main: MainPage::new(),
            pass_table: PassTablePage::new(pass_table_rows),
        }
    }

    /// Prediction failures degrade to placeholder text, so a full redraw
    /// always clears the screen and draws the page frame.
    pub fn render(&self, request: RenderRequest, view: &mut PageView<'_>) -> Vec<DrawOp> {
        let mut ops = Vec::new();
        if request.full_redraw {
            view.fields.reset_page(request.page);
            ops.push(DrawOp::ClearScreen {
                color: Color::BLACK,
            });
        }
        match request.page {
            PageId::Main => ops.extend(self.main.render(
                view.ctx,
                view.alert_enabled,
                view.fields,
                request.full_redraw,
            )),
            PageId::PassTable => ops.extend(self.pass_table.render(view, request.full_redraw)),
            PageId::AzElPlot => ops.extend(plots::az_el(view, request.full_redraw)),
            PageId::PolarPlot => ops.extend(plots::polar(view, request.full_redraw)),
            PageId::GroundTrack => ops.extend(plots::ground_track(view, request.full_redraw)),
            PageId::Crew => ops.extend(crew::render(request.full_redraw)),
        }
        ops
    }
}
