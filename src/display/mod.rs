mod color;
mod controller;
mod draw;
mod field;
mod format;
mod pages;
mod registry;

pub use controller::{ControllerAction, DisplayPageController, InputEvent};
pub use draw::{LogSurface, Surface};
pub use format::clock;
pub use pages::{PageId, PageView, Pages};
pub use registry::FieldRegistry;

#[cfg(test)]
pub use draw::{DrawOp, RecordingSurface};
