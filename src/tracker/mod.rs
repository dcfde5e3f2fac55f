pub mod alarm;
pub mod context;
mod error;
pub mod input;
mod tracker;

pub use alarm::TerminalAlarm;
pub use context::TrackingContext;
pub use input::spawn_stdin_reader;
pub use tracker::{load_alert_setting, Tracker, TrackerParts};
