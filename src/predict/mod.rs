mod error;
mod geometry;
pub mod julian;
mod notifier;
mod observer;
mod orbit;
mod propagator;
mod scheduler;
mod search;
mod sun;
mod types;

pub use error::PredictError;
pub use observer::Observer;
pub use propagator::Sgp4Propagator;
pub use scheduler::{PassScheduler, SearchPolicy, TickOutcome};
pub use sun::SunPosition;
pub use types::{PassEvent, TrackPoint, Visibility};

#[cfg(test)]
pub(crate) use scheduler::fakes;
