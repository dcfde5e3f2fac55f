mod cache;
mod error;
mod fetcher;
pub mod tle;
mod types;

pub use cache::ElementSetCache;
pub use error::ElementError;
pub use fetcher::CelestrakFetcher;
pub use tle::{element_age, TleFields};
pub use types::{ElementAge, OrbitalElementSet};

#[cfg(test)]
pub(crate) use cache::fakes;
