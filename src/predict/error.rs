use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::elements::ElementError;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Propagation error: {0}")]
    Propagation(String),
    #[error("invalid elements: {0}")]
    Elements(#[from] ElementError),
    #[error("no pass found within {budget} orbit-length search windows from {from}")]
    PassNotFound { from: DateTime<Utc>, budget: u32 },
    #[error("propagator returned an inconsistent pass: {0}")]
    InvalidPass(String),
    #[error("orbit number undefined: {t} is not after element epoch {epoch}")]
    OrbitOrdering {
        t: DateTime<Utc>,
        epoch: DateTime<Utc>,
    },
}

