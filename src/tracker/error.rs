use thiserror::Error;

use crate::clock::{ClockError, TimeSyncError};
use crate::elements::ElementError;
use crate::predict::PredictError;
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("clock error: {0}")]
    Clock(#[from] ClockError),
    #[error("time sync failed: {0}")]
    TimeSync(#[from] TimeSyncError),
    #[error("elements error: {0}")]
    Elements(#[from] ElementError),
    #[error("predict error: {0}")]
    Predict(#[from] PredictError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
