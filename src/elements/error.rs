use thiserror::Error;

use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum ElementError {
    #[error("invalid element set: {0}")]
    InvalidTle(String),
    #[error("no element set for catalog {catalog_id} after {attempts} fetch attempts: {last}")]
    FetchExhausted {
        catalog_id: u32,
        attempts: u32,
        last: FetchError,
    },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("source answered HTTP {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Payload(String),
    #[error("source returned catalog {found}, expected {expected}")]
    CatalogMismatch { expected: u32, found: u32 },
}
