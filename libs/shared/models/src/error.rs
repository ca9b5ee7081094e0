use thiserror::Error;

/// Errors surfaced by the persistence boundary.
///
/// `WriteConflict` is the transient optimistic-lock case: callers may retry
/// the write once before giving up. Everything else propagates unchanged.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Concurrent write conflict")]
    WriteConflict,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
