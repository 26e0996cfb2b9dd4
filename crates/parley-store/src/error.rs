//! Error type for the persistence boundary.

/// The store could not complete an operation.
///
/// Deliberately coarse: the chat core does not retry or distinguish
/// backend failure modes — any store error aborts the current operation
/// and is reported to the requesting session. The string carries the
/// backend's own description for the logs.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store is unreachable or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
