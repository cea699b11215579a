/// Errors that can occur in the persistence layer.
///
/// Inside lifecycle operations these are logged and swallowed at the call
/// site — a failed audit write must never abort a stop or a reconnect.
/// They only propagate from the registry's direct read paths.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(String),

    /// The record to update does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
}
