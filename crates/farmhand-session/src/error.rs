//! Error types for the session layer.

use farmhand_client::ClientError;

/// Errors that can occur when operating on a session.
///
/// Deliberately small: almost everything inside the lifecycle is absorbed
/// into session state or the audit log rather than surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session actor has shut down (deleted or process exit) and can
    /// no longer accept commands.
    #[error("session closed")]
    Closed,

    /// The network client refused an operation the caller was waiting on
    /// (currently only the QR challenge request).
    #[error("client error: {0}")]
    Client(#[from] ClientError),
}
