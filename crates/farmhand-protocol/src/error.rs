//! Error types for the protocol vocabulary.

/// Errors raised while validating caller-supplied values.
///
/// These are the only errors in the system that are meant to reach an
/// external caller directly — everything deeper is absorbed into session
/// state or the audit log.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The supplied string is not a well-formed account identifier.
    /// Account ids are 24 lowercase hex characters.
    #[error("invalid account id: {0:?}")]
    InvalidAccountId(String),

    /// The supplied string is not a well-formed QR login session identifier.
    #[error("invalid qr session id: {0:?}")]
    InvalidQrId(String),

    /// The supplied value does not map to a known presence state.
    #[error("unknown presence state: {0}")]
    UnknownPresence(u8),
}
