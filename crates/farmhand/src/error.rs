//! Top-level error type.

use farmhand_protocol::{AccountId, ProtocolError};
use farmhand_session::SessionError;
use farmhand_store::StoreError;

/// Unified error for registry operations.
///
/// Layer errors pass through transparently so callers can still match on
/// the specific kind.
#[derive(Debug, thiserror::Error)]
pub enum FarmhandError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The account id is well-formed but no record exists for it.
    #[error("unknown account: {0}")]
    UnknownAccount(AccountId),
}
