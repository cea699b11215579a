//! Identifier newtypes.
//!
//! Ids arrive from untrusted callers as raw strings. Wrapping them in
//! validated newtypes means the session and store layers never see a
//! malformed id — rejection happens once, at the boundary, as a client
//! error rather than a crash deeper down.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Length of a generated identifier: 24 hex characters (96 bits).
const ID_LEN: usize = 24;

fn is_well_formed(s: &str) -> bool {
    s.len() == ID_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Generates a random 24-character lowercase hex identifier.
fn generate_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; ID_LEN / 2] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// A unique identifier for a managed account.
///
/// Immutable once assigned. Constructed either by [`AccountId::generate`]
/// (account creation) or [`AccountId::parse`] (validating caller input).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Validates a caller-supplied string as an account id.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidAccountId`] if the string is not
    /// 24 hex characters.
    pub fn parse(s: &str) -> Result<Self, ProtocolError> {
        if is_well_formed(s) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(ProtocolError::InvalidAccountId(s.to_string()))
        }
    }

    /// Allocates a fresh random account id.
    pub fn generate() -> Self {
        Self(generate_id())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acct-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// OwnerId
// ---------------------------------------------------------------------------

/// The identifier of the user who owns an account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct OwnerId(pub i64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// QrId
// ---------------------------------------------------------------------------

/// A unique identifier for one QR credential-acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QrId(String);

impl QrId {
    /// Validates a caller-supplied string as a QR session id.
    pub fn parse(s: &str) -> Result<Self, ProtocolError> {
        if is_well_formed(s) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(ProtocolError::InvalidQrId(s.to_string()))
        }
    }

    /// Allocates a fresh random QR session id.
    pub fn generate() -> Self {
        Self(generate_id())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "qr-{}", self.0)
    }
}
