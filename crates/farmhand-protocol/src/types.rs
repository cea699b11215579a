//! Status vocabulary and activity targets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// GameTarget
// ---------------------------------------------------------------------------

/// One activity target announced while farming.
///
/// Targets are heterogeneous: either a numeric application id or a
/// free-text label for a custom activity. Modeled as a tagged variant so
/// the conversion rules live here instead of in untyped JSON juggling at
/// every call site.
///
/// Serialized untagged: a number becomes `570`, a label becomes
/// `"my custom game"`, matching how callers supply mixed lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GameTarget {
    /// A numeric application id.
    App(u64),
    /// A free-text activity label.
    Label(String),
}

impl GameTarget {
    /// Parses a loosely-typed JSON-ish value into a target.
    ///
    /// Numbers (including numeric strings) become [`GameTarget::App`];
    /// anything else textual becomes [`GameTarget::Label`]. This is the
    /// single conversion point at the persistence/API boundary.
    pub fn from_loose(value: &str) -> Self {
        match value.parse::<u64>() {
            Ok(id) => Self::App(id),
            Err(_) => Self::Label(value.to_string()),
        }
    }
}

impl fmt::Display for GameTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::App(id) => write!(f, "{id}"),
            Self::Label(name) => write!(f, "{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// PresenceState
// ---------------------------------------------------------------------------

/// The desired presence/status value shown for an authenticated session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    Offline,
    #[default]
    Online,
    Busy,
    Away,
    Snooze,
    LookingToTrade,
    LookingToPlay,
}

impl PresenceState {
    /// Maps a caller-supplied numeric value to a presence state.
    ///
    /// # Errors
    /// Returns [`ProtocolError::UnknownPresence`] for values outside the
    /// known range — caller input, so a client error rather than a panic.
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Self::Offline),
            1 => Ok(Self::Online),
            2 => Ok(Self::Busy),
            3 => Ok(Self::Away),
            4 => Ok(Self::Snooze),
            5 => Ok(Self::LookingToTrade),
            6 => Ok(Self::LookingToPlay),
            other => Err(ProtocolError::UnknownPresence(other)),
        }
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Offline => "Offline",
            Self::Online => "Online",
            Self::Busy => "Busy",
            Self::Away => "Away",
            Self::Snooze => "Snooze",
            Self::LookingToTrade => "LookingToTrade",
            Self::LookingToPlay => "LookingToPlay",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// The lifecycle state of one account session.
///
/// ```text
///                 ┌──(connect, no token)──→ NeedAuth
/// Unknown ────────┤
///                 └──(auth success)───────→ Active
///
/// Active ──(signed in elsewhere / Stop)──→ Stopped
/// Active ──(auth redirect, retries out)──→ TryAnotherCM
/// any    ──(Delete)──────────────────────→ Deleted (terminal)
/// ```
///
/// `Stopped` and `TryAnotherCM` require an explicit user resume to leave;
/// `Deleted` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
pub enum SessionStatus {
    #[default]
    Unknown,
    NeedAuth,
    Active,
    Stopped,
    Deleted,
    TryAnotherCM,
}

impl SessionStatus {
    /// Returns `true` if the session can still be driven by events.
    /// `Deleted` sessions ignore everything.
    pub fn is_live(&self) -> bool {
        !matches!(self, Self::Deleted)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown",
            Self::NeedAuth => "NeedAuth",
            Self::Active => "Active",
            Self::Stopped => "Stopped",
            Self::Deleted => "Deleted",
            Self::TryAnotherCM => "TryAnotherCM",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// LogReason
// ---------------------------------------------------------------------------

/// Closed set of reason codes for farm log (audit) entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogReason {
    /// Activity announcement was sent for a non-empty game list.
    GamesSend,
    /// User explicitly stopped farming.
    UserStop,
    /// User deleted the account.
    UserDelete,
    /// Authentication was rejected by the remote service.
    AuthError,
    /// Connection-level failure.
    ConnectionError,
    /// Anything that doesn't fit the other codes.
    UnknownError,
    /// The remote service reported the account signed in elsewhere.
    LoggedInElsewhere,
    /// Reconnect attempts were suppressed and the session parked in
    /// the TryAnotherCM state.
    TryAnotherCM,
}

impl fmt::Display for LogReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GamesSend => "GamesSend",
            Self::UserStop => "UserStop",
            Self::UserDelete => "UserDelete",
            Self::AuthError => "AuthError",
            Self::ConnectionError => "ConnectionError",
            Self::UnknownError => "UnknownError",
            Self::LoggedInElsewhere => "LoggedInElsewhere",
            Self::TryAnotherCM => "TryAnotherCM",
        };
        write!(f, "{name}")
    }
}
