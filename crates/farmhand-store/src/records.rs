//! Durable record types.

use std::time::SystemTime;

use farmhand_protocol::{
    AccountId, GameTarget, OwnerId, PresenceState, QrId, SessionStatus,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A managed account whose remote session the system keeps alive.
///
/// The id is immutable once assigned. `refresh_token` is the only field
/// that gates whether automatic reconnection is possible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner_id: OwnerId,
    /// Assigned at first successful authentication.
    pub display_name: Option<String>,
    /// Long-lived credential token; `None` until authenticated.
    pub refresh_token: Option<String>,
    /// Ordered activity targets announced while farming.
    pub games: Vec<GameTarget>,
    /// Desired presence once authenticated.
    pub presence: PresenceState,
    pub is_farming: bool,
}

impl Account {
    /// Creates a fresh account for an owner with the stock defaults:
    /// farming enabled, online presence, one default activity target.
    pub fn new(owner_id: OwnerId) -> Self {
        Self {
            id: AccountId::generate(),
            owner_id,
            display_name: None,
            refresh_token: None,
            games: vec![GameTarget::App(570)],
            presence: PresenceState::Online,
            is_farming: true,
        }
    }
}

// ---------------------------------------------------------------------------
// QR login records
// ---------------------------------------------------------------------------

/// Status of a QR credential-acquisition attempt.
///
/// Monotonic: once a record leaves `Waiting` it never goes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrStatus {
    Waiting,
    Completed,
    Expired,
    Error(String),
}

impl QrStatus {
    /// Returns `true` once the attempt has reached a final status.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Waiting)
    }
}

/// The one-shot outcome applied to a waiting QR record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrSettle {
    Completed {
        display_name: String,
        refresh_token: String,
    },
    Expired,
    Error(String),
}

/// One QR credential-acquisition attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrLoginRecord {
    pub id: QrId,
    pub account_id: AccountId,
    /// Opaque string to render as a QR code.
    pub challenge_url: String,
    pub status: QrStatus,
    /// Filled when the attempt completes.
    pub display_name: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: SystemTime,
}

impl QrLoginRecord {
    /// Creates a new waiting record for an account's challenge.
    pub fn new(account_id: AccountId, challenge_url: String) -> Self {
        Self {
            id: QrId::generate(),
            account_id,
            challenge_url,
            status: QrStatus::Waiting,
            display_name: None,
            refresh_token: None,
            created_at: SystemTime::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Farm log
// ---------------------------------------------------------------------------

/// One append-only audit entry. Write-only from the core's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmLogRecord {
    pub account_id: AccountId,
    pub display_name: Option<String>,
    pub owner_id: OwnerId,
    /// Session lifecycle status at the time of the event.
    pub status: SessionStatus,
    pub reason: farmhand_protocol::LogReason,
    pub recorded_at: SystemTime,
}
