//! Shared vocabulary for Farmhand.
//!
//! This crate defines every type that crosses a layer boundary:
//!
//! 1. **Identifiers** — validated newtypes for accounts, owners, and QR
//!    login sessions ([`AccountId`], [`OwnerId`], [`QrId`])
//! 2. **Activity targets** — what a session announces while farming
//!    ([`GameTarget`])
//! 3. **Status vocabulary** — session lifecycle states, presence values,
//!    and audit reason codes ([`SessionStatus`], [`PresenceState`],
//!    [`LogReason`])
//!
//! # How it fits in the stack
//!
//! ```text
//! farmhand (registry)          ← validates caller-supplied ids
//!     ↕
//! farmhand-session (core)      ← drives SessionStatus transitions
//!     ↕
//! farmhand-client / -store     ← speak GameTarget, PresenceState, LogReason
//! ```

mod error;
mod ids;
mod types;

pub use error::ProtocolError;
pub use ids::{AccountId, OwnerId, QrId};
pub use types::{GameTarget, LogReason, PresenceState, SessionStatus};
