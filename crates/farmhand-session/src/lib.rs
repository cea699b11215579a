//! Per-account session lifecycle supervision for Farmhand.
//!
//! This crate is the core of the system. It handles:
//!
//! 1. **The session state machine** — connect, authenticate, disconnect,
//!    reconnect, stop, delete ([`SessionHandle`] / the session actor)
//! 2. **Reconnect policy** — adaptive backoff, loop suppression, and
//!    cooldowns ([`BackoffController`])
//! 3. **Credential acquisition** — the one-shot, timeout-bounded QR flow
//!
//! # How it fits in the stack
//!
//! ```text
//! farmhand (registry, above)   ← one SessionHandle per managed account
//!     ↕
//! Session layer (this crate)   ← the state machine and its policies
//!     ↕
//! farmhand-client / -store     ← network and persistence collaborators
//! ```
//!
//! # Concurrency note
//!
//! Each session runs as an actor: one Tokio task owns all mutable session
//! state (status, counters, flags, the pending-reconnect handle) and is
//! the only code that touches it. Everyone else — the registry, scheduled
//! reconnect timers, the QR poller — talks to the actor through its
//! command channel, so counter updates and reconnect cancellation are
//! naturally atomic without locks.

mod backoff;
mod error;
mod qr;
mod session;

pub use backoff::{
    BackoffConfig, BackoffController, BackoffDecision, SuppressReason,
};
pub use error::SessionError;
pub use session::{
    SessionConfig, SessionHandle, SessionSnapshot, spawn_session,
};
