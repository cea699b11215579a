//! The backoff controller: pure decision logic for disconnect handling.
//!
//! Given a disconnect event and recent history, decides whether to retry,
//! how long to wait, or when to give up and suppress automatic retries
//! entirely. It never touches the network or the clock itself — the
//! caller passes `now` in — which keeps every policy branch unit-testable
//! without sleeping.
//!
//! Two distinct loop breakers:
//!
//! - **Flapping after login**: disconnects landing right after a
//!   successful authentication usually mean a server-side or credential
//!   problem that retrying won't fix. These bump their own counter and
//!   never schedule a reconnect.
//! - **Retry storm**: too many ordinary reconnect attempts inside a short
//!   rolling window. This is the primary reconnect-storm breaker.

use std::time::Duration;

use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunable windows and limits for the backoff policy.
///
/// Tests inject tiny values; production uses the defaults.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// A disconnect within this window of the last successful auth counts
    /// as an "immediate disconnect" (flapping).
    pub immediate_window: Duration,
    /// Immediate disconnects within the rolling window before auto
    /// reconnect is permanently suppressed.
    pub immediate_limit: u32,
    /// Skip scheduling when a forced logoff happened this recently —
    /// avoids racing with logoff-driven state changes.
    pub logoff_grace: Duration,
    /// Rolling window for ordinary reconnect attempts.
    pub attempt_window: Duration,
    /// Attempts allowed inside the window; one more suppresses.
    pub attempt_limit: u32,
    /// First retry delay; doubles per attempt.
    pub base_delay: Duration,
    /// Ceiling for the computed delay.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            immediate_window: Duration::from_secs(10),
            immediate_limit: 3,
            logoff_grace: Duration::from_secs(5),
            attempt_window: Duration::from_secs(30),
            attempt_limit: 2,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(60),
        }
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Why automatic reconnection was given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Repeated disconnects immediately after successful logins.
    FlappingAfterLogin,
    /// Too many reconnect attempts inside the rolling window.
    RetryStorm,
}

/// The outcome of evaluating one disconnect event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffDecision {
    /// Schedule a reconnect after `delay`.
    Retry { delay: Duration },
    /// Permanently suppress automatic reconnection.
    Suppress(SuppressReason),
    /// Do nothing for this event.
    Skip,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Mutable counter state for one session's reconnect policy.
///
/// Owned exclusively by the session actor; only the actor task mutates it.
#[derive(Debug)]
pub struct BackoffController {
    config: BackoffConfig,
    /// Ordinary reconnect attempts inside the current window.
    attempts: u32,
    window_start: Option<Instant>,
    /// Disconnects right after a successful auth, inside their own window.
    immediate_count: u32,
    immediate_window_start: Option<Instant>,
}

impl BackoffController {
    /// Creates a controller with all counters at zero.
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            attempts: 0,
            window_start: None,
            immediate_count: 0,
            immediate_window_start: None,
        }
    }

    /// Evaluates one disconnect event.
    ///
    /// `last_auth` / `last_forced_logoff` are the session's timestamps of
    /// the most recent successful authentication and forced logoff.
    pub fn on_disconnect(
        &mut self,
        now: Instant,
        last_auth: Option<Instant>,
        last_forced_logoff: Option<Instant>,
    ) -> BackoffDecision {
        // 1. Flapping: disconnected right after logging in successfully.
        //    Never schedules a reconnect by itself.
        if let Some(auth) = last_auth {
            if now.duration_since(auth) < self.config.immediate_window {
                self.roll_immediate_window(now);
                self.immediate_count += 1;
                if self.immediate_count >= self.config.immediate_limit {
                    return BackoffDecision::Suppress(
                        SuppressReason::FlappingAfterLogin,
                    );
                }
                return BackoffDecision::Skip;
            }
        }

        // 2. A forced logoff just happened; its own handler owns the next
        //    state change.
        if let Some(logoff) = last_forced_logoff {
            if now.duration_since(logoff) < self.config.logoff_grace {
                return BackoffDecision::Skip;
            }
        }

        // 3. Ordinary attempt accounting in a rolling window.
        self.roll_attempt_window(now);
        self.attempts += 1;
        if self.attempts > self.config.attempt_limit {
            return BackoffDecision::Suppress(SuppressReason::RetryStorm);
        }

        // 4. Exponential delay: base * 2^(attempt-1), capped.
        let exp = self.attempts.saturating_sub(1).min(16);
        let delay = self
            .config
            .base_delay
            .saturating_mul(1 << exp)
            .min(self.config.max_delay);
        BackoffDecision::Retry { delay }
    }

    /// Resets every counter and window. Called on successful
    /// authentication and on user-driven resume.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.window_start = None;
        self.immediate_count = 0;
        self.immediate_window_start = None;
    }

    /// Current attempt count inside the rolling window.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn roll_attempt_window(&mut self, now: Instant) {
        match self.window_start {
            Some(start)
                if now.duration_since(start)
                    <= self.config.attempt_window => {}
            _ => {
                self.window_start = Some(now);
                self.attempts = 0;
            }
        }
    }

    fn roll_immediate_window(&mut self, now: Instant) {
        match self.immediate_window_start {
            Some(start)
                if now.duration_since(start)
                    <= self.config.immediate_window => {}
            _ => {
                self.immediate_window_start = Some(now);
                self.immediate_count = 0;
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
