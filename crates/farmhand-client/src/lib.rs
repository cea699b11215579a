//! Network client abstraction for Farmhand.
//!
//! Farmhand doesn't implement the remote wire protocol itself — the
//! underlying client is an opaque collaborator supplied by the embedder.
//! This crate defines that boundary:
//!
//! - [`NetClient`] — one live connection to the remote service
//! - [`ClientEvent`] — the event stream the session's pump task drains
//! - [`PendingQrLogin`] — a challenge-login in flight
//! - [`ClientFactory`] — builds one client per account session
//!
//! The callback-driven model of typical protocol libraries is abstracted
//! as an event stream consumed by a single dedicated task per session,
//! which preserves per-session event ordering without a global lock.

mod error;

pub use error::ClientError;

use farmhand_protocol::{GameTarget, PresenceState};
use tokio::sync::oneshot;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Why the remote service refused an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// The endpoint asked us to retry against a different one.
    TryAnotherEndpoint,
    /// The credentials were rejected outright.
    Denied(String),
}

/// Why the remote service force-logged the session off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoffReason {
    /// The same account signed in from somewhere else.
    SignedInElsewhere,
    /// Any other service-side logoff.
    Other(String),
}

/// Result data delivered with a successful authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthOutcome {
    /// Display name confirmed by the service, if it reported one.
    pub display_name: Option<String>,
}

/// One event from the underlying connection, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The connection to the remote service is established.
    Connected,
    /// The connection dropped (any cause).
    Disconnected,
    /// Authentication succeeded; the session is logged on.
    AuthSucceeded(AuthOutcome),
    /// Authentication failed.
    AuthFailed(AuthFailure),
    /// The service forcibly logged the session off.
    LoggedOff(LogoffReason),
}

// ---------------------------------------------------------------------------
// QR login
// ---------------------------------------------------------------------------

/// Credentials delivered when a QR challenge is approved out-of-band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrLoginResult {
    /// The account's display name as confirmed by the service.
    pub display_name: String,
    /// The long-lived credential token for future logons.
    pub refresh_token: String,
}

/// A challenge login in flight.
///
/// `challenge_url` is the opaque string to render as a QR code. `result`
/// resolves when the user approves (or the service rejects) the challenge;
/// if the client drops the login, the receiver resolves with an error.
#[derive(Debug)]
pub struct PendingQrLogin {
    pub challenge_url: String,
    pub result: oneshot::Receiver<Result<QrLoginResult, ClientError>>,
}

// ---------------------------------------------------------------------------
// NetClient
// ---------------------------------------------------------------------------

/// One live connection to the remote service.
///
/// All methods take `&self`: implementations handle their own interior
/// mutability, and the session layer shares the client between the actor
/// task and short-lived helper tasks via `Arc`.
///
/// Methods return `impl Future + Send` (rather than bare `async fn`) so
/// the session layer can drive them from spawned tasks. Implementations
/// still just write `async fn`.
///
/// # Event delivery
///
/// [`next_event`](Self::next_event) must yield events in arrival order and
/// return `None` only when the client is permanently torn down. Exactly one
/// consumer (the session's pump) calls it.
pub trait NetClient: Send + Sync + 'static {
    /// Initiates a connection. Completion is signaled by
    /// [`ClientEvent::Connected`], not by this returning.
    fn connect(
        &self,
    ) -> impl std::future::Future<Output = Result<(), ClientError>> + Send;

    /// Tears the connection down. Best-effort; never fails.
    fn disconnect(&self) -> impl std::future::Future<Output = ()> + Send;

    /// Whether the connection is currently established.
    fn is_connected(&self) -> bool;

    /// Announces the given activity targets. An empty slice announces
    /// "doing nothing" (used when stopping).
    fn send_activity(
        &self,
        targets: &[GameTarget],
    ) -> impl std::future::Future<Output = Result<(), ClientError>> + Send;

    /// Pushes the desired presence value.
    fn set_presence(
        &self,
        state: PresenceState,
    ) -> impl std::future::Future<Output = Result<(), ClientError>> + Send;

    /// Starts an authentication exchange with a stored credential token.
    /// The outcome arrives as [`ClientEvent::AuthSucceeded`] or
    /// [`ClientEvent::AuthFailed`].
    fn authenticate(
        &self,
        display_name: Option<&str>,
        refresh_token: &str,
    ) -> impl std::future::Future<Output = Result<(), ClientError>> + Send;

    /// Requests a QR login challenge from the service.
    ///
    /// # Errors
    /// Fails if the connection is not established or the service refuses
    /// to issue a challenge.
    fn begin_qr_login(
        &self,
    ) -> impl std::future::Future<Output = Result<PendingQrLogin, ClientError>>
    + Send;

    /// Waits for the next connection event. Returns `None` once the
    /// client is permanently closed.
    fn next_event(
        &self,
    ) -> impl std::future::Future<Output = Option<ClientEvent>> + Send;
}

/// Builds one [`NetClient`] per account session.
///
/// The registry owns a factory and creates a fresh client whenever it
/// spawns a session, the same way a server creates one connection handler
/// per accepted socket.
pub trait ClientFactory: Send + Sync + 'static {
    /// The client type this factory produces.
    type Client: NetClient;

    /// Creates a new, not-yet-connected client.
    fn create(&self) -> Self::Client;
}
