//! The per-account session actor.
//!
//! One Tokio task owns everything mutable about a session: the lifecycle
//! status, the backoff counters, the suppression flags, and the handle to
//! any pending reconnect timer. A second task (the pump) drains the
//! client's event stream into the actor's command channel, so commands
//! from the registry and events from the wire interleave on one queue and
//! are handled strictly in order.
//!
//! Reconnects are scheduled as detached timer tasks carrying a generation
//! number. Cancellation is cheap (abort + bump the generation) and a
//! late-firing timer is re-validated inside the actor before it is allowed
//! to touch the network, so stop/delete/forced-logoff can never race a
//! reconnect into reviving a session that should stay down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use farmhand_client::{
    AuthFailure, AuthOutcome, ClientEvent, LogoffReason, NetClient,
};
use farmhand_protocol::{
    AccountId, GameTarget, LogReason, PresenceState, SessionStatus,
};
use farmhand_store::{Account, FarmLogRecord, QrLoginRecord, Stores};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::SessionError;
use crate::backoff::{BackoffController, BackoffDecision};
use crate::qr::{self, QrContext};

// Bounded: a stalled actor back-pressures callers instead of buffering
// commands without limit.
const COMMAND_BUFFER: usize = 64;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Timing knobs for one session. Tests shrink these; production uses the
/// defaults.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Reconnect/suppression policy.
    pub backoff: crate::BackoffConfig,
    /// How long an unanswered QR challenge stays open.
    pub qr_timeout: Duration,
    /// Poll interval while the QR flow waits for the connection.
    pub qr_connect_poll: Duration,
    /// Connection attempts made after an endpoint redirect.
    pub redirect_attempts: u32,
    /// Delay before the first redirect attempt; doubles per attempt.
    pub redirect_base_delay: Duration,
    /// How long each redirect attempt is given to authenticate.
    pub redirect_settle: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backoff: crate::BackoffConfig::default(),
            qr_timeout: Duration::from_secs(600),
            qr_connect_poll: Duration::from_secs(1),
            redirect_attempts: 5,
            redirect_base_delay: Duration::from_secs(1),
            redirect_settle: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Everything the actor reacts to: caller commands, wire events, and the
/// session's own timers.
pub(crate) enum SessionCommand {
    Start,
    Stop {
        reason: LogReason,
        reply: oneshot::Sender<()>,
    },
    Resume {
        reply: oneshot::Sender<()>,
    },
    Delete {
        reply: oneshot::Sender<()>,
    },
    UpdateGames {
        games: Vec<GameTarget>,
        reply: oneshot::Sender<()>,
    },
    UpdatePresence {
        presence: PresenceState,
        reply: oneshot::Sender<()>,
    },
    GenerateQr {
        reply: oneshot::Sender<Result<QrLoginRecord, SessionError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    /// One event pumped off the client's stream.
    Event(ClientEvent),
    /// A scheduled reconnect timer fired. Stale generations are ignored.
    ReconnectDue { generation: u64 },
    /// The QR poller delivered fresh credentials.
    QrAuthenticated {
        display_name: String,
        refresh_token: String,
    },
}

/// A point-in-time view of the actor's state, for callers and tests.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub account_id: AccountId,
    pub status: SessionStatus,
    pub display_name: Option<String>,
    pub is_farming: bool,
    /// Automatic reconnection has been given up on until a resume.
    pub suppressed: bool,
    pub reconnect_pending: bool,
    pub backoff_attempts: u32,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// A cheap, cloneable handle to one session actor.
///
/// Every method is a message to the actor task; `Err(Closed)` means the
/// actor has terminated (deleted) and the handle should be discarded.
#[derive(Clone)]
pub struct SessionHandle {
    account_id: AccountId,
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// The account this session manages.
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Begins (or re-announces) farming. Ignored while the session is
    /// suppressed and waiting for a manual resume.
    pub async fn start(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Start).await
    }

    /// Stops farming: clears activity, persists the disabled flag, and
    /// disconnects. `reason` lands in the audit log.
    pub async fn stop(&self, reason: LogReason) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Stop { reason, reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Clears suppression and backoff state and reconnects.
    pub async fn resume(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Resume { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Stops the session and terminates the actor. The handle is useless
    /// afterwards.
    pub async fn delete(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Delete { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Replaces the activity-target list, announcing it if connected.
    pub async fn update_games(
        &self,
        games: Vec<GameTarget>,
    ) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::UpdateGames { games, reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Replaces the desired presence, pushing it if connected.
    pub async fn update_presence(
        &self,
        presence: PresenceState,
    ) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::UpdatePresence { presence, reply })
            .await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Starts a QR credential acquisition and returns the pending record
    /// once the challenge has been issued.
    ///
    /// # Errors
    /// Fails if the client refuses to issue a challenge or the session has
    /// terminated.
    pub async fn generate_qr(&self) -> Result<QrLoginRecord, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::GenerateQr { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Reads the actor's current state.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.tx.send(cmd).await.map_err(|_| SessionError::Closed)
    }
}

// ---------------------------------------------------------------------------
// Spawning
// ---------------------------------------------------------------------------

/// Spawns the actor and pump tasks for one account and returns the handle.
///
/// `activated` fires once the first QR login completes; the registry uses
/// it to defer managing a session until it has real credentials.
/// `auto_connect` makes the session dial out immediately (bootstrap and
/// start-farming paths); QR-only sessions pass `false` and connect on
/// [`SessionHandle::start`].
pub fn spawn_session<C: NetClient>(
    account: Account,
    client: C,
    stores: Stores,
    config: SessionConfig,
    activated: Option<oneshot::Sender<()>>,
    auto_connect: bool,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let client = Arc::new(client);

    let pump_client = client.clone();
    let pump_tx = tx.clone();
    tokio::spawn(async move {
        while let Some(event) = pump_client.next_event().await {
            if pump_tx.send(SessionCommand::Event(event)).await.is_err() {
                break;
            }
        }
    });

    let handle = SessionHandle {
        account_id: account.id.clone(),
        tx: tx.clone(),
    };
    let actor = SessionActor {
        backoff: BackoffController::new(config.backoff.clone()),
        account,
        status: SessionStatus::Unknown,
        client,
        stores,
        config,
        suppressed: false,
        needs_manual_resume: false,
        last_auth: None,
        last_forced_logoff: None,
        reconnect_generation: 0,
        pending_reconnect: None,
        redirect_cancel: None,
        activated,
        self_tx: tx,
        rx,
    };
    tokio::spawn(actor.run(auto_connect));
    handle
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct PendingReconnect {
    handle: JoinHandle<()>,
    generation: u64,
    scheduled_at: Instant,
}

struct SessionActor<C: NetClient> {
    account: Account,
    status: SessionStatus,
    client: Arc<C>,
    stores: Stores,
    config: SessionConfig,
    backoff: BackoffController,
    /// Automatic reconnection is off until a manual resume.
    suppressed: bool,
    /// Start commands are ignored until a manual resume.
    needs_manual_resume: bool,
    last_auth: Option<Instant>,
    last_forced_logoff: Option<Instant>,
    reconnect_generation: u64,
    pending_reconnect: Option<PendingReconnect>,
    /// Cancellation flag for a running endpoint-redirect retry loop.
    redirect_cancel: Option<Arc<AtomicBool>>,
    /// Fired once, on the first successful QR login.
    activated: Option<oneshot::Sender<()>>,
    self_tx: mpsc::Sender<SessionCommand>,
    rx: mpsc::Receiver<SessionCommand>,
}

impl<C: NetClient> SessionActor<C> {
    async fn run(mut self, auto_connect: bool) {
        info!(account = %self.account.id, "session started");
        if auto_connect {
            self.connect().await;
        }
        while let Some(cmd) = self.rx.recv().await {
            if self.handle_command(cmd).await {
                break;
            }
        }
        self.cancel_pending_reconnect();
        self.cancel_redirect();
        info!(account = %self.account.id, "session terminated");
    }

    /// Returns `true` when the actor should terminate.
    async fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::Start => self.handle_start().await,
            SessionCommand::Stop { reason, reply } => {
                self.shutdown(reason, SessionStatus::Stopped).await;
                let _ = reply.send(());
            }
            SessionCommand::Resume { reply } => {
                self.handle_resume().await;
                let _ = reply.send(());
            }
            SessionCommand::Delete { reply } => {
                self.shutdown(LogReason::UserDelete, SessionStatus::Deleted)
                    .await;
                let _ = reply.send(());
                return true;
            }
            SessionCommand::UpdateGames { games, reply } => {
                self.account.games = games;
                // Same semantics as Start: announce if connected,
                // reconnect if not, nothing while suppressed.
                self.handle_start().await;
                let _ = reply.send(());
            }
            SessionCommand::UpdatePresence { presence, reply } => {
                self.account.presence = presence;
                if self.client.is_connected() {
                    if let Err(e) = self.client.set_presence(presence).await {
                        warn!(
                            account = %self.account.id,
                            error = %e,
                            "failed to push presence"
                        );
                    }
                }
                let _ = reply.send(());
            }
            SessionCommand::GenerateQr { reply } => {
                let ctx = QrContext {
                    client: self.client.clone(),
                    stores: self.stores.clone(),
                    account: self.account.clone(),
                    session_tx: self.self_tx.clone(),
                    timeout: self.config.qr_timeout,
                    connect_poll: self.config.qr_connect_poll,
                };
                // begin() waits for the connection to come up; run it off
                // the actor loop so commands keep flowing meanwhile.
                tokio::spawn(async move {
                    let _ = reply.send(qr::begin(ctx).await);
                });
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(SessionSnapshot {
                    account_id: self.account.id.clone(),
                    status: self.status,
                    display_name: self.account.display_name.clone(),
                    is_farming: self.account.is_farming,
                    suppressed: self.suppressed,
                    reconnect_pending: self.pending_reconnect.is_some(),
                    backoff_attempts: self.backoff.attempts(),
                });
            }
            SessionCommand::Event(event) => self.handle_event(event).await,
            SessionCommand::ReconnectDue { generation } => {
                self.on_reconnect_due(generation).await;
            }
            SessionCommand::QrAuthenticated {
                display_name,
                refresh_token,
            } => {
                self.on_qr_authenticated(display_name, refresh_token).await;
            }
        }
        false
    }

    async fn handle_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Connected => self.on_connected().await,
            ClientEvent::Disconnected => self.on_disconnected().await,
            ClientEvent::AuthSucceeded(outcome) => {
                self.on_auth_succeeded(outcome).await;
            }
            ClientEvent::AuthFailed(failure) => {
                self.on_auth_failed(failure).await;
            }
            ClientEvent::LoggedOff(reason) => {
                self.on_logged_off(reason).await;
            }
        }
    }

    // -- lifecycle commands ------------------------------------------------

    async fn handle_start(&mut self) {
        if self.suppressed || self.needs_manual_resume {
            info!(
                account = %self.account.id,
                "start ignored, session requires a manual resume"
            );
            return;
        }
        self.account.is_farming = true;
        self.announce_or_connect().await;
    }

    async fn handle_resume(&mut self) {
        info!(account = %self.account.id, "resuming session");
        self.cancel_pending_reconnect();
        self.cancel_redirect();
        self.suppressed = false;
        self.needs_manual_resume = false;
        self.backoff.reset();
        self.last_forced_logoff = None;
        self.status = SessionStatus::Unknown;
        self.account.is_farming = true;
        if let Err(e) =
            self.stores.accounts.set_farming(&self.account.id, true).await
        {
            error!(
                account = %self.account.id,
                error = %e,
                "failed to persist farming flag"
            );
        }
        self.announce_or_connect().await;
    }

    /// Start/resume tail: a live authenticated connection just re-announces;
    /// a connection that never authenticated retries the logon; no
    /// connection dials out.
    async fn announce_or_connect(&mut self) {
        if !self.client.is_connected() {
            self.connect().await;
            return;
        }
        if self.status == SessionStatus::Active {
            self.announce_games().await;
        } else {
            self.on_connected().await;
        }
    }

    /// Shared stop/delete path: tear everything down, persist the disabled
    /// flag, audit, disconnect.
    async fn shutdown(&mut self, reason: LogReason, status: SessionStatus) {
        info!(account = %self.account.id, %status, "stopping session");
        self.cancel_pending_reconnect();
        self.cancel_redirect();
        // A trailing Disconnected from our own disconnect() must not
        // schedule a reconnect.
        self.suppressed = true;
        if self.client.is_connected() {
            if let Err(e) = self.client.send_activity(&[]).await {
                warn!(
                    account = %self.account.id,
                    error = %e,
                    "failed to clear activity"
                );
            }
        }
        self.account.is_farming = false;
        if let Err(e) =
            self.stores.accounts.set_farming(&self.account.id, false).await
        {
            error!(
                account = %self.account.id,
                error = %e,
                "failed to persist farming flag"
            );
        }
        self.status = status;
        self.audit(reason).await;
        self.client.disconnect().await;
    }

    // -- wire events --------------------------------------------------------

    async fn on_connected(&mut self) {
        if self.status == SessionStatus::Active {
            return;
        }
        info!(account = %self.account.id, "connected");
        let Some(token) = self.account.refresh_token.clone() else {
            info!(
                account = %self.account.id,
                "no stored credentials, waiting for qr login"
            );
            self.status = SessionStatus::NeedAuth;
            return;
        };
        if let Err(e) = self
            .client
            .authenticate(self.account.display_name.as_deref(), &token)
            .await
        {
            warn!(
                account = %self.account.id,
                error = %e,
                "failed to start authentication"
            );
            self.status = SessionStatus::NeedAuth;
        }
    }

    async fn on_auth_succeeded(&mut self, outcome: AuthOutcome) {
        self.status = SessionStatus::Active;
        self.last_auth = Some(Instant::now());
        self.backoff.reset();
        self.suppressed = false;
        self.needs_manual_resume = false;
        self.cancel_pending_reconnect();
        self.cancel_redirect();
        if let Some(name) = outcome.display_name {
            self.account.display_name = Some(name);
        }
        info!(
            account = %self.account.id,
            name = ?self.account.display_name,
            "authenticated"
        );
        if let Err(e) =
            self.client.set_presence(self.account.presence).await
        {
            warn!(
                account = %self.account.id,
                error = %e,
                "failed to set presence"
            );
        }
        if !self.account.games.is_empty() {
            self.announce_games().await;
        }
    }

    async fn on_auth_failed(&mut self, failure: AuthFailure) {
        match failure {
            AuthFailure::TryAnotherEndpoint => {
                warn!(
                    account = %self.account.id,
                    "service redirected the session to another endpoint"
                );
                self.status = SessionStatus::TryAnotherCM;
                self.needs_manual_resume = true;
                self.cancel_pending_reconnect();
                self.audit(LogReason::TryAnotherCM).await;
                self.spawn_redirect_loop();
            }
            AuthFailure::Denied(msg) => {
                info!(
                    account = %self.account.id,
                    reason = %msg,
                    "authentication denied"
                );
                self.status = SessionStatus::NeedAuth;
                self.audit(LogReason::AuthError).await;
            }
        }
    }

    async fn on_logged_off(&mut self, reason: LogoffReason) {
        self.last_forced_logoff = Some(Instant::now());
        match reason {
            LogoffReason::SignedInElsewhere => {
                warn!(
                    account = %self.account.id,
                    "logged off: account signed in elsewhere"
                );
                self.cancel_pending_reconnect();
                self.suppressed = true;
                self.needs_manual_resume = true;
                self.account.is_farming = false;
                if let Err(e) = self
                    .stores
                    .accounts
                    .set_farming(&self.account.id, false)
                    .await
                {
                    error!(
                        account = %self.account.id,
                        error = %e,
                        "failed to persist farming flag"
                    );
                }
                self.status = SessionStatus::Stopped;
                self.audit(LogReason::LoggedInElsewhere).await;
            }
            LogoffReason::Other(msg) => {
                info!(
                    account = %self.account.id,
                    reason = %msg,
                    "logged off by the service"
                );
                self.status = SessionStatus::NeedAuth;
            }
        }
    }

    async fn on_disconnected(&mut self) {
        if self.status == SessionStatus::Active {
            self.status = SessionStatus::Unknown;
        }
        if self.suppressed {
            debug!(account = %self.account.id, "disconnect while suppressed");
            return;
        }
        if self.redirect_active() {
            debug!(
                account = %self.account.id,
                "disconnect during endpoint retry loop"
            );
            return;
        }
        let decision = self.backoff.on_disconnect(
            Instant::now(),
            self.last_auth,
            self.last_forced_logoff,
        );
        match decision {
            BackoffDecision::Retry { delay } => {
                info!(
                    account = %self.account.id,
                    delay_secs = delay.as_secs(),
                    "scheduling reconnect"
                );
                self.schedule_reconnect(delay);
            }
            BackoffDecision::Suppress(reason) => {
                warn!(
                    account = %self.account.id,
                    ?reason,
                    "giving up on automatic reconnection"
                );
                self.cancel_pending_reconnect();
                self.suppressed = true;
                self.needs_manual_resume = true;
                self.status = SessionStatus::TryAnotherCM;
                self.audit(LogReason::TryAnotherCM).await;
            }
            BackoffDecision::Skip => {
                debug!(account = %self.account.id, "disconnect, no action");
            }
        }
    }

    // -- reconnect scheduling ------------------------------------------------

    fn schedule_reconnect(&mut self, delay: Duration) {
        self.cancel_pending_reconnect();
        self.reconnect_generation += 1;
        let generation = self.reconnect_generation;
        let tx = self.self_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SessionCommand::ReconnectDue { generation }).await;
        });
        self.pending_reconnect = Some(PendingReconnect {
            handle,
            generation,
            scheduled_at: Instant::now(),
        });
    }

    fn cancel_pending_reconnect(&mut self) {
        if let Some(pending) = self.pending_reconnect.take() {
            pending.handle.abort();
        }
    }

    /// Re-validates a fired reconnect timer. The world may have changed
    /// between scheduling and firing, so every blocking condition is
    /// checked again here, inside the actor.
    async fn on_reconnect_due(&mut self, generation: u64) {
        let scheduled_at = match &self.pending_reconnect {
            Some(p) if p.generation == generation => p.scheduled_at,
            // Superseded or cancelled timer.
            _ => return,
        };
        self.pending_reconnect = None;
        if self.suppressed {
            return;
        }
        if let Some(logoff) = self.last_forced_logoff {
            if logoff > scheduled_at {
                debug!(
                    account = %self.account.id,
                    "forced logoff since scheduling, abandoning reconnect"
                );
                return;
            }
        }
        match self.stores.accounts.find(&self.account.id).await {
            Ok(Some(stored)) if !stored.is_farming => {
                info!(
                    account = %self.account.id,
                    "farming disabled since scheduling, abandoning reconnect"
                );
                return;
            }
            Ok(_) => {}
            Err(e) => {
                // A store outage must not strand the session offline.
                warn!(
                    account = %self.account.id,
                    error = %e,
                    "could not re-check farming flag, reconnecting anyway"
                );
            }
        }
        if self.client.is_connected() {
            debug!(account = %self.account.id, "already connected");
            return;
        }
        self.connect().await;
    }

    // -- endpoint redirect ----------------------------------------------------

    /// Retries the connection against other endpoints with doubling delays.
    /// Runs detached; cancelled via the shared flag when auth succeeds or
    /// the user stops/deletes/resumes the session.
    fn spawn_redirect_loop(&mut self) {
        self.cancel_redirect();
        let cancel = Arc::new(AtomicBool::new(false));
        self.redirect_cancel = Some(cancel.clone());
        let client = self.client.clone();
        let account = self.account.id.clone();
        let attempts = self.config.redirect_attempts;
        let base = self.config.redirect_base_delay;
        let settle = self.config.redirect_settle;
        tokio::spawn(async move {
            for attempt in 0..attempts {
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
                client.disconnect().await;
                let delay = base.saturating_mul(1 << attempt.min(16));
                tokio::time::sleep(delay).await;
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
                info!(%account, attempt, "retrying against another endpoint");
                if let Err(e) = client.connect().await {
                    warn!(%account, error = %e, "endpoint retry failed");
                    continue;
                }
                // Give this connection time to authenticate before the
                // next attempt tears it down.
                tokio::time::sleep(settle).await;
            }
            info!(%account, "endpoint retry attempts exhausted");
        });
    }

    fn cancel_redirect(&mut self) {
        if let Some(cancel) = self.redirect_cancel.take() {
            cancel.store(true, Ordering::Relaxed);
        }
    }

    fn redirect_active(&self) -> bool {
        self.redirect_cancel
            .as_ref()
            .is_some_and(|c| !c.load(Ordering::Relaxed))
    }

    // -- qr completion ---------------------------------------------------------

    async fn on_qr_authenticated(
        &mut self,
        display_name: String,
        refresh_token: String,
    ) {
        info!(
            account = %self.account.id,
            name = %display_name,
            "qr credentials received"
        );
        self.account.display_name = Some(display_name);
        self.account.refresh_token = Some(refresh_token.clone());
        if self.client.is_connected() {
            if let Err(e) = self
                .client
                .authenticate(self.account.display_name.as_deref(), &refresh_token)
                .await
            {
                warn!(
                    account = %self.account.id,
                    error = %e,
                    "failed to start authentication after qr login"
                );
            }
        }
        if let Some(activated) = self.activated.take() {
            let _ = activated.send(());
        }
    }

    // -- helpers -----------------------------------------------------------

    async fn connect(&mut self) {
        debug!(account = %self.account.id, "connecting");
        if let Err(e) = self.client.connect().await {
            warn!(account = %self.account.id, error = %e, "connect failed");
            self.audit(LogReason::ConnectionError).await;
            // A failed dial is handled like a disconnect so the usual
            // backoff policy drives the retry.
            self.on_disconnected().await;
        }
    }

    async fn announce_games(&mut self) {
        match self.client.send_activity(&self.account.games).await {
            Ok(()) => {
                info!(
                    account = %self.account.id,
                    games = self.account.games.len(),
                    "activity announced"
                );
                self.audit(LogReason::GamesSend).await;
            }
            Err(e) => {
                warn!(
                    account = %self.account.id,
                    error = %e,
                    "failed to announce activity"
                );
            }
        }
    }

    /// Appends an audit entry. Log failures are logged and swallowed; the
    /// lifecycle never stalls on the audit trail.
    async fn audit(&self, reason: LogReason) {
        let record = FarmLogRecord {
            account_id: self.account.id.clone(),
            display_name: self.account.display_name.clone(),
            owner_id: self.account.owner_id,
            status: self.status,
            reason,
            recorded_at: SystemTime::now(),
        };
        if let Err(e) = self.stores.farm_log.append(&record).await {
            error!(
                account = %self.account.id,
                error = %e,
                "failed to append farm log entry"
            );
        }
    }
}
