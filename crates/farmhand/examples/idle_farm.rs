//! Minimal end-to-end demo with a simulated network client.
//!
//! Seeds one account with stored credentials, bootstraps the registry,
//! farms for a simulated while, then stops. Run with:
//!
//! ```sh
//! RUST_LOG=debug cargo run --example idle_farm
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use farmhand::client::{
    AuthOutcome, ClientError, ClientEvent, ClientFactory, NetClient,
    PendingQrLogin,
};
use farmhand::protocol::{GameTarget, OwnerId, PresenceState};
use farmhand::session::SessionConfig;
use farmhand::store::{Account, MemoryStore, Stores};
use farmhand::{Farm, FarmhandError};
use tokio::sync::mpsc;

/// A stand-in for a real protocol client: every connect succeeds and every
/// stored token authenticates.
struct SimClient {
    connected: AtomicBool,
    events_tx: mpsc::UnboundedSender<ClientEvent>,
    events_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ClientEvent>>,
}

impl SimClient {
    fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connected: AtomicBool::new(false),
            events_tx,
            events_rx: tokio::sync::Mutex::new(events_rx),
        }
    }
}

impl NetClient for SimClient {
    async fn connect(&self) -> Result<(), ClientError> {
        self.connected.store(true, Ordering::SeqCst);
        let _ = self.events_tx.send(ClientEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_activity(
        &self,
        targets: &[GameTarget],
    ) -> Result<(), ClientError> {
        tracing::info!(?targets, "sim: activity announced");
        Ok(())
    }

    async fn set_presence(
        &self,
        state: PresenceState,
    ) -> Result<(), ClientError> {
        tracing::info!(%state, "sim: presence set");
        Ok(())
    }

    async fn authenticate(
        &self,
        display_name: Option<&str>,
        _refresh_token: &str,
    ) -> Result<(), ClientError> {
        let _ = self.events_tx.send(ClientEvent::AuthSucceeded(
            AuthOutcome {
                display_name: Some(
                    display_name.unwrap_or("sim-farmer").to_string(),
                ),
            },
        ));
        Ok(())
    }

    async fn begin_qr_login(&self) -> Result<PendingQrLogin, ClientError> {
        Err(ClientError::ChallengeRefused(
            "sim client has no qr support".into(),
        ))
    }

    async fn next_event(&self) -> Option<ClientEvent> {
        self.events_rx.lock().await.recv().await
    }
}

struct SimFactory;

impl ClientFactory for SimFactory {
    type Client = SimClient;

    fn create(&self) -> SimClient {
        SimClient::new()
    }
}

#[tokio::main]
async fn main() -> Result<(), FarmhandError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let store = Arc::new(MemoryStore::new());
    let mut account = Account::new(OwnerId(1));
    account.refresh_token = Some("sim-token".into());
    account.games = vec![GameTarget::App(570), GameTarget::Label("idling".into())];
    let account_id = account.id.clone();
    store.seed_account(account);

    let stores = Stores {
        accounts: store.clone(),
        qr: store.clone(),
        farm_log: store.clone(),
    };
    let farm = Farm::new(SimFactory, stores, SessionConfig::default());

    let started = farm.initial_start().await?;
    tracing::info!(started, "farm bootstrapped");

    tokio::time::sleep(Duration::from_secs(2)).await;
    if let Some(handle) = farm.session_handle(&account_id) {
        let snap = handle.snapshot().await?;
        tracing::info!(?snap, "session state");
    }

    farm.stop_farming(&account_id).await?;
    for entry in store.log_entries() {
        tracing::info!(reason = ?entry.reason, status = %entry.status, "audit entry");
    }
    Ok(())
}
