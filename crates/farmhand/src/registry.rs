//! The account registry: one live session per managed account.
//!
//! [`Farm`] is the top-level entry point. It owns the mapping from account
//! id to [`SessionHandle`], persists field updates whether or not a live
//! session exists, and guarantees that concurrent operations never spawn
//! two sessions for the same account (the map's entry API serializes
//! insertion per key, so exactly one caller wins).

use std::sync::Arc;

use dashmap::DashMap;
use farmhand_client::ClientFactory;
use farmhand_protocol::{
    AccountId, GameTarget, LogReason, OwnerId, PresenceState,
};
use farmhand_session::{SessionConfig, SessionHandle, spawn_session};
use farmhand_store::{Account, QrLoginRecord, Stores};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::FarmhandError;

/// The session registry.
///
/// Cheap to share: clone it or wrap it in an `Arc`, every method takes
/// `&self`.
pub struct Farm<F: ClientFactory> {
    factory: F,
    stores: Stores,
    config: SessionConfig,
    sessions: Arc<DashMap<AccountId, SessionHandle>>,
}

impl<F: ClientFactory> Farm<F> {
    /// Creates an empty registry. Call [`initial_start`](Self::initial_start)
    /// afterwards to revive persisted sessions.
    pub fn new(factory: F, stores: Stores, config: SessionConfig) -> Self {
        Self {
            factory,
            stores,
            config,
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Constructs a session for every persisted account, connecting only
    /// the ones with farming enabled. Returns how many were connected.
    ///
    /// # Errors
    /// Fails only if the account list cannot be loaded; individual
    /// sessions report their problems through their own lifecycle.
    pub async fn initial_start(&self) -> Result<usize, FarmhandError> {
        let accounts = self.stores.accounts.find_all().await?;
        let mut connected = 0;
        for account in accounts {
            if self.sessions.contains_key(&account.id) {
                continue;
            }
            let farming = account.is_farming;
            info!(account = %account.id, farming, "reviving persisted session");
            self.session_or_spawn(account, farming);
            if farming {
                connected += 1;
            }
        }
        info!(connected, "bootstrap complete");
        Ok(connected)
    }

    /// Enables farming for an account, spawning its session if needed.
    /// A missing record or an account without stored credentials is a
    /// logged no-op, not an error.
    pub async fn start_farming(
        &self,
        id: &AccountId,
    ) -> Result<(), FarmhandError> {
        let Some(account) = self.stores.accounts.find(id).await? else {
            info!(account = %id, "start ignored, no such account");
            return Ok(());
        };
        if account.refresh_token.is_none() {
            info!(account = %id, "start ignored, no stored credentials");
            return Ok(());
        }
        self.stores.accounts.set_farming(id, true).await?;
        let handle = self.session_or_spawn(account, false);
        handle.start().await?;
        Ok(())
    }

    /// Disables farming. The flag is persisted even when no live session
    /// exists; a live session is stopped and disconnected.
    pub async fn stop_farming(
        &self,
        id: &AccountId,
    ) -> Result<(), FarmhandError> {
        self.require_account(id).await?;
        self.stores.accounts.set_farming(id, false).await?;
        if let Some(handle) = self.session_handle(id) {
            handle.stop(LogReason::UserStop).await?;
        }
        Ok(())
    }

    /// Clears a suppressed session's counters and reconnects it.
    pub async fn resume(&self, id: &AccountId) -> Result<(), FarmhandError> {
        let account = self.require_account(id).await?;
        let handle = self.session_or_spawn(account, false);
        handle.resume().await?;
        Ok(())
    }

    /// Replaces an account's activity targets. Persisted always; announced
    /// immediately when a live session is connected.
    pub async fn update_games(
        &self,
        id: &AccountId,
        games: Vec<GameTarget>,
    ) -> Result<(), FarmhandError> {
        self.require_account(id).await?;
        self.stores.accounts.set_games(id, &games).await?;
        if let Some(handle) = self.session_handle(id) {
            handle.update_games(games).await?;
        }
        Ok(())
    }

    /// Replaces an account's desired presence. Persisted always; pushed
    /// immediately when a live session is connected.
    pub async fn update_presence(
        &self,
        id: &AccountId,
        presence: PresenceState,
    ) -> Result<(), FarmhandError> {
        self.require_account(id).await?;
        self.stores.accounts.set_presence(id, presence).await?;
        if let Some(handle) = self.session_handle(id) {
            handle.update_presence(presence).await?;
        }
        Ok(())
    }

    /// Creates a brand-new account for `owner` and starts a QR login for
    /// it. Returns the account (not yet persisted) together with the
    /// pending QR record. The account record is persisted by the QR flow
    /// on first successful login, and the session enters the registry only
    /// once that login completes — an abandoned QR code leaves no managed
    /// session behind.
    pub async fn add_account(
        &self,
        owner: OwnerId,
    ) -> Result<(Account, QrLoginRecord), FarmhandError> {
        let account = Account::new(owner);
        let id = account.id.clone();
        info!(account = %id, %owner, "adding account via qr login");

        let (activated_tx, activated_rx) = oneshot::channel();
        let handle = spawn_session(
            account.clone(),
            self.factory.create(),
            self.stores.clone(),
            self.config.clone(),
            Some(activated_tx),
            true,
        );
        let record = handle.generate_qr().await?;

        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            // Resolves on the first successful QR login; an expired or
            // failed challenge never registers the session.
            if activated_rx.await.is_ok() {
                info!(account = %id, "qr login completed, session registered");
                sessions.insert(id, handle);
            } else {
                info!(account = %id, "session ended before qr activation");
            }
        });
        Ok((account, record))
    }

    /// Starts a QR login for an existing account (re-authentication).
    pub async fn qr_login(
        &self,
        id: &AccountId,
    ) -> Result<QrLoginRecord, FarmhandError> {
        let account = self.require_account(id).await?;
        let handle = self.session_or_spawn(account, true);
        Ok(handle.generate_qr().await?)
    }

    /// Stops and removes an account: session terminated, farming flag
    /// cleared, record deleted. Succeeds even when no live session exists.
    pub async fn delete_account(
        &self,
        id: &AccountId,
    ) -> Result<(), FarmhandError> {
        if let Some((_, handle)) = self.sessions.remove(id) {
            if let Err(e) = handle.delete().await {
                // Already terminated; removal proceeds regardless.
                warn!(account = %id, error = %e, "session delete failed");
            }
        }
        self.stores.accounts.set_farming(id, false).await?;
        self.stores.accounts.delete(id).await?;
        info!(account = %id, "account deleted");
        Ok(())
    }

    /// All persisted accounts belonging to one owner.
    pub async fn list_accounts(
        &self,
        owner: OwnerId,
    ) -> Result<Vec<Account>, FarmhandError> {
        Ok(self.stores.accounts.find_by_owner(owner).await?)
    }

    /// The live session handle for an account, if one is registered.
    pub fn session_handle(&self, id: &AccountId) -> Option<SessionHandle> {
        self.sessions.get(id).map(|entry| entry.clone())
    }

    /// Number of registered live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    async fn require_account(
        &self,
        id: &AccountId,
    ) -> Result<Account, FarmhandError> {
        self.stores
            .accounts
            .find(id)
            .await?
            .ok_or_else(|| FarmhandError::UnknownAccount(id.clone()))
    }

    /// Gets the registered session or spawns one, exactly once per id
    /// under concurrency.
    fn session_or_spawn(
        &self,
        account: Account,
        auto_connect: bool,
    ) -> SessionHandle {
        self.sessions
            .entry(account.id.clone())
            .or_insert_with(|| {
                spawn_session(
                    account,
                    self.factory.create(),
                    self.stores.clone(),
                    self.config.clone(),
                    None,
                    auto_connect,
                )
            })
            .clone()
    }
}
