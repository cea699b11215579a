//! In-memory store implementation.
//!
//! Backs the tests and any embedder that doesn't wire up a real database.
//! Plain `std::sync::Mutex` around `HashMap`s: every operation locks for a
//! handful of map operations and nothing async happens under the lock.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use farmhand_protocol::{AccountId, GameTarget, OwnerId, PresenceState, QrId};

use crate::{
    Account, AccountStore, FarmLogRecord, FarmLogStore, QrLoginRecord,
    QrSettle, QrStatus, QrStore, StoreError,
};

/// In-memory implementation of all three store traits.
#[derive(Default)]
pub struct MemoryStore {
    accounts: Mutex<HashMap<AccountId, Account>>,
    qr_sessions: Mutex<HashMap<QrId, QrLoginRecord>>,
    farm_log: Mutex<Vec<FarmLogRecord>>,
}

impl MemoryStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an account directly. Test/bootstrap convenience — the core
    /// itself only creates accounts through `upsert_credentials`.
    pub fn seed_account(&self, account: Account) {
        self.accounts
            .lock()
            .expect("accounts lock poisoned")
            .insert(account.id.clone(), account);
    }

    /// Snapshot of the audit log, in append order.
    pub fn log_entries(&self) -> Vec<FarmLogRecord> {
        self.farm_log
            .lock()
            .expect("farm log lock poisoned")
            .clone()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find(
        &self,
        id: &AccountId,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .lock()
            .expect("accounts lock poisoned")
            .get(id)
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self
            .accounts
            .lock()
            .expect("accounts lock poisoned")
            .values()
            .cloned()
            .collect())
    }

    async fn find_by_owner(
        &self,
        owner: OwnerId,
    ) -> Result<Vec<Account>, StoreError> {
        Ok(self
            .accounts
            .lock()
            .expect("accounts lock poisoned")
            .values()
            .filter(|a| a.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn set_farming(
        &self,
        id: &AccountId,
        farming: bool,
    ) -> Result<(), StoreError> {
        if let Some(account) = self
            .accounts
            .lock()
            .expect("accounts lock poisoned")
            .get_mut(id)
        {
            account.is_farming = farming;
        }
        Ok(())
    }

    async fn set_games(
        &self,
        id: &AccountId,
        games: &[GameTarget],
    ) -> Result<(), StoreError> {
        if let Some(account) = self
            .accounts
            .lock()
            .expect("accounts lock poisoned")
            .get_mut(id)
        {
            account.games = games.to_vec();
        }
        Ok(())
    }

    async fn set_presence(
        &self,
        id: &AccountId,
        presence: PresenceState,
    ) -> Result<(), StoreError> {
        if let Some(account) = self
            .accounts
            .lock()
            .expect("accounts lock poisoned")
            .get_mut(id)
        {
            account.presence = presence;
        }
        Ok(())
    }

    async fn upsert_credentials(
        &self,
        account: &Account,
    ) -> Result<(), StoreError> {
        let mut accounts =
            self.accounts.lock().expect("accounts lock poisoned");
        match accounts.get_mut(&account.id) {
            Some(existing) => {
                // Record exists: only name and token are overwritten.
                existing.display_name = account.display_name.clone();
                existing.refresh_token = account.refresh_token.clone();
            }
            None => {
                // First insert: everything, including the insert-only
                // defaults (owner, games, farming flag, presence).
                accounts.insert(account.id.clone(), account.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &AccountId) -> Result<(), StoreError> {
        self.accounts
            .lock()
            .expect("accounts lock poisoned")
            .remove(id);
        Ok(())
    }
}

#[async_trait]
impl QrStore for MemoryStore {
    async fn insert(
        &self,
        record: &QrLoginRecord,
    ) -> Result<(), StoreError> {
        self.qr_sessions
            .lock()
            .expect("qr lock poisoned")
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn find(
        &self,
        id: &QrId,
    ) -> Result<Option<QrLoginRecord>, StoreError> {
        Ok(self
            .qr_sessions
            .lock()
            .expect("qr lock poisoned")
            .get(id)
            .cloned())
    }

    async fn settle(
        &self,
        id: &QrId,
        settle: QrSettle,
    ) -> Result<(), StoreError> {
        let mut sessions =
            self.qr_sessions.lock().expect("qr lock poisoned");
        let record = sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        // Monotonic status: a settled record never changes again.
        if record.status.is_settled() {
            tracing::warn!(qr_id = %id, status = ?record.status, "ignoring settle on already-settled qr record");
            return Ok(());
        }

        match settle {
            QrSettle::Completed {
                display_name,
                refresh_token,
            } => {
                record.status = QrStatus::Completed;
                record.display_name = Some(display_name);
                record.refresh_token = Some(refresh_token);
            }
            QrSettle::Expired => record.status = QrStatus::Expired,
            QrSettle::Error(message) => {
                record.status = QrStatus::Error(message);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FarmLogStore for MemoryStore {
    async fn append(
        &self,
        record: &FarmLogRecord,
    ) -> Result<(), StoreError> {
        self.farm_log
            .lock()
            .expect("farm log lock poisoned")
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use farmhand_protocol::{LogReason, SessionStatus};

    use super::*;

    fn owner() -> OwnerId {
        OwnerId(77)
    }

    #[tokio::test]
    async fn test_find_returns_seeded_account() {
        let store = MemoryStore::new();
        let account = Account::new(owner());
        let id = account.id.clone();
        store.seed_account(account);

        let found =
            AccountStore::find(&store, &id).await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(found.is_farming);
    }

    #[tokio::test]
    async fn test_find_by_owner_filters() {
        let store = MemoryStore::new();
        store.seed_account(Account::new(OwnerId(1)));
        store.seed_account(Account::new(OwnerId(1)));
        store.seed_account(Account::new(OwnerId(2)));

        assert_eq!(store.find_by_owner(OwnerId(1)).await.unwrap().len(), 2);
        assert_eq!(store.find_by_owner(OwnerId(3)).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_set_farming_missing_record_is_noop() {
        let store = MemoryStore::new();
        let id = AccountId::generate();
        // Must not error: field updates tolerate unloaded records.
        store.set_farming(&id, false).await.unwrap();
        assert!(AccountStore::find(&store, &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_credentials_inserts_with_defaults() {
        let store = MemoryStore::new();
        let mut account = Account::new(owner());
        account.display_name = Some("alice".into());
        account.refresh_token = Some("tok-1".into());
        account.is_farming = false;

        store.upsert_credentials(&account).await.unwrap();

        let stored = AccountStore::find(&store, &account.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.display_name.as_deref(), Some("alice"));
        assert_eq!(stored.refresh_token.as_deref(), Some("tok-1"));
        // Insert path keeps the provided defaults verbatim.
        assert!(!stored.is_farming);
    }

    #[tokio::test]
    async fn test_upsert_credentials_existing_only_updates_name_and_token() {
        let store = MemoryStore::new();
        let mut account = Account::new(owner());
        account.games = vec![GameTarget::App(440)];
        let id = account.id.clone();
        store.seed_account(account.clone());

        // Re-authenticate with new credentials and *different* defaults.
        account.display_name = Some("bob".into());
        account.refresh_token = Some("tok-2".into());
        account.games = vec![GameTarget::App(999)];
        account.is_farming = false;
        store.upsert_credentials(&account).await.unwrap();

        let stored =
            AccountStore::find(&store, &id).await.unwrap().unwrap();
        assert_eq!(stored.display_name.as_deref(), Some("bob"));
        assert_eq!(stored.refresh_token.as_deref(), Some("tok-2"));
        // Insert-only fields must be untouched on the update path.
        assert_eq!(stored.games, vec![GameTarget::App(440)]);
        assert!(stored.is_farming);
    }

    #[tokio::test]
    async fn test_delete_unknown_account_succeeds() {
        let store = MemoryStore::new();
        store.delete(&AccountId::generate()).await.unwrap();
    }

    #[tokio::test]
    async fn test_qr_settle_completed_fills_credentials() {
        let store = MemoryStore::new();
        let record =
            QrLoginRecord::new(AccountId::generate(), "challenge".into());
        let id = record.id.clone();
        store.insert(&record).await.unwrap();

        store
            .settle(
                &id,
                QrSettle::Completed {
                    display_name: "alice".into(),
                    refresh_token: "tok".into(),
                },
            )
            .await
            .unwrap();

        let stored = QrStore::find(&store, &id).await.unwrap().unwrap();
        assert_eq!(stored.status, QrStatus::Completed);
        assert_eq!(stored.display_name.as_deref(), Some("alice"));
        assert_eq!(stored.refresh_token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_qr_settle_is_monotonic() {
        let store = MemoryStore::new();
        let record =
            QrLoginRecord::new(AccountId::generate(), "challenge".into());
        let id = record.id.clone();
        store.insert(&record).await.unwrap();

        store.settle(&id, QrSettle::Expired).await.unwrap();
        // A late completion must not resurrect the expired record.
        store
            .settle(
                &id,
                QrSettle::Completed {
                    display_name: "late".into(),
                    refresh_token: "late-tok".into(),
                },
            )
            .await
            .unwrap();

        let stored = QrStore::find(&store, &id).await.unwrap().unwrap();
        assert_eq!(stored.status, QrStatus::Expired);
        assert!(stored.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_qr_settle_unknown_record_errors() {
        let store = MemoryStore::new();
        let result = store
            .settle(&QrId::generate(), QrSettle::Expired)
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_farm_log_appends_in_order() {
        let store = MemoryStore::new();
        let account = Account::new(owner());
        for reason in [LogReason::GamesSend, LogReason::UserStop] {
            store
                .append(&FarmLogRecord {
                    account_id: account.id.clone(),
                    display_name: None,
                    owner_id: account.owner_id,
                    status: SessionStatus::Active,
                    reason,
                    recorded_at: std::time::SystemTime::now(),
                })
                .await
                .unwrap();
        }

        let entries = store.log_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].reason, LogReason::GamesSend);
        assert_eq!(entries[1].reason, LogReason::UserStop);
    }
}
