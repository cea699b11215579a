//! Persistence boundary for Farmhand.
//!
//! The core never talks to a database directly — it goes through three
//! narrow, object-safe traits, one per durable record kind:
//!
//! 1. [`AccountStore`] — managed accounts (read/written by every layer)
//! 2. [`QrStore`] — QR login sessions (written by the QR flow, polled by
//!    callers out-of-band)
//! 3. [`FarmLogStore`] — the append-only audit log (write-only here)
//!
//! [`MemoryStore`] implements all three and is what the tests (and any
//! embedder without a real database) use. The traits rely on the backing
//! store's single-document atomicity; there are no cross-record
//! transactions anywhere in the core.

mod error;
mod memory;
mod records;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use records::{Account, FarmLogRecord, QrLoginRecord, QrSettle, QrStatus};

use std::sync::Arc;

use async_trait::async_trait;
use farmhand_protocol::{AccountId, GameTarget, OwnerId, PresenceState, QrId};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Keyed CRUD over [`Account`] records, plus the field-level updates the
/// registry performs without loading a whole record.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Looks up one account by id.
    async fn find(&self, id: &AccountId) -> Result<Option<Account>, StoreError>;

    /// Loads every account. Used only at process bootstrap.
    async fn find_all(&self) -> Result<Vec<Account>, StoreError>;

    /// Loads every account belonging to one owner.
    async fn find_by_owner(
        &self,
        owner: OwnerId,
    ) -> Result<Vec<Account>, StoreError>;

    /// Sets the farming-enabled flag. No-op if the record is absent.
    async fn set_farming(
        &self,
        id: &AccountId,
        farming: bool,
    ) -> Result<(), StoreError>;

    /// Replaces the activity-target list. No-op if the record is absent.
    async fn set_games(
        &self,
        id: &AccountId,
        games: &[GameTarget],
    ) -> Result<(), StoreError>;

    /// Replaces the desired presence. No-op if the record is absent.
    async fn set_presence(
        &self,
        id: &AccountId,
        presence: PresenceState,
    ) -> Result<(), StoreError>;

    /// Upserts an account after a successful credential acquisition.
    ///
    /// Display name and refresh token are written unconditionally; the
    /// owner, game list, farming flag, and presence are written only when
    /// the record did not previously exist.
    async fn upsert_credentials(
        &self,
        account: &Account,
    ) -> Result<(), StoreError>;

    /// Deletes the account record. Succeeds even if it was never stored.
    async fn delete(&self, id: &AccountId) -> Result<(), StoreError>;
}

/// Insert-then-settle storage for [`QrLoginRecord`]s.
#[async_trait]
pub trait QrStore: Send + Sync {
    /// Persists a new record (always in `Waiting` status).
    async fn insert(&self, record: &QrLoginRecord) -> Result<(), StoreError>;

    /// Looks up one record by id (used by callers polling for completion).
    async fn find(&self, id: &QrId)
    -> Result<Option<QrLoginRecord>, StoreError>;

    /// Settles a record exactly once. Status is monotonic: a record that
    /// has already left `Waiting` is never changed again.
    async fn settle(&self, id: &QrId, settle: QrSettle)
    -> Result<(), StoreError>;
}

/// Append-only audit log. The core never reads it back.
#[async_trait]
pub trait FarmLogStore: Send + Sync {
    /// Appends one audit entry.
    async fn append(&self, record: &FarmLogRecord) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Stores bundle
// ---------------------------------------------------------------------------

/// The three store handles a session needs, bundled for cheap cloning
/// across tasks.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub qr: Arc<dyn QrStore>,
    pub farm_log: Arc<dyn FarmLogStore>,
}

impl Stores {
    /// Creates a bundle backed by a single shared [`MemoryStore`].
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            accounts: store.clone(),
            qr: store.clone(),
            farm_log: store,
        }
    }
}
