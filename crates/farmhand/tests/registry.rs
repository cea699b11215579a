//! Registry-level tests: session bookkeeping, persistence without live
//! sessions, and the QR-gated add-account flow.
//!
//! Paused Tokio clock throughout, as in the session lifecycle tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use farmhand::client::{
    AuthOutcome, ClientError, ClientEvent, ClientFactory, NetClient,
    PendingQrLogin, QrLoginResult,
};
use farmhand::protocol::{
    AccountId, GameTarget, OwnerId, PresenceState, SessionStatus,
};
use farmhand::session::SessionConfig;
use farmhand::store::{Account, MemoryStore, QrStatus, Stores};
use farmhand::{Farm, FarmhandError};
use tokio::sync::{mpsc, oneshot};

// ---------------------------------------------------------------------------
// Mock client and factory
// ---------------------------------------------------------------------------

/// Happy-path [`NetClient`]: connecting emits `Connected`, authenticating
/// always succeeds. QR challenges are resolved by the test.
#[derive(Clone)]
struct MockClient {
    inner: Arc<MockInner>,
}

struct MockInner {
    connected: AtomicBool,
    events_tx: mpsc::UnboundedSender<ClientEvent>,
    events_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ClientEvent>>,
    activity: Mutex<Vec<Vec<GameTarget>>>,
    qr_result_tx:
        Mutex<Option<oneshot::Sender<Result<QrLoginResult, ClientError>>>>,
}

impl MockClient {
    fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(MockInner {
                connected: AtomicBool::new(false),
                events_tx,
                events_rx: tokio::sync::Mutex::new(events_rx),
                activity: Mutex::new(Vec::new()),
                qr_result_tx: Mutex::new(None),
            }),
        }
    }

    fn activity(&self) -> Vec<Vec<GameTarget>> {
        self.inner.activity.lock().unwrap().clone()
    }

    fn resolve_qr(&self, result: Result<QrLoginResult, ClientError>) {
        let tx = self
            .inner
            .qr_result_tx
            .lock()
            .unwrap()
            .take()
            .expect("no qr challenge outstanding");
        tx.send(result).unwrap();
    }
}

impl NetClient for MockClient {
    async fn connect(&self) -> Result<(), ClientError> {
        self.inner.connected.store(true, Ordering::SeqCst);
        let _ = self.inner.events_tx.send(ClientEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    async fn send_activity(
        &self,
        targets: &[GameTarget],
    ) -> Result<(), ClientError> {
        self.inner.activity.lock().unwrap().push(targets.to_vec());
        Ok(())
    }

    async fn set_presence(
        &self,
        _state: PresenceState,
    ) -> Result<(), ClientError> {
        Ok(())
    }

    async fn authenticate(
        &self,
        _display_name: Option<&str>,
        _refresh_token: &str,
    ) -> Result<(), ClientError> {
        let _ = self.inner.events_tx.send(ClientEvent::AuthSucceeded(
            AuthOutcome {
                display_name: Some("mock-user".into()),
            },
        ));
        Ok(())
    }

    async fn begin_qr_login(&self) -> Result<PendingQrLogin, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let (tx, rx) = oneshot::channel();
        *self.inner.qr_result_tx.lock().unwrap() = Some(tx);
        Ok(PendingQrLogin {
            challenge_url: "challenge://mock".into(),
            result: rx,
        })
    }

    async fn next_event(&self) -> Option<ClientEvent> {
        self.inner.events_rx.lock().await.recv().await
    }
}

/// Hands out [`MockClient`]s and remembers every one it created so tests
/// can inspect the clients the registry spawned.
#[derive(Clone, Default)]
struct MockFactory {
    created: Arc<Mutex<Vec<MockClient>>>,
}

impl MockFactory {
    fn clients(&self) -> Vec<MockClient> {
        self.created.lock().unwrap().clone()
    }

    fn last_client(&self) -> MockClient {
        self.created
            .lock()
            .unwrap()
            .last()
            .expect("no client created yet")
            .clone()
    }
}

impl ClientFactory for MockFactory {
    type Client = MockClient;

    fn create(&self) -> MockClient {
        let client = MockClient::new();
        self.created.lock().unwrap().push(client.clone());
        client
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn farming_account(owner: OwnerId, token: Option<&str>) -> Account {
    let mut account = Account::new(owner);
    account.refresh_token = token.map(str::to_string);
    account
}

fn setup() -> (Farm<MockFactory>, MockFactory, Stores, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let stores = Stores {
        accounts: store.clone(),
        qr: store.clone(),
        farm_log: store.clone(),
    };
    let factory = MockFactory::default();
    let farm =
        Farm::new(factory.clone(), stores.clone(), SessionConfig::default());
    (farm, factory, stores, store)
}

/// Polls until `pred` holds, advancing virtual time in small steps.
async fn wait_until<F>(mut pred: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..400 {
        if pred() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never reached");
}

async fn wait_for_active(farm: &Farm<MockFactory>, id: &AccountId) {
    for _ in 0..400 {
        if let Some(handle) = farm.session_handle(id) {
            if let Ok(snap) = handle.snapshot().await {
                if snap.status == SessionStatus::Active {
                    return;
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session never became active");
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_initial_start_constructs_all_but_connects_farming_only() {
    let (farm, factory, _stores, store) = setup();
    let farmable = farming_account(OwnerId(1), Some("tok-1"));
    store.seed_account(farmable.clone());
    // No credentials: connects, then waits for a QR login.
    let credless = farming_account(OwnerId(1), None);
    store.seed_account(credless.clone());
    // Farming disabled: constructed but never dialed.
    let mut stopped = farming_account(OwnerId(2), Some("tok-2"));
    stopped.is_farming = false;
    store.seed_account(stopped.clone());

    let connected = farm.initial_start().await.unwrap();

    assert_eq!(connected, 2);
    assert_eq!(farm.session_count(), 3);
    assert_eq!(factory.clients().len(), 3);
    wait_for_active(&farm, &farmable.id).await;

    let idle = farm.session_handle(&stopped.id).unwrap();
    assert_eq!(
        idle.snapshot().await.unwrap().status,
        SessionStatus::Unknown
    );
}

#[tokio::test(start_paused = true)]
async fn test_initial_start_is_idempotent() {
    let (farm, _factory, _stores, store) = setup();
    store.seed_account(farming_account(OwnerId(1), Some("tok-1")));

    assert_eq!(farm.initial_start().await.unwrap(), 1);
    // Second bootstrap finds the session already registered.
    assert_eq!(farm.initial_start().await.unwrap(), 0);
    assert_eq!(farm.session_count(), 1);
}

// ---------------------------------------------------------------------------
// Start / stop
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_start_farming_unknown_account_is_noop() {
    let (farm, factory, _stores, _store) = setup();
    farm.start_farming(&AccountId::generate()).await.unwrap();
    assert_eq!(farm.session_count(), 0);
    assert!(factory.clients().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_start_farming_without_credentials_is_noop() {
    let (farm, _factory, _stores, store) = setup();
    let account = farming_account(OwnerId(1), None);
    store.seed_account(account.clone());

    farm.start_farming(&account.id).await.unwrap();

    assert_eq!(farm.session_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_resume_unknown_account_errors() {
    let (farm, _factory, _stores, _store) = setup();
    let result = farm.resume(&AccountId::generate()).await;
    assert!(matches!(result, Err(FarmhandError::UnknownAccount(_))));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_start_farming_spawns_one_session() {
    let (farm, factory, _stores, store) = setup();
    let account = farming_account(OwnerId(1), Some("tok-1"));
    store.seed_account(account.clone());

    let (a, b) = tokio::join!(
        farm.start_farming(&account.id),
        farm.start_farming(&account.id),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(farm.session_count(), 1);
    assert_eq!(factory.clients().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_farming_persists_without_live_session() {
    let (farm, factory, stores, store) = setup();
    let account = farming_account(OwnerId(1), Some("tok-1"));
    store.seed_account(account.clone());

    farm.stop_farming(&account.id).await.unwrap();

    let stored =
        stores.accounts.find(&account.id).await.unwrap().unwrap();
    assert!(!stored.is_farming);
    // No session was ever spawned just to stop it.
    assert_eq!(farm.session_count(), 0);
    assert!(factory.clients().is_empty());
}

// ---------------------------------------------------------------------------
// Field updates
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_update_games_persists_and_announces_live() {
    let (farm, factory, stores, store) = setup();
    let account = farming_account(OwnerId(1), Some("tok-1"));
    store.seed_account(account.clone());
    farm.start_farming(&account.id).await.unwrap();
    wait_for_active(&farm, &account.id).await;

    let games = vec![GameTarget::App(730)];
    farm.update_games(&account.id, games.clone()).await.unwrap();

    let stored =
        stores.accounts.find(&account.id).await.unwrap().unwrap();
    assert_eq!(stored.games, games);
    let client = factory.last_client();
    wait_until(|| client.activity().last() == Some(&games)).await;
}

#[tokio::test(start_paused = true)]
async fn test_update_presence_persists_without_live_session() {
    let (farm, _factory, stores, store) = setup();
    let account = farming_account(OwnerId(1), Some("tok-1"));
    store.seed_account(account.clone());

    farm.update_presence(&account.id, PresenceState::Snooze)
        .await
        .unwrap();

    let stored =
        stores.accounts.find(&account.id).await.unwrap().unwrap();
    assert_eq!(stored.presence, PresenceState::Snooze);
    assert_eq!(farm.session_count(), 0);
}

// ---------------------------------------------------------------------------
// Add account (QR-gated registration)
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_add_account_registers_after_qr_completion() {
    let (farm, factory, stores, _store) = setup();

    let (account, record) = farm.add_account(OwnerId(9)).await.unwrap();
    assert_eq!(record.account_id, account.id);
    assert_eq!(record.challenge_url, "challenge://mock");
    // Not managed until the login completes.
    assert_eq!(farm.session_count(), 0);

    factory.last_client().resolve_qr(Ok(QrLoginResult {
        display_name: "newcomer".into(),
        refresh_token: "tok-qr".into(),
    }));
    wait_until(|| farm.session_count() == 1).await;
    wait_for_active(&farm, &record.account_id).await;

    // First login inserted the record with the stock defaults.
    let stored = stores
        .accounts
        .find(&record.account_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.owner_id, OwnerId(9));
    assert_eq!(stored.refresh_token.as_deref(), Some("tok-qr"));
    assert_eq!(stored.games, vec![GameTarget::App(570)]);
    assert!(stored.is_farming);
}

#[tokio::test(start_paused = true)]
async fn test_add_account_expired_qr_registers_nothing() {
    let (farm, _factory, stores, _store) = setup();

    let (_account, record) = farm.add_account(OwnerId(9)).await.unwrap();
    // Never scanned: the challenge times out.
    tokio::time::sleep(Duration::from_secs(700)).await;

    assert_eq!(farm.session_count(), 0);
    // No account record was ever written.
    assert!(
        stores
            .accounts
            .find(&record.account_id)
            .await
            .unwrap()
            .is_none()
    );
    let qr = stores.qr.find(&record.id).await.unwrap().unwrap();
    assert_eq!(qr.status, QrStatus::Expired);
}

#[tokio::test(start_paused = true)]
async fn test_qr_login_reauthenticates_existing_account() {
    let (farm, factory, stores, store) = setup();
    // Known account that lost its credentials.
    let account = farming_account(OwnerId(1), None);
    store.seed_account(account.clone());

    let record = farm.qr_login(&account.id).await.unwrap();
    assert_eq!(record.account_id, account.id);

    factory.last_client().resolve_qr(Ok(QrLoginResult {
        display_name: "returning".into(),
        refresh_token: "tok-fresh".into(),
    }));
    wait_for_active(&farm, &account.id).await;

    let stored =
        stores.accounts.find(&account.id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("tok-fresh"));
}

// ---------------------------------------------------------------------------
// Delete / list
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_delete_account_with_live_session() {
    let (farm, _factory, stores, store) = setup();
    let account = farming_account(OwnerId(1), Some("tok-1"));
    store.seed_account(account.clone());
    farm.start_farming(&account.id).await.unwrap();
    wait_for_active(&farm, &account.id).await;

    farm.delete_account(&account.id).await.unwrap();

    assert_eq!(farm.session_count(), 0);
    assert!(
        stores.accounts.find(&account.id).await.unwrap().is_none()
    );
}

#[tokio::test(start_paused = true)]
async fn test_delete_account_without_session_removes_record() {
    let (farm, _factory, stores, store) = setup();
    let account = farming_account(OwnerId(1), Some("tok-1"));
    store.seed_account(account.clone());

    farm.delete_account(&account.id).await.unwrap();

    assert!(
        stores.accounts.find(&account.id).await.unwrap().is_none()
    );
}

#[tokio::test(start_paused = true)]
async fn test_list_accounts_filters_by_owner() {
    let (farm, _factory, _stores, store) = setup();
    store.seed_account(farming_account(OwnerId(1), None));
    store.seed_account(farming_account(OwnerId(1), None));
    store.seed_account(farming_account(OwnerId(2), None));

    assert_eq!(farm.list_accounts(OwnerId(1)).await.unwrap().len(), 2);
    assert_eq!(farm.list_accounts(OwnerId(3)).await.unwrap().len(), 0);
}
