//! The QR credential-acquisition flow.
//!
//! One-shot and timeout-bounded: request a login challenge, persist a
//! `Waiting` record for out-of-band polling, then race the client's
//! completion against the timeout in a detached task. The caller gets the
//! pending record back immediately; everything after that is reflected
//! through persisted state, never thrown.
//!
//! Every persistence write in the detached task is independently
//! best-effort: a failed QR-status write must not stop the account upsert
//! from being attempted, and nothing here can crash the task.

use std::sync::Arc;
use std::time::Duration;

use farmhand_client::{ClientError, NetClient, QrLoginResult};
use farmhand_store::{Account, QrLoginRecord, QrSettle, Stores};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::SessionError;
use crate::session::SessionCommand;

/// Everything the detached QR tasks need, snapshotted from the session.
pub(crate) struct QrContext<C: NetClient> {
    pub client: Arc<C>,
    pub stores: Stores,
    pub account: Account,
    /// Channel back into the owning session actor.
    pub session_tx: mpsc::Sender<SessionCommand>,
    /// How long the challenge may stay unanswered.
    pub timeout: Duration,
    /// Poll interval while waiting for the connection to come up.
    pub connect_poll: Duration,
}

/// Begins a QR login: waits (suspending, not spinning) for the connection,
/// requests a challenge, persists the `Waiting` record, and spawns the
/// poller. Returns the pending record for the caller to render.
pub(crate) async fn begin<C: NetClient>(
    ctx: QrContext<C>,
) -> Result<QrLoginRecord, SessionError> {
    while !ctx.client.is_connected() {
        debug!(account = %ctx.account.id, "waiting for connection before requesting qr challenge");
        tokio::time::sleep(ctx.connect_poll).await;
    }

    let pending = ctx.client.begin_qr_login().await?;
    let record = QrLoginRecord::new(
        ctx.account.id.clone(),
        pending.challenge_url.clone(),
    );
    info!(account = %ctx.account.id, qr = %record.id, "qr challenge issued");

    if let Err(e) = ctx.stores.qr.insert(&record).await {
        // Callers can't poll a record that was never written, but the
        // login itself can still complete; keep going.
        error!(qr = %record.id, error = %e, "failed to insert qr record");
    }

    tokio::spawn(poll_for_result(ctx, record.clone(), pending.result));

    Ok(record)
}

/// Races the challenge result against the timeout and settles the record.
async fn poll_for_result<C: NetClient>(
    ctx: QrContext<C>,
    record: QrLoginRecord,
    result: oneshot::Receiver<Result<QrLoginResult, ClientError>>,
) {
    let outcome = tokio::select! {
        outcome = result => outcome,
        _ = tokio::time::sleep(ctx.timeout) => {
            info!(qr = %record.id, "qr challenge timed out");
            settle(&ctx.stores, &record, QrSettle::Expired).await;
            return;
        }
    };

    let login = match outcome {
        Ok(Ok(login)) => login,
        Ok(Err(e)) => {
            info!(qr = %record.id, error = %e, "qr login failed");
            settle(&ctx.stores, &record, QrSettle::Error(e.to_string()))
                .await;
            return;
        }
        Err(_) => {
            // The client dropped the in-flight login without answering.
            settle(
                &ctx.stores,
                &record,
                QrSettle::Error(ClientError::ChallengeAbandoned.to_string()),
            )
            .await;
            return;
        }
    };

    info!(
        account = %ctx.account.id,
        qr = %record.id,
        display_name = %login.display_name,
        "qr login completed"
    );

    // Upsert the account: name and token unconditionally, the rest only
    // if this is the first time the record is written.
    let mut account = ctx.account.clone();
    account.display_name = Some(login.display_name.clone());
    account.refresh_token = Some(login.refresh_token.clone());
    if let Err(e) = ctx.stores.accounts.upsert_credentials(&account).await {
        error!(account = %account.id, error = %e, "failed to upsert account after qr login");
    }

    settle(
        &ctx.stores,
        &record,
        QrSettle::Completed {
            display_name: login.display_name.clone(),
            refresh_token: login.refresh_token.clone(),
        },
    )
    .await;

    // Hand the credentials to the actor: it updates its in-memory account,
    // attempts authentication on the live connection, and fires the
    // activation channel so the registry starts managing this session.
    let _ = ctx
        .session_tx
        .send(SessionCommand::QrAuthenticated {
            display_name: login.display_name,
            refresh_token: login.refresh_token,
        })
        .await;
}

async fn settle(stores: &Stores, record: &QrLoginRecord, settle: QrSettle) {
    if let Err(e) = stores.qr.settle(&record.id, settle).await {
        error!(qr = %record.id, error = %e, "failed to settle qr record");
    }
}
