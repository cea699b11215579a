//! Farmhand keeps remote account sessions alive.
//!
//! Given a set of managed accounts, it holds one authenticated connection
//! per account, announces the configured activity, and supervises the full
//! session lifecycle: reconnecting with adaptive backoff when the link
//! drops, backing off permanently when reconnects loop, and acquiring
//! credentials through QR challenge logins when none are stored.
//!
//! # Crates
//!
//! - [`protocol`] — shared vocabulary: ids, statuses, activity targets
//! - [`client`] — the network-client boundary the embedder implements
//! - [`store`] — the persistence boundary and an in-memory implementation
//! - [`session`] — the per-account lifecycle actor and its policies
//! - this crate — the [`Farm`] registry tying them together
//!
//! # Quick start
//!
//! ```no_run
//! use farmhand::{Farm, protocol::OwnerId, session::SessionConfig};
//! use farmhand::store::Stores;
//!
//! # use farmhand::client::ClientFactory;
//! # async fn example<F: ClientFactory>(factory: F) -> Result<(), farmhand::FarmhandError> {
//! let farm = Farm::new(factory, Stores::in_memory(), SessionConfig::default());
//! farm.initial_start().await?;
//! let (_account, qr) = farm.add_account(OwnerId(42)).await?;
//! println!("scan this: {}", qr.challenge_url);
//! # Ok(())
//! # }
//! ```

mod error;
mod registry;

pub use error::FarmhandError;
pub use registry::Farm;

pub use farmhand_client as client;
pub use farmhand_protocol as protocol;
pub use farmhand_session as session;
pub use farmhand_store as store;
