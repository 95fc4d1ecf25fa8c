//! Positivity feed ledger core
//!
//! Coin balances, donations between users tied to posts, coin purchases and
//! post engagement, over a pluggable store.
//!
//! # Architecture
//!
//! - **Store seam**: [`LedgerStore`] with an in-memory and a RocksDB backend
//! - **Per-record locks**: donations lock payer, payee and post in sorted order
//! - **Atomic commits**: every operation writes one [`WriteSet`] or nothing
//! - **Actor front end**: [`LedgerHandle`] for async callers
//!
//! # Invariants
//!
//! - Balances never go negative
//! - A donation conserves coins: payer −amount, payee +amount
//! - A post's donation total grows exactly once per committed donation
//! - Donation and purchase records are append-only

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod error;
pub mod feed;
pub mod ledger;
pub mod lock;
pub mod memory;
pub mod metrics;
pub mod purchase;
#[cfg(feature = "rocksdb")]
pub mod storage;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-exports
pub use actor::{spawn_ledger_actor, LedgerHandle};
pub use config::Config;
pub use error::{Error, Result};
pub use feed::Feed;
pub use ledger::Ledger;
pub use memory::MemoryStore;
pub use purchase::{coin_packages, CoinPackage, PaymentCurrency, PurchaseRecord, PurchaseStatus};
#[cfg(feature = "rocksdb")]
pub use storage::RocksStore;
pub use store::{LedgerStore, WriteSet};
pub use types::{
    Account, AccountId, Comment, Direction, DonationKind, DonationRecord, Media, MediaKind,
    NewAccount, NewPost, Post, PostId, ProfileUpdate, TokenTransfer, TransferStatus,
};
