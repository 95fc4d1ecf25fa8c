//! Main ledger orchestration layer
//!
//! Ties the store, the lock table and metrics together into the donation
//! API. Every mutating operation follows the same shape: cheap argument
//! checks, then the record locks, then reads, balance checks and one atomic
//! commit of everything it changed.
//!
//! # Example
//!
//! ```
//! use ledger_core::{Config, Ledger, MemoryStore, NewAccount, NewPost};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! # fn main() -> ledger_core::Result<()> {
//! let ledger = Ledger::new(Arc::new(MemoryStore::new()), &Config::default())?;
//! let alice = ledger.open_account(NewAccount::new("alice"))?;
//! let bob = ledger.open_account(NewAccount::new("bob"))?;
//! let post = ledger.feed().create_post(NewPost::new(bob.id.clone(), "Sunrise hike"))?;
//!
//! ledger.create_donation(&alice.id, &bob.id, Decimal::from(30), &post.id)?;
//! assert_eq!(ledger.balance(&alice.id)?, Decimal::from(70));
//! # Ok(())
//! # }
//! ```

use crate::{
    config::{AccountConfig, Config},
    feed::Feed,
    lock::{LockKey, LockTable},
    metrics::Metrics,
    store::{open_store, DynStore, LedgerStore, WriteSet},
    types::{
        Account, AccountId, Direction, DonationKind, DonationRecord, NewAccount, PostId,
        ProfileUpdate, TokenTransfer, TransferStatus,
    },
    Error, Result,
};
use chrono::Utc;
use ranking_engine::FeedScorer;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Main ledger interface
pub struct Ledger<S: LedgerStore> {
    /// Record storage
    store: Arc<S>,

    /// Per-record locks, shared with the feed
    locks: Arc<LockTable>,

    /// Account defaults
    accounts: AccountConfig,

    /// Scorer handed to the feed
    scorer: FeedScorer,

    /// Collected only when enabled in config
    metrics: Option<Metrics>,
}

impl<S: LedgerStore> Clone for Ledger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            locks: Arc::clone(&self.locks),
            accounts: self.accounts.clone(),
            scorer: self.scorer,
            metrics: self.metrics.clone(),
        }
    }
}

impl<S: LedgerStore> std::fmt::Debug for Ledger<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("accounts", &self.accounts)
            .field("scorer", &self.scorer)
            .field("locked_records", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl Ledger<DynStore> {
    /// Open the ledger on the store selected by `config.storage`
    pub fn open(config: &Config) -> Result<Self> {
        let store = open_store(config)?;
        tracing::info!(
            service = %config.service_name,
            backend = ?config.storage,
            "Ledger opened"
        );
        Self::new(Arc::new(store), config)
    }
}

impl<S: LedgerStore> Ledger<S> {
    /// Create ledger over an existing store
    pub fn new(store: Arc<S>, config: &Config) -> Result<Self> {
        config.validate()?;

        let scorer =
            FeedScorer::new(config.ranking).map_err(|e| Error::Config(e.to_string()))?;

        let metrics = if config.metrics_enabled {
            Some(Metrics::new().map_err(|e| Error::Config(format!("Metrics: {}", e)))?)
        } else {
            None
        };

        Ok(Self {
            store,
            locks: Arc::new(LockTable::new()),
            accounts: config.accounts.clone(),
            scorer,
            metrics,
        })
    }

    /// Post and engagement operations over the same store and locks
    pub fn feed(&self) -> Feed<S> {
        Feed::new(
            Arc::clone(&self.store),
            Arc::clone(&self.locks),
            self.scorer,
            self.metrics.clone(),
        )
    }

    /// Metrics, if enabled
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn locks(&self) -> &LockTable {
        &self.locks
    }

    /// Commit a write set, timing it
    pub(crate) fn commit(&self, writes: WriteSet) -> Result<()> {
        let start = Instant::now();
        self.store.commit(writes)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_commit_duration(start.elapsed().as_secs_f64());
        }
        Ok(())
    }

    pub(crate) fn observe<T>(&self, operation: &'static str, result: Result<T>) -> Result<T> {
        observe(self.metrics.as_ref(), operation, result)
    }

    /// Get or create an account
    ///
    /// A new account starts with the configured starting balance. An
    /// existing account is returned unchanged.
    pub fn open_account(&self, new: NewAccount) -> Result<Account> {
        let result = self
            .locks
            .with_locks([LockKey::from(&new.id)], || -> Result<Account> {
                if let Some(existing) = self.store.get_account(&new.id)? {
                    return Ok(existing);
                }

                let now = Utc::now();
                let account = Account {
                    id: new.id,
                    username: new.username,
                    display_name: new.display_name,
                    profile_image: new.profile_image,
                    balance: self.accounts.starting_balance,
                    created_at: now,
                    updated_at: now,
                };

                self.commit(WriteSet::new().account(account.clone()))?;
                tracing::info!(
                    account = %account.id,
                    balance = %account.balance,
                    "Account opened"
                );
                Ok(account)
            });

        self.observe("open_account", result)
    }

    /// Get account
    pub fn get_account(&self, id: &AccountId) -> Result<Account> {
        self.store
            .get_account(id)?
            .ok_or_else(|| Error::AccountNotFound(id.clone()))
    }

    /// Change username, display name or avatar
    ///
    /// The balance is never touched here.
    pub fn update_profile(&self, id: &AccountId, update: ProfileUpdate) -> Result<Account> {
        let result = self
            .locks
            .with_locks([LockKey::from(id)], || -> Result<Account> {
                let mut account = self
                    .store
                    .get_account(id)?
                    .ok_or_else(|| Error::AccountNotFound(id.clone()))?;

                update.apply(&mut account, Utc::now())?;
                self.commit(WriteSet::new().account(account.clone()))?;
                Ok(account)
            });

        if let Ok(account) = &result {
            tracing::info!(
                account = %account.id,
                username = %account.username,
                "Profile updated"
            );
        }

        self.observe("update_profile", result)
    }

    /// Current balance
    pub fn balance(&self, id: &AccountId) -> Result<Decimal> {
        Ok(self.get_account(id)?.balance)
    }

    /// Add a signed `delta` to a balance, refusing to overdraw
    pub fn adjust_balance(&self, id: &AccountId, delta: Decimal) -> Result<Account> {
        let result = self
            .locks
            .with_locks([LockKey::from(id)], || self.store.adjust_balance(id, delta));

        if let Ok(account) = &result {
            tracing::info!(account = %id, delta = %delta, balance = %account.balance, "Balance adjusted");
        }

        self.observe("adjust_balance", result)
    }

    /// Move `amount` coins from `from` to `to`, credited to `post_id`
    ///
    /// Payer, payee and post are updated together with the new record, or
    /// not at all.
    pub fn create_donation(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
        post_id: &PostId,
    ) -> Result<DonationRecord> {
        let result = self.execute_donation(from, to, amount, post_id);

        if let Ok(record) = &result {
            tracing::info!(
                donation_id = %record.id,
                from = %record.from,
                to = %record.to,
                amount = %record.amount,
                post_id = %record.post_id,
                "Donation committed"
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_donation(record.amount);
            }
        }

        self.observe("create_donation", result)
    }

    fn execute_donation(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
        post_id: &PostId,
    ) -> Result<DonationRecord> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(amount));
        }
        if from == to {
            return Err(Error::SelfDonation(from.clone()));
        }

        let keys = [LockKey::from(from), LockKey::from(to), LockKey::from(post_id)];
        self.locks.with_locks(keys, || -> Result<DonationRecord> {
            let mut payer = self
                .store
                .get_account(from)?
                .ok_or_else(|| Error::PayerNotFound(from.clone()))?;
            let mut payee = self
                .store
                .get_account(to)?
                .ok_or_else(|| Error::PayeeNotFound(to.clone()))?;
            let mut post = self
                .store
                .get_post(post_id)?
                .ok_or_else(|| Error::PostNotFound(post_id.clone()))?;

            let now = Utc::now();
            payer.apply_delta(-amount, now)?;
            payee.apply_delta(amount, now)?;
            post.add_donation(amount, now)?;

            let record = DonationRecord {
                id: Uuid::now_v7(),
                from: from.clone(),
                to: to.clone(),
                amount,
                post_id: post_id.clone(),
                kind: DonationKind::Virtual,
                created_at: now,
            };

            self.commit(
                WriteSet::new()
                    .account(payer)
                    .account(payee)
                    .post(post)
                    .donation(record.clone()),
            )?;

            Ok(record)
        })
    }

    /// Record a donation already settled on-chain
    ///
    /// Balances are untouched. The post total grows unless the transfer
    /// failed.
    pub fn record_token_donation(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
        post_id: &PostId,
        transfer: TokenTransfer,
    ) -> Result<DonationRecord> {
        let result = self.execute_token_donation(from, to, amount, post_id, transfer);

        if let Ok(record) = &result {
            tracing::info!(
                donation_id = %record.id,
                from = %record.from,
                to = %record.to,
                amount = %record.amount,
                post_id = %record.post_id,
                "Token donation recorded"
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_token_donation();
            }
        }

        self.observe("record_token_donation", result)
    }

    fn execute_token_donation(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
        post_id: &PostId,
        transfer: TokenTransfer,
    ) -> Result<DonationRecord> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(amount));
        }
        if from == to {
            return Err(Error::SelfDonation(from.clone()));
        }
        transfer.validate()?;

        self.locks
            .with_locks([LockKey::from(post_id)], || -> Result<DonationRecord> {
                if self.store.get_account(from)?.is_none() {
                    return Err(Error::PayerNotFound(from.clone()));
                }
                if self.store.get_account(to)?.is_none() {
                    return Err(Error::PayeeNotFound(to.clone()));
                }
                let mut post = self
                    .store
                    .get_post(post_id)?
                    .ok_or_else(|| Error::PostNotFound(post_id.clone()))?;

                let now = Utc::now();
                let mut writes = WriteSet::new();
                if transfer.status != TransferStatus::Failed {
                    post.add_donation(amount, now)?;
                    writes = writes.post(post);
                }

                let record = DonationRecord {
                    id: Uuid::now_v7(),
                    from: from.clone(),
                    to: to.clone(),
                    amount,
                    post_id: post_id.clone(),
                    kind: DonationKind::Token(transfer),
                    created_at: now,
                };

                self.commit(writes.donation(record.clone()))?;
                Ok(record)
            })
    }

    /// Donation by ID
    pub fn get_donation(&self, id: Uuid) -> Result<Option<DonationRecord>> {
        self.store.get_donation(id)
    }

    /// Donations involving `account` on the given side, newest first
    pub fn donations_for_account(
        &self,
        account: &AccountId,
        direction: Direction,
    ) -> Result<Vec<DonationRecord>> {
        self.donations_where(|d| direction.matches(d, account))
    }

    /// Donations attributed to `post_id`, newest first
    pub fn donations_for_post(&self, post_id: &PostId) -> Result<Vec<DonationRecord>> {
        self.donations_where(|d| &d.post_id == post_id)
    }

    /// Sum of donations sent by `account`
    pub fn total_donated(&self, account: &AccountId) -> Result<Decimal> {
        settled_total(&self.donations_for_account(account, Direction::Sent)?)
    }

    /// Sum of donations received by `account`
    pub fn total_received(&self, account: &AccountId) -> Result<Decimal> {
        settled_total(&self.donations_for_account(account, Direction::Received)?)
    }

    fn donations_where(
        &self,
        predicate: impl Fn(&DonationRecord) -> bool,
    ) -> Result<Vec<DonationRecord>> {
        let mut donations: Vec<DonationRecord> = self
            .store
            .list_donations()?
            .into_iter()
            .filter(|d| predicate(d))
            .collect();

        donations.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(donations)
    }
}

/// Failed on-chain transfers moved nothing
fn settled_total(records: &[DonationRecord]) -> Result<Decimal> {
    checked_sum(
        records
            .iter()
            .filter(|d| match &d.kind {
                DonationKind::Virtual => true,
                DonationKind::Token(transfer) => transfer.status != TransferStatus::Failed,
            })
            .map(|d| d.amount),
        "donation total",
    )
}

/// Sum amounts, failing instead of overflowing
pub(crate) fn checked_sum(
    amounts: impl IntoIterator<Item = Decimal>,
    what: &str,
) -> Result<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| Error::Overflow(what.to_string()))
    })
}

/// Log the outcome of a mutating operation and count rejections
pub(crate) fn observe<T>(
    metrics: Option<&Metrics>,
    operation: &'static str,
    result: Result<T>,
) -> Result<T> {
    if let Err(e) = &result {
        if e.is_rejection() {
            tracing::warn!(operation, reason = e.reason_code(), error = %e, "Operation rejected");
            if let Some(metrics) = metrics {
                metrics.record_rejection(e);
            }
        } else {
            tracing::error!(operation, error = %e, "Operation failed");
        }
    }
    result
}
