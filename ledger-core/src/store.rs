//! Store interface the ledger is written against
//!
//! Reads go straight to the store. Every mutation is expressed as a
//! [`WriteSet`] and handed to [`LedgerStore::commit`], which must apply all
//! of it or none of it. Read-check-write sequences are serialized by the
//! caller through [`crate::lock::LockTable`].

use crate::{
    config::{Config, StorageBackend},
    memory::MemoryStore,
    purchase::PurchaseRecord,
    types::{Account, AccountId, Comment, DonationRecord, Post, PostId},
    Error, Result,
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Records written together by one operation
#[derive(Debug, Clone, Default)]
pub struct WriteSet {
    /// Accounts to insert or replace
    pub accounts: Vec<Account>,
    /// Posts to insert or replace
    pub posts: Vec<Post>,
    /// Donations to append
    pub donations: Vec<DonationRecord>,
    /// Purchases to append
    pub purchases: Vec<PurchaseRecord>,
    /// Comments to append
    pub comments: Vec<Comment>,
}

impl WriteSet {
    /// Empty write set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account write
    pub fn account(mut self, account: Account) -> Self {
        self.accounts.push(account);
        self
    }

    /// Add a post write
    pub fn post(mut self, post: Post) -> Self {
        self.posts.push(post);
        self
    }

    /// Add a donation record
    pub fn donation(mut self, record: DonationRecord) -> Self {
        self.donations.push(record);
        self
    }

    /// Add a purchase record
    pub fn purchase(mut self, record: PurchaseRecord) -> Self {
        self.purchases.push(record);
        self
    }

    /// Add a comment
    pub fn comment(mut self, comment: Comment) -> Self {
        self.comments.push(comment);
        self
    }

    /// Number of records in the set
    pub fn len(&self) -> usize {
        self.accounts.len()
            + self.posts.len()
            + self.donations.len()
            + self.purchases.len()
            + self.comments.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Backing store for accounts, posts and their records
pub trait LedgerStore: Send + Sync {
    /// Account by ID
    fn get_account(&self, id: &AccountId) -> Result<Option<Account>>;

    /// Post by ID
    fn get_post(&self, id: &PostId) -> Result<Option<Post>>;

    /// Donation by ID
    fn get_donation(&self, id: Uuid) -> Result<Option<DonationRecord>>;

    /// Every post, in no particular order
    fn list_posts(&self) -> Result<Vec<Post>>;

    /// Every donation, in no particular order
    fn list_donations(&self) -> Result<Vec<DonationRecord>>;

    /// Every purchase, in no particular order
    fn list_purchases(&self) -> Result<Vec<PurchaseRecord>>;

    /// Comments on one post, in no particular order
    fn comments_for_post(&self, post_id: &PostId) -> Result<Vec<Comment>>;

    /// Apply every write in `writes` atomically
    fn commit(&self, writes: WriteSet) -> Result<()>;

    /// Add `delta` to an account balance
    ///
    /// Not atomic against concurrent read-modify-write on the same account
    /// unless the caller holds that account's lock.
    fn adjust_balance(&self, id: &AccountId, delta: Decimal) -> Result<Account> {
        let mut account = self
            .get_account(id)?
            .ok_or_else(|| Error::AccountNotFound(id.clone()))?;

        account.apply_delta(delta, Utc::now())?;
        self.commit(WriteSet::new().account(account.clone()))?;
        Ok(account)
    }

    /// Add `amount` to a post's donation total
    ///
    /// Same locking requirement as [`LedgerStore::adjust_balance`].
    fn add_donation_total(&self, id: &PostId, amount: Decimal) -> Result<Post> {
        let mut post = self
            .get_post(id)?
            .ok_or_else(|| Error::PostNotFound(id.clone()))?;

        post.add_donation(amount, Utc::now())?;
        self.commit(WriteSet::new().post(post.clone()))?;
        Ok(post)
    }
}

impl<S: LedgerStore + ?Sized> LedgerStore for Box<S> {
    fn get_account(&self, id: &AccountId) -> Result<Option<Account>> {
        (**self).get_account(id)
    }

    fn get_post(&self, id: &PostId) -> Result<Option<Post>> {
        (**self).get_post(id)
    }

    fn get_donation(&self, id: Uuid) -> Result<Option<DonationRecord>> {
        (**self).get_donation(id)
    }

    fn list_posts(&self) -> Result<Vec<Post>> {
        (**self).list_posts()
    }

    fn list_donations(&self) -> Result<Vec<DonationRecord>> {
        (**self).list_donations()
    }

    fn list_purchases(&self) -> Result<Vec<PurchaseRecord>> {
        (**self).list_purchases()
    }

    fn comments_for_post(&self, post_id: &PostId) -> Result<Vec<Comment>> {
        (**self).comments_for_post(post_id)
    }

    fn commit(&self, writes: WriteSet) -> Result<()> {
        (**self).commit(writes)
    }
}

/// Store chosen at runtime from configuration
pub type DynStore = Box<dyn LedgerStore>;

/// Open the store selected by `config.storage`
pub fn open_store(config: &Config) -> Result<DynStore> {
    match config.storage {
        StorageBackend::Memory => Ok(Box::new(MemoryStore::new())),
        #[cfg(feature = "rocksdb")]
        StorageBackend::Rocksdb => Ok(Box::new(crate::storage::RocksStore::open(config)?)),
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::Rocksdb => Err(Error::Config(
            "RocksDB backend requires the `rocksdb` feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory_store() {
        let store = open_store(&Config::default()).unwrap();
        assert!(store.list_posts().unwrap().is_empty());
    }

    #[cfg(not(feature = "rocksdb"))]
    #[test]
    fn test_rocksdb_backend_needs_feature() {
        let config = Config {
            storage: StorageBackend::Rocksdb,
            ..Config::default()
        };
        match open_store(&config) {
            Err(err) => assert_eq!(err.reason_code(), "config"),
            Ok(_) => panic!("rocksdb backend opened without the feature"),
        }
    }

    #[test]
    fn test_write_set_len() {
        let set = WriteSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }
}
