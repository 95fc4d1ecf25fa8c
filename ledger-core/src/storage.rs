//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `accounts` - Accounts (key: account id)
//! - `posts` - Posts (key: post id)
//! - `donations` - Append-only donation records (key: donation id)
//! - `purchases` - Append-only purchase records (key: purchase id)
//! - `comments` - Comments (key: post id length (u64 BE) || post id || comment id)
//!
//! Values are bincode. A [`WriteSet`] becomes one `WriteBatch`.

use crate::{
    error::{Error, Result},
    purchase::PurchaseRecord,
    store::{LedgerStore, WriteSet},
    types::{Account, AccountId, Comment, DonationRecord, Post, PostId},
    Config,
};
use parking_lot::Mutex;
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_POSTS: &str = "posts";
const CF_DONATIONS: &str = "donations";
const CF_PURCHASES: &str = "purchases";
const CF_COMMENTS: &str = "comments";

/// Store backed by RocksDB
pub struct RocksStore {
    db: Arc<DB>,
    /// Serializes the append-only duplicate check with the batch write
    commit_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create database under `config.data_dir`
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_POSTS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_DONATIONS, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_PURCHASES, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_COMMENTS, Self::cf_options_log()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB store");

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Mutex::new(()),
        })
    }

    // Column family options

    /// Mutable, frequently read records
    fn cf_options_records() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    /// Append-only history
    fn cf_options_log() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn get<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf_handle(cf)?;
        match self.db.get_cf(&cf, key)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str, prefix: &[u8]) -> Result<Vec<T>> {
        let cf = self.cf_handle(cf)?;
        let mode = if prefix.is_empty() {
            IteratorMode::Start
        } else {
            IteratorMode::From(prefix, rocksdb::Direction::Forward)
        };

        let mut values = Vec::new();
        for item in self.db.iterator_cf(&cf, mode) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(bincode::deserialize(&value)?);
        }
        Ok(values)
    }

    fn exists(&self, cf: &str, key: &[u8]) -> Result<bool> {
        let cf = self.cf_handle(cf)?;
        Ok(self.db.get_pinned_cf(&cf, key)?.is_some())
    }

    /// Length-prefixed so no post ID's prefix matches another's
    fn comment_prefix(post_id: &PostId) -> Vec<u8> {
        let id = post_id.as_str().as_bytes();
        let mut key = Vec::with_capacity(8 + id.len() + 16);
        key.extend_from_slice(&(id.len() as u64).to_be_bytes());
        key.extend_from_slice(id);
        key
    }

    fn comment_key(comment: &Comment) -> Vec<u8> {
        let mut key = Self::comment_prefix(&comment.post_id);
        key.extend_from_slice(comment.id.as_bytes());
        key
    }

    /// Approximate number of keys per column family
    pub fn get_stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            accounts: self.approximate_count(CF_ACCOUNTS)?,
            posts: self.approximate_count(CF_POSTS)?,
            donations: self.approximate_count(CF_DONATIONS)?,
            purchases: self.approximate_count(CF_PURCHASES)?,
        })
    }

    fn approximate_count(&self, cf: &str) -> Result<u64> {
        let cf = self.cf_handle(cf)?;
        Ok(self
            .db
            .property_int_value_cf(&cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0))
    }
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore")
            .field("path", &self.db.path())
            .finish()
    }
}

impl LedgerStore for RocksStore {
    fn get_account(&self, id: &AccountId) -> Result<Option<Account>> {
        self.get(CF_ACCOUNTS, id.as_str().as_bytes())
    }

    fn get_post(&self, id: &PostId) -> Result<Option<Post>> {
        self.get(CF_POSTS, id.as_str().as_bytes())
    }

    fn get_donation(&self, id: Uuid) -> Result<Option<DonationRecord>> {
        self.get(CF_DONATIONS, id.as_bytes())
    }

    fn list_posts(&self) -> Result<Vec<Post>> {
        self.scan(CF_POSTS, &[])
    }

    fn list_donations(&self) -> Result<Vec<DonationRecord>> {
        self.scan(CF_DONATIONS, &[])
    }

    fn list_purchases(&self) -> Result<Vec<PurchaseRecord>> {
        self.scan(CF_PURCHASES, &[])
    }

    fn comments_for_post(&self, post_id: &PostId) -> Result<Vec<Comment>> {
        self.scan(CF_COMMENTS, &Self::comment_prefix(post_id))
    }

    fn commit(&self, writes: WriteSet) -> Result<()> {
        let _guard = self.commit_lock.lock();

        for donation in &writes.donations {
            if self.exists(CF_DONATIONS, donation.id.as_bytes())? {
                return Err(Error::Storage(format!("Donation {} already recorded", donation.id)));
            }
        }
        for purchase in &writes.purchases {
            if self.exists(CF_PURCHASES, purchase.id.as_bytes())? {
                return Err(Error::Storage(format!("Purchase {} already recorded", purchase.id)));
            }
        }

        let mut batch = WriteBatch::default();

        let cf = self.cf_handle(CF_ACCOUNTS)?;
        for account in &writes.accounts {
            batch.put_cf(&cf, account.id.as_str().as_bytes(), bincode::serialize(account)?);
        }

        let cf = self.cf_handle(CF_POSTS)?;
        for post in &writes.posts {
            batch.put_cf(&cf, post.id.as_str().as_bytes(), bincode::serialize(post)?);
        }

        let cf = self.cf_handle(CF_DONATIONS)?;
        for donation in &writes.donations {
            batch.put_cf(&cf, donation.id.as_bytes(), bincode::serialize(donation)?);
        }

        let cf = self.cf_handle(CF_PURCHASES)?;
        for purchase in &writes.purchases {
            batch.put_cf(&cf, purchase.id.as_bytes(), bincode::serialize(purchase)?);
        }

        let cf = self.cf_handle(CF_COMMENTS)?;
        for comment in &writes.comments {
            batch.put_cf(&cf, Self::comment_key(comment), bincode::serialize(comment)?);
        }

        // Atomic commit
        self.db.write(batch)?;

        tracing::debug!(records = writes.len(), "Write batch committed");

        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Accounts
    pub accounts: u64,
    /// Posts
    pub posts: u64,
    /// Donation records
    pub donations: u64,
    /// Purchase records
    pub purchases: u64,
}
