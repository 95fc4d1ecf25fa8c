//! In-process store
//!
//! Keeps every record in hash maps behind one `RwLock`. A commit takes the
//! write lock once, validates the whole write set, then applies it, so
//! readers never observe half of a commit.

use crate::{
    purchase::PurchaseRecord,
    store::{LedgerStore, WriteSet},
    types::{Account, AccountId, Comment, DonationRecord, Post, PostId},
    Error, Result,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    posts: HashMap<PostId, Post>,
    donations: HashMap<Uuid, DonationRecord>,
    purchases: HashMap<Uuid, PurchaseRecord>,
    comments: HashMap<PostId, Vec<Comment>>,
}

/// Record counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Accounts
    pub accounts: usize,
    /// Posts
    pub posts: usize,
    /// Donation records
    pub donations: usize,
    /// Purchase records
    pub purchases: usize,
    /// Comments
    pub comments: usize,
}

/// Store kept entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record counts
    pub fn stats(&self) -> StoreStats {
        let tables = self.tables.read();
        StoreStats {
            accounts: tables.accounts.len(),
            posts: tables.posts.len(),
            donations: tables.donations.len(),
            purchases: tables.purchases.len(),
            comments: tables.comments.values().map(Vec::len).sum(),
        }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("stats", &self.stats())
            .finish()
    }
}

impl LedgerStore for MemoryStore {
    fn get_account(&self, id: &AccountId) -> Result<Option<Account>> {
        Ok(self.tables.read().accounts.get(id).cloned())
    }

    fn get_post(&self, id: &PostId) -> Result<Option<Post>> {
        Ok(self.tables.read().posts.get(id).cloned())
    }

    fn get_donation(&self, id: Uuid) -> Result<Option<DonationRecord>> {
        Ok(self.tables.read().donations.get(&id).cloned())
    }

    fn list_posts(&self) -> Result<Vec<Post>> {
        Ok(self.tables.read().posts.values().cloned().collect())
    }

    fn list_donations(&self) -> Result<Vec<DonationRecord>> {
        Ok(self.tables.read().donations.values().cloned().collect())
    }

    fn list_purchases(&self) -> Result<Vec<PurchaseRecord>> {
        Ok(self.tables.read().purchases.values().cloned().collect())
    }

    fn comments_for_post(&self, post_id: &PostId) -> Result<Vec<Comment>> {
        Ok(self
            .tables
            .read()
            .comments
            .get(post_id)
            .cloned()
            .unwrap_or_default())
    }

    fn commit(&self, writes: WriteSet) -> Result<()> {
        let mut tables = self.tables.write();

        // Records are append-only: refuse the whole set if any ID exists
        if let Some(dup) = writes
            .donations
            .iter()
            .find(|d| tables.donations.contains_key(&d.id))
        {
            return Err(Error::Storage(format!("Donation {} already recorded", dup.id)));
        }
        if let Some(dup) = writes
            .purchases
            .iter()
            .find(|p| tables.purchases.contains_key(&p.id))
        {
            return Err(Error::Storage(format!("Purchase {} already recorded", dup.id)));
        }

        let count = writes.len();

        for account in writes.accounts {
            tables.accounts.insert(account.id.clone(), account);
        }
        for post in writes.posts {
            tables.posts.insert(post.id.clone(), post);
        }
        for donation in writes.donations {
            tables.donations.insert(donation.id, donation);
        }
        for purchase in writes.purchases {
            tables.purchases.insert(purchase.id, purchase);
        }
        for comment in writes.comments {
            tables
                .comments
                .entry(comment.post_id.clone())
                .or_default()
                .push(comment);
        }

        tracing::debug!(records = count, "Write set committed");

        Ok(())
    }
}
