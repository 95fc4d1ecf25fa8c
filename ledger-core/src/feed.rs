//! Posts and engagement
//!
//! Likes, flags and comments rewrite the whole post record, so each of them
//! runs under the post's lock from the same table the ledger uses for
//! donations. A like can never overwrite a concurrent donation total.

use crate::{
    ledger::observe,
    lock::{LockKey, LockTable},
    metrics::Metrics,
    store::{LedgerStore, WriteSet},
    types::{AccountId, Comment, NewPost, Post, PostId},
    Error, Result,
};
use chrono::{DateTime, Utc};
use ranking_engine::{FeedScorer, ScoreBreakdown};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Feed service
pub struct Feed<S: LedgerStore> {
    store: Arc<S>,
    locks: Arc<LockTable>,
    scorer: FeedScorer,
    metrics: Option<Metrics>,
}

impl<S: LedgerStore> Clone for Feed<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            locks: Arc::clone(&self.locks),
            scorer: self.scorer,
            metrics: self.metrics.clone(),
        }
    }
}

impl<S: LedgerStore> std::fmt::Debug for Feed<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feed")
            .field("scorer", &self.scorer)
            .finish_non_exhaustive()
    }
}

impl<S: LedgerStore> Feed<S> {
    pub(crate) fn new(
        store: Arc<S>,
        locks: Arc<LockTable>,
        scorer: FeedScorer,
        metrics: Option<Metrics>,
    ) -> Self {
        Self {
            store,
            locks,
            scorer,
            metrics,
        }
    }

    /// Scorer used by [`Feed::ranked`]
    pub fn scorer(&self) -> &FeedScorer {
        &self.scorer
    }

    /// Publish a post
    pub fn create_post(&self, new: NewPost) -> Result<Post> {
        let result = self.execute_create_post(new);

        if let Ok(post) = &result {
            tracing::info!(post_id = %post.id, creator = %post.creator, "Post created");
        }

        observe(self.metrics.as_ref(), "create_post", result)
    }

    fn execute_create_post(&self, new: NewPost) -> Result<Post> {
        let description = new.description.trim();
        if description.is_empty() {
            return Err(Error::InvalidPost("description is required".to_string()));
        }
        if self.store.get_account(&new.creator)?.is_none() {
            return Err(Error::AccountNotFound(new.creator));
        }

        let now = Utc::now();
        let post = Post {
            id: PostId::generate(),
            creator: new.creator,
            description: description.to_string(),
            media: new.media,
            liked_by: BTreeSet::new(),
            flagged_by: BTreeSet::new(),
            comments_count: 0,
            donations_received: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };

        self.store.commit(WriteSet::new().post(post.clone()))?;
        Ok(post)
    }

    /// Get post
    pub fn get_post(&self, id: &PostId) -> Result<Post> {
        self.store
            .get_post(id)?
            .ok_or_else(|| Error::PostNotFound(id.clone()))
    }

    /// All posts, newest first
    pub fn latest(&self) -> Result<Vec<Post>> {
        self.posts_where(|_| true)
    }

    /// Posts by `creator`, newest first
    pub fn posts_by_creator(&self, creator: &AccountId) -> Result<Vec<Post>> {
        self.posts_where(|p| &p.creator == creator)
    }

    /// Posts liked by `account`, newest first
    pub fn posts_liked_by(&self, account: &AccountId) -> Result<Vec<Post>> {
        self.posts_where(|p| p.is_liked_by(account))
    }

    fn posts_where(&self, predicate: impl Fn(&Post) -> bool) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .store
            .list_posts()?
            .into_iter()
            .filter(|p| predicate(p))
            .collect();

        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(posts)
    }

    /// Like a post once per account
    pub fn like(&self, post_id: &PostId, account: &AccountId) -> Result<Post> {
        self.engage("like", post_id, account, |post| {
            if !post.liked_by.insert(account.clone()) {
                return Err(Error::AlreadyLiked {
                    post: post_id.clone(),
                    account: account.clone(),
                });
            }
            Ok(())
        })
    }

    /// Withdraw a like
    pub fn unlike(&self, post_id: &PostId, account: &AccountId) -> Result<Post> {
        self.engage("unlike", post_id, account, |post| {
            if !post.liked_by.remove(account) {
                return Err(Error::NotLiked {
                    post: post_id.clone(),
                    account: account.clone(),
                });
            }
            Ok(())
        })
    }

    /// Report a post once per account
    pub fn flag(&self, post_id: &PostId, account: &AccountId) -> Result<Post> {
        self.engage("flag", post_id, account, |post| {
            if !post.flagged_by.insert(account.clone()) {
                return Err(Error::AlreadyFlagged {
                    post: post_id.clone(),
                    account: account.clone(),
                });
            }
            Ok(())
        })
    }

    /// Withdraw a report
    pub fn unflag(&self, post_id: &PostId, account: &AccountId) -> Result<Post> {
        self.engage("unflag", post_id, account, |post| {
            if !post.flagged_by.remove(account) {
                return Err(Error::NotFlagged {
                    post: post_id.clone(),
                    account: account.clone(),
                });
            }
            Ok(())
        })
    }

    /// Read-modify-write of one post under its lock
    fn engage(
        &self,
        operation: &'static str,
        post_id: &PostId,
        account: &AccountId,
        apply: impl FnOnce(&mut Post) -> Result<()>,
    ) -> Result<Post> {
        let result = self
            .locks
            .with_locks([LockKey::from(post_id)], || -> Result<Post> {
                let mut post = self.get_post(post_id)?;
                if self.store.get_account(account)?.is_none() {
                    return Err(Error::AccountNotFound(account.clone()));
                }

                apply(&mut post)?;
                post.updated_at = Utc::now();

                self.store.commit(WriteSet::new().post(post.clone()))?;
                Ok(post)
            });

        if result.is_ok() {
            tracing::debug!(operation, post_id = %post_id, account = %account, "Engagement recorded");
        }

        observe(self.metrics.as_ref(), operation, result)
    }

    /// Comment on a post
    ///
    /// The comment and the post's incremented count are committed together.
    pub fn add_comment(&self, post_id: &PostId, author: &AccountId, text: &str) -> Result<Comment> {
        let result = self.execute_add_comment(post_id, author, text);

        if let Ok(comment) = &result {
            tracing::info!(
                comment_id = %comment.id,
                post_id = %comment.post_id,
                author = %comment.author,
                "Comment added"
            );
        }

        observe(self.metrics.as_ref(), "add_comment", result)
    }

    fn execute_add_comment(&self, post_id: &PostId, author: &AccountId, text: &str) -> Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidComment("text is required".to_string()));
        }

        self.locks
            .with_locks([LockKey::from(post_id)], || -> Result<Comment> {
                let mut post = self.get_post(post_id)?;
                if self.store.get_account(author)?.is_none() {
                    return Err(Error::AccountNotFound(author.clone()));
                }

                let now = Utc::now();
                post.comments_count += 1;
                post.updated_at = now;

                let comment = Comment {
                    id: Uuid::now_v7(),
                    post_id: post_id.clone(),
                    author: author.clone(),
                    text: text.to_string(),
                    created_at: now,
                };

                self.store
                    .commit(WriteSet::new().post(post).comment(comment.clone()))?;
                Ok(comment)
            })
    }

    /// Comments on a post, newest first
    pub fn comments_for_post(&self, post_id: &PostId) -> Result<Vec<Comment>> {
        self.get_post(post_id)?;

        let mut comments = self.store.comments_for_post(post_id)?;
        comments.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(comments)
    }

    /// Every post, highest score first
    pub fn ranked(&self, now: DateTime<Utc>) -> Result<Vec<Post>> {
        Ok(self.scorer.sort_by_score(&self.store.list_posts()?, now))
    }

    /// The `limit` highest-scoring posts
    pub fn top(&self, limit: usize, now: DateTime<Utc>) -> Result<Vec<Post>> {
        Ok(self.scorer.top_posts(&self.store.list_posts()?, limit, now))
    }

    /// Score components of one post
    pub fn score_breakdown(&self, post_id: &PostId, now: DateTime<Utc>) -> Result<ScoreBreakdown> {
        Ok(self.scorer.breakdown(&self.get_post(post_id)?, now))
    }
}
