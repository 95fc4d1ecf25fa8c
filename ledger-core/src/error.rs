//! Error types for the ledger

use crate::types::{AccountId, PostId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Rejections are expected outcomes the caller reports back to the user.
/// Everything from `Storage` down is an infrastructure failure.
#[derive(Error, Debug)]
pub enum Error {
    /// Donation amount is zero or negative
    #[error("Invalid amount: {0} (must be positive)")]
    InvalidAmount(Decimal),

    /// Payer and payee are the same account
    #[error("Account {0} cannot donate to itself")]
    SelfDonation(AccountId),

    /// Payer account does not exist
    #[error("Payer not found: {0}")]
    PayerNotFound(AccountId),

    /// Payee account does not exist
    #[error("Payee not found: {0}")]
    PayeeNotFound(AccountId),

    /// Post does not exist
    #[error("Post not found: {0}")]
    PostNotFound(PostId),

    /// Balance too low for the requested debit
    #[error("Insufficient balance on {account}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Debited account
        account: AccountId,
        /// Balance at the time of the check
        available: Decimal,
        /// Requested debit
        requested: Decimal,
    },

    /// Account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// User already liked the post
    #[error("Post {post} already liked by {account}")]
    AlreadyLiked {
        /// Post
        post: PostId,
        /// Liking account
        account: AccountId,
    },

    /// User has not liked the post
    #[error("Post {post} not liked by {account}")]
    NotLiked {
        /// Post
        post: PostId,
        /// Account
        account: AccountId,
    },

    /// User already flagged the post
    #[error("Post {post} already flagged by {account}")]
    AlreadyFlagged {
        /// Post
        post: PostId,
        /// Flagging account
        account: AccountId,
    },

    /// User has not flagged the post
    #[error("Post {post} not flagged by {account}")]
    NotFlagged {
        /// Post
        post: PostId,
        /// Account
        account: AccountId,
    },

    /// Post content rejected
    #[error("Invalid post: {0}")]
    InvalidPost(String),

    /// Comment content rejected
    #[error("Invalid comment: {0}")]
    InvalidComment(String),

    /// Purchase request rejected
    #[error("Invalid purchase: {0}")]
    InvalidPurchase(String),

    /// On-chain transfer details rejected
    #[error("Invalid token transfer: {0}")]
    InvalidTransfer(String),

    /// Balance or total would exceed the representable range
    #[error("Amount overflow: {0}")]
    Overflow(String),

    /// Profile update rejected
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable reason
    pub fn reason_code(&self) -> &'static str {
        match self {
            Error::InvalidAmount(_) => "invalid_amount",
            Error::SelfDonation(_) => "self_donation",
            Error::PayerNotFound(_) => "payer_not_found",
            Error::PayeeNotFound(_) => "payee_not_found",
            Error::PostNotFound(_) => "post_not_found",
            Error::InsufficientBalance { .. } => "insufficient_balance",
            Error::AccountNotFound(_) => "account_not_found",
            Error::AlreadyLiked { .. } => "already_liked",
            Error::NotLiked { .. } => "not_liked",
            Error::AlreadyFlagged { .. } => "already_flagged",
            Error::NotFlagged { .. } => "not_flagged",
            Error::InvalidPost(_) => "invalid_post",
            Error::InvalidComment(_) => "invalid_comment",
            Error::InvalidPurchase(_) => "invalid_purchase",
            Error::InvalidTransfer(_) => "invalid_transfer",
            Error::Overflow(_) => "overflow",
            Error::InvalidProfile(_) => "invalid_profile",
            Error::Storage(_) => "storage",
            Error::Serialization(_) => "serialization",
            Error::Concurrency(_) => "concurrency",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }

    /// Whether this is an expected rejection rather than a fault
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            Error::Storage(_)
                | Error::Serialization(_)
                | Error::Concurrency(_)
                | Error::Config(_)
                | Error::Io(_)
        )
    }
}

#[cfg(feature = "rocksdb")]
impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

#[cfg(feature = "rocksdb")]
impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes() {
        let err = Error::InsufficientBalance {
            account: AccountId::new("alice"),
            available: Decimal::from(10),
            requested: Decimal::from(30),
        };
        assert_eq!(err.reason_code(), "insufficient_balance");
        assert!(err.is_rejection());
        assert!(err.to_string().contains("available 10"));

        let err = Error::Storage("disk full".to_string());
        assert_eq!(err.reason_code(), "storage");
        assert!(!err.is_rejection());
    }
}
