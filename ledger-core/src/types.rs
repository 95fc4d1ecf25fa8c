//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode when persisted)
//! - Exact arithmetic (Decimal for coin amounts)

use chrono::{DateTime, Utc};
use ranking_engine::Rankable;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Account identifier (Farcaster id or any opaque user key)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Post identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostId(String);

impl PostId {
    /// Create post ID from an existing key
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh time-ordered post ID
    pub fn generate() -> Self {
        Self(format!("post_{}", Uuid::now_v7().simple()))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PostId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// User account holding a coin balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID
    pub id: AccountId,

    /// Handle
    pub username: String,

    /// Display name
    pub display_name: String,

    /// Avatar URL
    pub profile_image: Option<String>,

    /// Coin balance, never negative
    pub balance: Decimal,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Apply a signed balance change
    ///
    /// Leaves the account untouched and fails if the result would be
    /// negative or out of range.
    pub fn apply_delta(&mut self, delta: Decimal, at: DateTime<Utc>) -> crate::Result<()> {
        let next = self.balance.checked_add(delta).ok_or_else(|| {
            crate::Error::Overflow(format!("balance of {} plus {}", self.id, delta))
        })?;
        if next < Decimal::ZERO {
            return Err(crate::Error::InsufficientBalance {
                account: self.id.clone(),
                available: self.balance,
                requested: -delta,
            });
        }

        self.balance = next;
        self.updated_at = at;
        Ok(())
    }
}

/// Registration details for a new account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    /// Account ID
    pub id: AccountId,
    /// Handle
    pub username: String,
    /// Display name
    pub display_name: String,
    /// Avatar URL
    pub profile_image: Option<String>,
}

impl NewAccount {
    /// Registration using the ID as handle and display name
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            id: AccountId::new(id.clone()),
            username: id.clone(),
            display_name: id,
            profile_image: None,
        }
    }

    /// Set the display name
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// Partial update of an account's public identity
///
/// Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New handle
    pub username: Option<String>,
    /// New display name
    pub display_name: Option<String>,
    /// New avatar URL
    pub profile_image: Option<String>,
}

impl ProfileUpdate {
    /// Change the handle
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Change the display name
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Change the avatar
    pub fn profile_image(mut self, url: impl Into<String>) -> Self {
        self.profile_image = Some(url.into());
        self
    }

    /// Apply to `account`, trimming names
    ///
    /// Blank names are rejected and leave the account untouched.
    pub fn apply(self, account: &mut Account, at: DateTime<Utc>) -> crate::Result<()> {
        let username = required("username", self.username)?;
        let display_name = required("display name", self.display_name)?;

        if let Some(username) = username {
            account.username = username;
        }
        if let Some(display_name) = display_name {
            account.display_name = display_name;
        }
        if let Some(url) = self.profile_image {
            account.profile_image = Some(url).filter(|u| !u.trim().is_empty());
        }
        account.updated_at = at;
        Ok(())
    }
}

fn required(field: &str, value: Option<String>) -> crate::Result<Option<String>> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Err(crate::Error::InvalidProfile(format!(
            "{} must not be blank",
            field
        ))),
        other => Ok(other),
    }
}

/// Kind of attached media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Still image
    Photo,
    /// Video clip
    Video,
}

/// Media attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    /// Location of the uploaded file
    pub url: String,
    /// Media kind
    pub kind: MediaKind,
}

/// Feed post with its engagement state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Post ID
    pub id: PostId,

    /// Author
    pub creator: AccountId,

    /// Text content
    pub description: String,

    /// Optional photo or video
    pub media: Option<Media>,

    /// Accounts that liked the post
    pub liked_by: BTreeSet<AccountId>,

    /// Accounts that reported the post
    pub flagged_by: BTreeSet<AccountId>,

    /// Number of comments
    pub comments_count: u64,

    /// Total coins donated to this post
    pub donations_received: Decimal,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Credit a donation to the running total
    ///
    /// Leaves the post untouched if the total would overflow.
    pub fn add_donation(&mut self, amount: Decimal, at: DateTime<Utc>) -> crate::Result<()> {
        self.donations_received = self
            .donations_received
            .checked_add(amount)
            .ok_or_else(|| crate::Error::Overflow(format!("donation total of post {}", self.id)))?;
        self.updated_at = at;
        Ok(())
    }

    /// Number of likes
    pub fn likes_count(&self) -> u64 {
        self.liked_by.len() as u64
    }

    /// Number of flags
    pub fn flag_count(&self) -> u64 {
        self.flagged_by.len() as u64
    }

    /// Whether `account` liked this post
    pub fn is_liked_by(&self, account: &AccountId) -> bool {
        self.liked_by.contains(account)
    }

    /// Whether `account` flagged this post
    pub fn is_flagged_by(&self, account: &AccountId) -> bool {
        self.flagged_by.contains(account)
    }
}

impl Rankable for Post {
    fn likes_count(&self) -> u64 {
        Post::likes_count(self)
    }

    fn comments_count(&self) -> u64 {
        self.comments_count
    }

    fn flag_count(&self) -> Option<u64> {
        Some(Post::flag_count(self))
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Request to publish a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    /// Author
    pub creator: AccountId,
    /// Text content
    pub description: String,
    /// Optional photo or video
    pub media: Option<Media>,
}

impl NewPost {
    /// Text-only post
    pub fn new(creator: AccountId, description: impl Into<String>) -> Self {
        Self {
            creator,
            description: description.into(),
            media: None,
        }
    }

    /// Attach media
    pub fn with_media(mut self, url: impl Into<String>, kind: MediaKind) -> Self {
        self.media = Some(Media {
            url: url.into(),
            kind,
        });
        self
    }
}

/// Confirmation state of an on-chain transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Submitted, not yet mined
    Pending,
    /// Mined
    Confirmed,
    /// Reverted or dropped
    Failed,
}

/// On-chain GOOD token transfer performed by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransfer {
    /// Transaction hash
    pub tx_hash: String,
    /// Sender wallet
    pub from_address: String,
    /// Recipient wallet
    pub to_address: String,
    /// Raw token amount in base units (wei)
    pub token_amount: String,
    /// Token symbol
    pub token_symbol: String,
    /// Confirmation state
    pub status: TransferStatus,
}

impl TokenTransfer {
    /// Check that every identifying field is present
    pub fn validate(&self) -> crate::Result<()> {
        let fields = [
            ("tx_hash", &self.tx_hash),
            ("from_address", &self.from_address),
            ("to_address", &self.to_address),
            ("token_amount", &self.token_amount),
            ("token_symbol", &self.token_symbol),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(crate::Error::InvalidTransfer(format!("{} is required", name)));
            }
        }

        Ok(())
    }
}

/// How a donation moved value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationKind {
    /// Debited and credited ledger balances
    Virtual,
    /// Recorded after an on-chain token transfer
    Token(TokenTransfer),
}

/// Immutable record of a completed donation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationRecord {
    /// Unique donation ID (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Payer
    pub from: AccountId,

    /// Payee
    pub to: AccountId,

    /// Donated amount
    pub amount: Decimal,

    /// Post the donation is attributed to
    pub post_id: PostId,

    /// Transfer variant
    pub kind: DonationKind,

    /// Execution timestamp
    pub created_at: DateTime<Utc>,
}

impl DonationRecord {
    /// Whether the value moved on-chain
    pub fn is_token_transfer(&self) -> bool {
        matches!(self.kind, DonationKind::Token(_))
    }

    /// Human-readable summary
    pub fn description(&self) -> String {
        match &self.kind {
            DonationKind::Virtual => format!("Sent {} GOOD coins", self.amount),
            DonationKind::Token(transfer) => {
                format!("Sent {} {}", transfer.token_amount, transfer.token_symbol)
            }
        }
    }
}

/// Comment on a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment ID
    pub id: Uuid,
    /// Post commented on
    pub post_id: PostId,
    /// Author
    pub author: AccountId,
    /// Trimmed text
    pub text: String,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Which side of a donation to select
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Donations paid by the account
    Sent,
    /// Donations received by the account
    Received,
    /// Both
    All,
}

impl Direction {
    /// Whether `record` matches this direction for `account`
    pub fn matches(&self, record: &DonationRecord, account: &AccountId) -> bool {
        match self {
            Direction::Sent => &record.from == account,
            Direction::Received => &record.to == account,
            Direction::All => &record.from == account || &record.to == account,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(balance: i64) -> Account {
        Account {
            id: AccountId::new("alice"),
            username: "alice".to_string(),
            display_name: "Alice".to_string(),
            profile_image: None,
            balance: Decimal::from(balance),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_apply_delta_rejects_overdraw() {
        let mut acct = account(10);
        let err = acct.apply_delta(Decimal::from(-30), Utc::now()).unwrap_err();
        assert_eq!(err.reason_code(), "insufficient_balance");
        assert_eq!(acct.balance, Decimal::from(10));

        acct.apply_delta(Decimal::from(-10), Utc::now()).unwrap();
        assert_eq!(acct.balance, Decimal::ZERO);
    }

    #[test]
    fn test_apply_delta_rejects_overflow() {
        let mut acct = account(0);
        acct.balance = Decimal::MAX;
        let err = acct.apply_delta(Decimal::ONE, Utc::now()).unwrap_err();
        assert_eq!(err.reason_code(), "overflow");
        assert_eq!(acct.balance, Decimal::MAX);
    }

    #[test]
    fn test_add_donation_rejects_overflow() {
        let mut post = Post {
            id: PostId::new("post_1"),
            creator: AccountId::new("bob"),
            description: "Beach cleanup".to_string(),
            media: None,
            liked_by: BTreeSet::new(),
            flagged_by: BTreeSet::new(),
            comments_count: 0,
            donations_received: Decimal::MAX,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let err = post.add_donation(Decimal::ONE, Utc::now()).unwrap_err();
        assert_eq!(err.reason_code(), "overflow");
        assert_eq!(post.donations_received, Decimal::MAX);

        post.donations_received = Decimal::from(2);
        post.add_donation(Decimal::from(3), Utc::now()).unwrap();
        assert_eq!(post.donations_received, Decimal::from(5));
    }

    #[test]
    fn test_profile_update_apply() {
        let mut acct = account(10);
        ProfileUpdate::default()
            .display_name("  Alice B  ")
            .profile_image("https://cdn.example/alice.png")
            .apply(&mut acct, Utc::now())
            .unwrap();
        assert_eq!(acct.display_name, "Alice B");
        assert_eq!(acct.username, "alice");
        assert_eq!(acct.profile_image.as_deref(), Some("https://cdn.example/alice.png"));

        let err = ProfileUpdate::default()
            .username("newhandle")
            .display_name("   ")
            .apply(&mut acct, Utc::now())
            .unwrap_err();
        assert_eq!(err.reason_code(), "invalid_profile");
        assert_eq!(acct.username, "alice");
        assert_eq!(acct.balance, Decimal::from(10));
    }

    #[test]
    fn test_post_id_generate_unique() {
        let a = PostId::generate();
        let b = PostId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("post_"));
    }

    #[test]
    fn test_token_transfer_validation() {
        let mut transfer = TokenTransfer {
            tx_hash: "0xabc".to_string(),
            from_address: "0x1".to_string(),
            to_address: "0x2".to_string(),
            token_amount: "1000000000000000000".to_string(),
            token_symbol: "GOOD".to_string(),
            status: TransferStatus::Confirmed,
        };
        assert!(transfer.validate().is_ok());

        transfer.from_address = " ".to_string();
        let err = transfer.validate().unwrap_err();
        assert!(err.to_string().contains("from_address"));
    }

    #[test]
    fn test_donation_kind_is_tagged() {
        let json = serde_json::to_value(DonationKind::Virtual).unwrap();
        assert_eq!(json, serde_json::json!("virtual"));

        let token = DonationKind::Token(TokenTransfer {
            tx_hash: "0xabc".to_string(),
            from_address: "0x1".to_string(),
            to_address: "0x2".to_string(),
            token_amount: "5".to_string(),
            token_symbol: "GOOD".to_string(),
            status: TransferStatus::Pending,
        });
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["token"]["status"], "pending");
    }

    #[test]
    fn test_direction_matches() {
        let record = DonationRecord {
            id: Uuid::now_v7(),
            from: AccountId::new("a"),
            to: AccountId::new("b"),
            amount: Decimal::from(5),
            post_id: PostId::new("p"),
            kind: DonationKind::Virtual,
            created_at: Utc::now(),
        };

        assert!(Direction::Sent.matches(&record, &AccountId::new("a")));
        assert!(!Direction::Sent.matches(&record, &AccountId::new("b")));
        assert!(Direction::Received.matches(&record, &AccountId::new("b")));
        assert!(Direction::All.matches(&record, &AccountId::new("b")));
        assert_eq!(record.description(), "Sent 5 GOOD coins");
    }
}
