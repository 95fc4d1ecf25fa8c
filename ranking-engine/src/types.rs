//! Core types for the ranking engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything that carries the engagement counters the score is built from
pub trait Rankable {
    /// Number of likes
    fn likes_count(&self) -> u64;

    /// Number of comments
    fn comments_count(&self) -> u64;

    /// Number of user flags, `None` when the source does not track them
    fn flag_count(&self) -> Option<u64> {
        None
    }

    /// Creation timestamp
    fn created_at(&self) -> DateTime<Utc>;
}

/// Plain engagement snapshot of a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSnapshot {
    /// Number of likes
    pub likes_count: u64,

    /// Number of comments
    pub comments_count: u64,

    /// Number of user reports (absent is treated as zero)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_count: Option<u64>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl PostSnapshot {
    /// Create new snapshot
    pub fn new(
        likes_count: u64,
        comments_count: u64,
        flag_count: Option<u64>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            likes_count,
            comments_count,
            flag_count,
            created_at,
        }
    }
}

impl Rankable for PostSnapshot {
    fn likes_count(&self) -> u64 {
        self.likes_count
    }

    fn comments_count(&self) -> u64 {
        self.comments_count
    }

    fn flag_count(&self) -> Option<u64> {
        self.flag_count
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl<T: Rankable + ?Sized> Rankable for &T {
    fn likes_count(&self) -> u64 {
        (**self).likes_count()
    }

    fn comments_count(&self) -> u64 {
        (**self).comments_count()
    }

    fn flag_count(&self) -> Option<u64> {
        (**self).flag_count()
    }

    fn created_at(&self) -> DateTime<Utc> {
        (**self).created_at()
    }
}

/// Detailed view of how a score was computed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// Final score
    pub score: f64,

    /// Weighted engagement
    pub engagement: f64,

    /// Penalty from flags
    pub flag_penalty: f64,

    /// Engagement minus penalty
    pub base_score: f64,

    /// Post age in hours (rounded to 2 decimals)
    pub age_in_hours: f64,

    /// Decay divisor (rounded to 2 decimals)
    pub time_decay: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_missing_flags_deserializes() {
        let json = r#"{"likesCount":3,"commentsCount":1,"createdAt":"2025-01-01T00:00:00Z"}"#;
        let snapshot: PostSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.flag_count, None);
        assert_eq!(snapshot.likes_count, 3);
    }
}
