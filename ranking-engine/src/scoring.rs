//! Feed scoring

use crate::{Rankable, Result, ScoreBreakdown, ScoringConfig};
use chrono::{DateTime, Utc};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Computes time-decayed engagement scores
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedScorer {
    config: ScoringConfig,
}

impl FeedScorer {
    /// Create scorer with a validated configuration
    pub fn new(config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a post as of `now`
    ///
    /// A creation time in the future yields a negative age which is used
    /// as is.
    pub fn score<P: Rankable + ?Sized>(&self, post: &P, now: DateTime<Utc>) -> f64 {
        self.breakdown_raw(post, now).score
    }

    /// Score a post and report every intermediate term
    pub fn breakdown<P: Rankable + ?Sized>(&self, post: &P, now: DateTime<Utc>) -> ScoreBreakdown {
        let raw = self.breakdown_raw(post, now);
        ScoreBreakdown {
            age_in_hours: round2(raw.age_in_hours),
            time_decay: round2(raw.time_decay),
            ..raw
        }
    }

    fn breakdown_raw<P: Rankable + ?Sized>(&self, post: &P, now: DateTime<Utc>) -> ScoreBreakdown {
        let age_in_hours = age_hours(post.created_at(), now);

        let engagement =
            post.likes_count() as f64 + post.comments_count() as f64 * self.config.comment_weight;
        let flag_penalty = post.flag_count().unwrap_or(0) as f64 * self.config.flag_weight;
        let base_score = engagement - flag_penalty;

        let time_decay =
            (age_in_hours + self.config.grace_period_hours).powf(self.config.decay_exponent);

        ScoreBreakdown {
            score: base_score / time_decay,
            engagement,
            flag_penalty,
            base_score,
            age_in_hours,
            time_decay,
        }
    }
}

/// Age of a post in fractional hours at millisecond resolution
pub fn age_hours(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - created_at).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
