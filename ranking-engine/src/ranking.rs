//! Ordering posts by score

use crate::{FeedScorer, Rankable};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

impl FeedScorer {
    /// Return a new sequence ordered by descending score
    ///
    /// Each post is scored once. Ties keep no guaranteed order; posts whose
    /// score is not a number sort after every other post.
    pub fn sort_by_score<P: Rankable + Clone>(&self, posts: &[P], now: DateTime<Utc>) -> Vec<P> {
        let mut scored: Vec<(f64, &P)> = posts
            .iter()
            .map(|post| (self.score(post, now), post))
            .collect();

        scored.sort_by(|(a, _), (b, _)| descending(*a, *b));

        scored.into_iter().map(|(_, post)| post.clone()).collect()
    }

    /// Highest scoring `limit` posts
    pub fn top_posts<P: Rankable + Clone>(
        &self,
        posts: &[P],
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<P> {
        let mut ranked = self.sort_by_score(posts, now);
        ranked.truncate(limit);
        ranked
    }
}

/// Sort with the default configuration
pub fn sort_by_score<P: Rankable + Clone>(posts: &[P], now: DateTime<Utc>) -> Vec<P> {
    FeedScorer::default().sort_by_score(posts, now)
}

/// Top posts with the default configuration
pub fn top_posts<P: Rankable + Clone>(posts: &[P], limit: usize, now: DateTime<Utc>) -> Vec<P> {
    FeedScorer::default().top_posts(posts, limit, now)
}

fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PostSnapshot;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_post_outranks_stale_post() {
        let stale = PostSnapshot::new(10, 5, None, now() - Duration::hours(48));
        let fresh = PostSnapshot::new(10, 5, None, now() - Duration::hours(1));

        let ranked = sort_by_score(&[stale.clone(), fresh.clone()], now());
        assert_eq!(ranked, vec![fresh, stale]);
    }

    #[test]
    fn test_flagged_post_sinks() {
        let clean = PostSnapshot::new(5, 0, Some(0), now());
        let flagged = PostSnapshot::new(50, 0, Some(20), now());
        let quiet = PostSnapshot::new(0, 0, None, now());

        let ranked = sort_by_score(&[flagged.clone(), quiet.clone(), clean.clone()], now());
        assert_eq!(ranked, vec![clean, quiet, flagged]);
    }

    #[test]
    fn test_input_left_untouched() {
        let posts = vec![
            PostSnapshot::new(0, 0, None, now()),
            PostSnapshot::new(9, 9, None, now()),
        ];
        let before = posts.clone();

        let ranked = sort_by_score(&posts, now());
        assert_eq!(posts, before);
        assert_eq!(ranked[0], before[1]);
    }

    #[test]
    fn test_top_posts_truncates() {
        let posts: Vec<PostSnapshot> = (0..10)
            .map(|likes| PostSnapshot::new(likes, 0, None, now()))
            .collect();

        let top = top_posts(&posts, 3, now());
        let likes: Vec<u64> = top.iter().map(|p| p.likes_count).collect();
        assert_eq!(likes, vec![9, 8, 7]);

        assert_eq!(top_posts(&posts, 50, now()).len(), 10);
        assert!(top_posts(&posts, 0, now()).is_empty());
    }

    #[test]
    fn test_nan_scores_rank_last() {
        // Far-future post: negative base for a fractional power
        let broken = PostSnapshot::new(1, 0, None, now() + Duration::hours(10));
        let negative = PostSnapshot::new(0, 0, Some(3), now());

        let ranked = sort_by_score(&[broken.clone(), negative.clone()], now());
        assert_eq!(ranked, vec![negative, broken]);
    }

    #[test]
    fn test_ranks_references() {
        let posts = vec![
            PostSnapshot::new(1, 0, None, now()),
            PostSnapshot::new(2, 0, None, now()),
        ];
        let refs: Vec<&PostSnapshot> = posts.iter().collect();
        let ranked = sort_by_score(&refs, now());
        assert_eq!(ranked[0].likes_count, 2);
    }
}
