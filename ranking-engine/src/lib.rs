//! Feed ranking engine
//!
//! Orders posts by time-decayed, quality-adjusted engagement:
//!
//! ```text
//! score = (likes + comments × comment_weight − flags × flag_weight)
//!         / (age_hours + grace_period_hours) ^ decay_exponent
//! ```
//!
//! The engine is a pure function of its inputs and the supplied `now`.
//! It performs no I/O and holds no shared state, so it may be called
//! concurrently from any number of callers.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use ranking_engine::{FeedScorer, PostSnapshot};
//!
//! let now = Utc::now();
//! let posts = vec![
//!     PostSnapshot::new(10, 5, None, now - Duration::hours(48)),
//!     PostSnapshot::new(10, 5, None, now - Duration::hours(1)),
//! ];
//!
//! let scorer = FeedScorer::default();
//! let ranked = scorer.sort_by_score(&posts, now);
//! assert_eq!(ranked[0].created_at, now - Duration::hours(1));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod ranking;
pub mod scoring;
pub mod types;

pub use config::ScoringConfig;
pub use error::{Error, Result};
pub use scoring::FeedScorer;
pub use types::{PostSnapshot, Rankable, ScoreBreakdown};
