//! Scoring configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tunables for the feed score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of a comment relative to a like
    pub comment_weight: f64,

    /// Penalty per user flag
    pub flag_weight: f64,

    /// Time decay exponent (1.0 = linear, 1.5 = moderate, 2.0 = aggressive)
    pub decay_exponent: f64,

    /// Hours added to the post age before decay is applied
    pub grace_period_hours: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            comment_weight: 2.0,
            flag_weight: 5.0,
            decay_exponent: 1.5,
            grace_period_hours: 2.0,
        }
    }
}

impl ScoringConfig {
    /// Check that every tunable is usable
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("comment_weight", self.comment_weight),
            ("flag_weight", self.flag_weight),
            ("decay_exponent", self.decay_exponent),
            ("grace_period_hours", self.grace_period_hours),
        ];

        for (name, value) in fields {
            if !value.is_finite() {
                return Err(Error::InvalidConfig(format!("{} must be finite", name)));
            }
            if value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }

        if self.decay_exponent == 0.0 {
            return Err(Error::InvalidConfig(
                "decay_exponent must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
