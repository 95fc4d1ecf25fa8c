//! Metrics collection for observability
//!
//! Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_donations_total` - Committed balance donations
//! - `ledger_token_donations_total` - Recorded on-chain donations
//! - `ledger_donated_coins_total` - Coins moved by balance donations
//! - `ledger_purchases_total` - Committed coin purchases
//! - `ledger_rejections_total{reason}` - Rejected operations by reason
//! - `ledger_commit_duration_seconds` - Store commit latency

use crate::Error;
use prometheus::{
    Counter, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use std::sync::Arc;

/// Metrics collector
///
/// Owns its registry, so several ledgers can live in one process.
#[derive(Clone)]
pub struct Metrics {
    /// Committed balance donations
    pub donations_total: IntCounter,

    /// Recorded on-chain donations
    pub token_donations_total: IntCounter,

    /// Coins moved by balance donations
    pub donated_coins: Counter,

    /// Committed coin purchases
    pub purchases_total: IntCounter,

    /// Rejections by reason code
    pub rejections_total: IntCounterVec,

    /// Commit duration histogram
    pub commit_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let donations_total =
            IntCounter::new("ledger_donations_total", "Committed balance donations")?;
        registry.register(Box::new(donations_total.clone()))?;

        let token_donations_total =
            IntCounter::new("ledger_token_donations_total", "Recorded on-chain donations")?;
        registry.register(Box::new(token_donations_total.clone()))?;

        let donated_coins =
            Counter::new("ledger_donated_coins_total", "Coins moved by balance donations")?;
        registry.register(Box::new(donated_coins.clone()))?;

        let purchases_total = IntCounter::new("ledger_purchases_total", "Committed coin purchases")?;
        registry.register(Box::new(purchases_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("ledger_rejections_total", "Rejected operations by reason"),
            &["reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new("ledger_commit_duration_seconds", "Store commit latency")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        Ok(Self {
            donations_total,
            token_donations_total,
            donated_coins,
            purchases_total,
            rejections_total,
            commit_duration,
            registry,
        })
    }

    /// Record committed balance donation
    pub fn record_donation(&self, amount: Decimal) {
        self.donations_total.inc();
        self.donated_coins.inc_by(amount.to_f64().unwrap_or(0.0));
    }

    /// Record on-chain donation
    pub fn record_token_donation(&self) {
        self.token_donations_total.inc();
    }

    /// Record committed purchase
    pub fn record_purchase(&self) {
        self.purchases_total.inc();
    }

    /// Record rejected operation
    pub fn record_rejection(&self, error: &Error) {
        self.rejections_total
            .with_label_values(&[error.reason_code()])
            .inc();
    }

    /// Record commit duration
    pub fn record_commit_duration(&self, duration_seconds: f64) {
        self.commit_duration.observe(duration_seconds);
    }

    /// Rejections recorded for `reason`
    pub fn rejections(&self, reason: &str) -> u64 {
        self.rejections_total.with_label_values(&[reason]).get()
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render in the Prometheus text exposition format
    pub fn render(&self) -> crate::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("donations_total", &self.donations_total.get())
            .field("purchases_total", &self.purchases_total.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountId;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.donations_total.get(), 0);
        assert_eq!(metrics.purchases_total.get(), 0);

        // Private registries never collide
        assert!(Metrics::new().is_ok());
    }

    #[test]
    fn test_record_donation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_donation(Decimal::new(255, 1));
        metrics.record_donation(Decimal::from(10));

        assert_eq!(metrics.donations_total.get(), 2);
        assert!((metrics.donated_coins.get() - 35.5).abs() < 1e-9);
    }

    #[test]
    fn test_record_rejection_by_reason() {
        let metrics = Metrics::new().unwrap();
        metrics.record_rejection(&Error::SelfDonation(AccountId::new("alice")));
        metrics.record_rejection(&Error::SelfDonation(AccountId::new("bob")));
        metrics.record_rejection(&Error::InvalidAmount(Decimal::ZERO));

        assert_eq!(metrics.rejections("self_donation"), 2);
        assert_eq!(metrics.rejections("invalid_amount"), 1);
        assert_eq!(metrics.rejections("payer_not_found"), 0);
    }

    #[test]
    fn test_render() {
        let metrics = Metrics::new().unwrap();
        metrics.record_purchase();
        metrics.record_commit_duration(0.002);

        let text = metrics.render().unwrap();
        assert!(text.contains("ledger_purchases_total 1"));
        assert!(text.contains("ledger_commit_duration_seconds_bucket"));
    }
}
