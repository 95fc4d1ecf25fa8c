//! Coin purchases
//!
//! A purchase credits coins bought off-ledger (ETH or USDC paid on-chain) to
//! an account. The credit and its record are committed together.

use crate::{
    ledger::{checked_sum, Ledger},
    lock::LockKey,
    store::{LedgerStore, WriteSet},
    types::AccountId,
    Error, Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Currency paid for coins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentCurrency {
    /// Ether
    Eth,
    /// USD Coin
    Usdc,
}

/// Purchase lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Payment submitted
    Pending,
    /// Coins credited
    Completed,
    /// Payment failed
    Failed,
}

/// Immutable record of a coin purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Purchase ID (UUIDv7)
    pub id: Uuid,
    /// Credited account
    pub account: AccountId,
    /// Coins credited
    pub coins: Decimal,
    /// Amount paid
    pub payment_amount: Decimal,
    /// Currency paid in
    pub payment_currency: PaymentCurrency,
    /// Payment transaction hash
    pub tx_hash: Option<String>,
    /// Status
    pub status: PurchaseStatus,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Purchasable bundle of coins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinPackage {
    /// Coins in the bundle
    pub coins: u32,
    /// Price in ETH
    pub price_eth: Decimal,
    /// Price in USDC
    pub price_usdc: Decimal,
    /// Highlighted as most popular
    pub popular: bool,
    /// Highlighted as best value
    pub best_value: bool,
}

impl CoinPackage {
    /// Price in the given currency
    pub fn price(&self, currency: PaymentCurrency) -> Decimal {
        match currency {
            PaymentCurrency::Eth => self.price_eth,
            PaymentCurrency::Usdc => self.price_usdc,
        }
    }
}

/// Fixed package catalog, smallest first
pub fn coin_packages() -> Vec<CoinPackage> {
    let package = |coins, price_eth, price_usdc| CoinPackage {
        coins,
        price_eth,
        price_usdc,
        popular: false,
        best_value: false,
    };

    vec![
        package(100, Decimal::new(1, 3), Decimal::from(3)),
        CoinPackage {
            popular: true,
            ..package(250, Decimal::new(24, 4), Decimal::from(7))
        },
        package(500, Decimal::new(45, 4), Decimal::from(13)),
        CoinPackage {
            best_value: true,
            ..package(1000, Decimal::new(8, 3), Decimal::from(24))
        },
        package(2500, Decimal::new(19, 3), Decimal::from(55)),
        package(5000, Decimal::new(35, 3), Decimal::from(100)),
    ]
}

impl<S: LedgerStore> Ledger<S> {
    /// Credit purchased coins to `account`
    pub fn record_purchase(
        &self,
        account: &AccountId,
        coins: Decimal,
        payment_amount: Decimal,
        payment_currency: PaymentCurrency,
        tx_hash: Option<String>,
    ) -> Result<PurchaseRecord> {
        let result = self.execute_purchase(account, coins, payment_amount, payment_currency, tx_hash);

        if let Ok(record) = &result {
            tracing::info!(
                purchase_id = %record.id,
                account = %record.account,
                coins = %record.coins,
                payment_amount = %record.payment_amount,
                currency = ?record.payment_currency,
                "Purchase committed"
            );
            if let Some(metrics) = self.metrics() {
                metrics.record_purchase();
            }
        }

        self.observe("record_purchase", result)
    }

    fn execute_purchase(
        &self,
        account: &AccountId,
        coins: Decimal,
        payment_amount: Decimal,
        payment_currency: PaymentCurrency,
        tx_hash: Option<String>,
    ) -> Result<PurchaseRecord> {
        if coins <= Decimal::ZERO {
            return Err(Error::InvalidPurchase(format!("coins must be positive, got {}", coins)));
        }
        if payment_amount <= Decimal::ZERO {
            return Err(Error::InvalidPurchase(format!(
                "payment amount must be positive, got {}",
                payment_amount
            )));
        }

        self.locks()
            .with_locks([LockKey::from(account)], || -> Result<PurchaseRecord> {
                let mut holder = self
                    .store()
                    .get_account(account)?
                    .ok_or_else(|| Error::AccountNotFound(account.clone()))?;

                let now = Utc::now();
                holder.apply_delta(coins, now)?;

                let record = PurchaseRecord {
                    id: Uuid::now_v7(),
                    account: account.clone(),
                    coins,
                    payment_amount,
                    payment_currency,
                    tx_hash,
                    status: PurchaseStatus::Completed,
                    created_at: now,
                };

                self.commit(WriteSet::new().account(holder).purchase(record.clone()))?;
                Ok(record)
            })
    }

    /// Purchases made by `account`, newest first
    pub fn purchases_for_account(&self, account: &AccountId) -> Result<Vec<PurchaseRecord>> {
        let mut purchases: Vec<PurchaseRecord> = self
            .store()
            .list_purchases()?
            .into_iter()
            .filter(|p| &p.account == account)
            .collect();

        purchases.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(purchases)
    }

    /// Coins from completed purchases by `account`
    pub fn total_purchased(&self, account: &AccountId) -> Result<Decimal> {
        checked_sum(
            self.purchases_for_account(account)?
                .iter()
                .filter(|p| p.status == PurchaseStatus::Completed)
                .map(|p| p.coins),
            "purchase total",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory::MemoryStore, types::NewAccount, Config};
    use std::sync::Arc;

    fn ledger_with(id: &str) -> Ledger<MemoryStore> {
        let ledger = Ledger::new(Arc::new(MemoryStore::new()), &Config::default()).unwrap();
        ledger
            .open_account(NewAccount {
                id: AccountId::new(id),
                username: id.to_string(),
                display_name: id.to_string(),
                profile_image: None,
            })
            .unwrap();
        ledger
    }

    #[test]
    fn test_catalog() {
        let packages = coin_packages();
        let coins: Vec<u32> = packages.iter().map(|p| p.coins).collect();
        assert_eq!(coins, vec![100, 250, 500, 1000, 2500, 5000]);
        assert!(packages[1].popular);
        assert!(packages[3].best_value);
        assert_eq!(packages[1].price(PaymentCurrency::Eth).to_string(), "0.0024");
        assert_eq!(packages[5].price(PaymentCurrency::Usdc), Decimal::from(100));
    }

    #[test]
    fn test_record_purchase_credits_balance() {
        let ledger = ledger_with("alice");
        let alice = AccountId::new("alice");

        let record = ledger
            .record_purchase(
                &alice,
                Decimal::from(250),
                Decimal::new(24, 4),
                PaymentCurrency::Eth,
                Some("0xfeed".to_string()),
            )
            .unwrap();

        assert_eq!(record.status, PurchaseStatus::Completed);
        assert_eq!(ledger.balance(&alice).unwrap(), Decimal::from(350));
        assert_eq!(ledger.total_purchased(&alice).unwrap(), Decimal::from(250));
        assert_eq!(ledger.purchases_for_account(&alice).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_purchase_leaves_balance() {
        let ledger = ledger_with("alice");
        let alice = AccountId::new("alice");

        let err = ledger
            .record_purchase(&alice, Decimal::ZERO, Decimal::ONE, PaymentCurrency::Usdc, None)
            .unwrap_err();
        assert_eq!(err.reason_code(), "invalid_purchase");

        let err = ledger
            .record_purchase(&AccountId::new("ghost"), Decimal::ONE, Decimal::ONE, PaymentCurrency::Usdc, None)
            .unwrap_err();
        assert_eq!(err.reason_code(), "account_not_found");

        assert_eq!(ledger.balance(&alice).unwrap(), Decimal::from(100));
        assert!(ledger.purchases_for_account(&alice).unwrap().is_empty());
    }

    #[test]
    fn test_currency_serializes_uppercase() {
        assert_eq!(serde_json::to_value(PaymentCurrency::Usdc).unwrap(), "USDC");
    }
}
