//! Actor front end for async callers
//!
//! A single tokio task owns the [`Ledger`] and serves requests from its
//! mailbox one at a time. [`LedgerHandle`] is the cloneable sender side.
//!
//! ```text
//!   LedgerHandle (Clone) ──┐
//!   LedgerHandle (Clone) ──┼── mpsc (bounded) ──▶ LedgerActor ──▶ Ledger
//!   LedgerHandle (Clone) ──┘        ◀── oneshot reply ──┘
//! ```

use crate::{
    config::ActorConfig,
    ledger::Ledger,
    purchase::{PaymentCurrency, PurchaseRecord},
    store::LedgerStore,
    types::{
        Account, AccountId, Direction, DonationRecord, NewAccount, PostId, ProfileUpdate,
        TokenTransfer,
    },
    Error, Result,
};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Get or create an account
    OpenAccount {
        new: NewAccount,
        response: oneshot::Sender<Result<Account>>,
    },

    /// Get account
    GetAccount {
        id: AccountId,
        response: oneshot::Sender<Result<Account>>,
    },

    /// Change profile fields
    UpdateProfile {
        id: AccountId,
        update: ProfileUpdate,
        response: oneshot::Sender<Result<Account>>,
    },

    /// Adjust a balance
    AdjustBalance {
        id: AccountId,
        delta: Decimal,
        response: oneshot::Sender<Result<Account>>,
    },

    /// Balance donation
    CreateDonation {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        post_id: PostId,
        response: oneshot::Sender<Result<DonationRecord>>,
    },

    /// On-chain donation
    RecordTokenDonation {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        post_id: PostId,
        transfer: TokenTransfer,
        response: oneshot::Sender<Result<DonationRecord>>,
    },

    /// Coin purchase
    RecordPurchase {
        account: AccountId,
        coins: Decimal,
        payment_amount: Decimal,
        payment_currency: PaymentCurrency,
        tx_hash: Option<String>,
        response: oneshot::Sender<Result<PurchaseRecord>>,
    },

    /// Donation history
    DonationsForAccount {
        account: AccountId,
        direction: Direction,
        response: oneshot::Sender<Result<Vec<DonationRecord>>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
pub struct LedgerActor<S: LedgerStore> {
    ledger: Ledger<S>,
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl<S: LedgerStore> std::fmt::Debug for LedgerActor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerActor")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl<S: LedgerStore> LedgerActor<S> {
    /// Create new actor
    pub fn new(ledger: Ledger<S>, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        Self { ledger, mailbox }
    }

    /// Run until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if let LedgerMessage::Shutdown = msg {
                break;
            }
            self.handle_message(msg);
        }

        tracing::info!("Ledger actor stopped");
    }

    /// Handle a single message
    ///
    /// A dropped reply channel means the caller went away; the operation
    /// itself has already completed.
    fn handle_message(&self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::OpenAccount { new, response } => {
                let _ = response.send(self.ledger.open_account(new));
            }

            LedgerMessage::GetAccount { id, response } => {
                let _ = response.send(self.ledger.get_account(&id));
            }

            LedgerMessage::UpdateProfile { id, update, response } => {
                let _ = response.send(self.ledger.update_profile(&id, update));
            }

            LedgerMessage::AdjustBalance { id, delta, response } => {
                let _ = response.send(self.ledger.adjust_balance(&id, delta));
            }

            LedgerMessage::CreateDonation {
                from,
                to,
                amount,
                post_id,
                response,
            } => {
                let _ = response.send(self.ledger.create_donation(&from, &to, amount, &post_id));
            }

            LedgerMessage::RecordTokenDonation {
                from,
                to,
                amount,
                post_id,
                transfer,
                response,
            } => {
                let result = self
                    .ledger
                    .record_token_donation(&from, &to, amount, &post_id, transfer);
                let _ = response.send(result);
            }

            LedgerMessage::RecordPurchase {
                account,
                coins,
                payment_amount,
                payment_currency,
                tx_hash,
                response,
            } => {
                let result = self.ledger.record_purchase(
                    &account,
                    coins,
                    payment_amount,
                    payment_currency,
                    tx_hash,
                );
                let _ = response.send(result);
            }

            LedgerMessage::DonationsForAccount {
                account,
                direction,
                response,
            } => {
                let _ = response.send(self.ledger.donations_for_account(&account, direction));
            }

            LedgerMessage::Shutdown => {
                // Handled in run loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Get or create an account
    pub async fn open_account(&self, new: NewAccount) -> Result<Account> {
        self.request(|response| LedgerMessage::OpenAccount { new, response })
            .await
    }

    /// Get account
    pub async fn get_account(&self, id: AccountId) -> Result<Account> {
        self.request(|response| LedgerMessage::GetAccount { id, response })
            .await
    }

    /// Change profile fields
    pub async fn update_profile(&self, id: AccountId, update: ProfileUpdate) -> Result<Account> {
        self.request(|response| LedgerMessage::UpdateProfile { id, update, response })
            .await
    }

    /// Adjust a balance
    pub async fn adjust_balance(&self, id: AccountId, delta: Decimal) -> Result<Account> {
        self.request(|response| LedgerMessage::AdjustBalance {
            id,
            delta,
            response,
        })
        .await
    }

    /// Balance donation
    pub async fn create_donation(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        post_id: PostId,
    ) -> Result<DonationRecord> {
        self.request(|response| LedgerMessage::CreateDonation {
            from,
            to,
            amount,
            post_id,
            response,
        })
        .await
    }

    /// On-chain donation
    pub async fn record_token_donation(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        post_id: PostId,
        transfer: TokenTransfer,
    ) -> Result<DonationRecord> {
        self.request(|response| LedgerMessage::RecordTokenDonation {
            from,
            to,
            amount,
            post_id,
            transfer,
            response,
        })
        .await
    }

    /// Coin purchase
    pub async fn record_purchase(
        &self,
        account: AccountId,
        coins: Decimal,
        payment_amount: Decimal,
        payment_currency: PaymentCurrency,
        tx_hash: Option<String>,
    ) -> Result<PurchaseRecord> {
        self.request(|response| LedgerMessage::RecordPurchase {
            account,
            coins,
            payment_amount,
            payment_currency,
            tx_hash,
            response,
        })
        .await
    }

    /// Donation history
    pub async fn donations_for_account(
        &self,
        account: AccountId,
        direction: Direction,
    ) -> Result<Vec<DonationRecord>> {
        self.request(|response| LedgerMessage::DonationsForAccount {
            account,
            direction,
            response,
        })
        .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
///
/// `config.mailbox_capacity` bounds queued requests; senders wait when it is
/// full. A zero capacity is rejected.
pub fn spawn_ledger_actor<S>(ledger: Ledger<S>, config: &ActorConfig) -> Result<LedgerHandle>
where
    S: LedgerStore + 'static,
{
    if config.mailbox_capacity == 0 {
        return Err(Error::Config("mailbox_capacity must be positive".to_string()));
    }

    let (tx, rx) = mpsc::channel(config.mailbox_capacity);
    let actor = LedgerActor::new(ledger, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    tracing::info!(mailbox_capacity = config.mailbox_capacity, "Ledger actor started");
    Ok(LedgerHandle::new(tx))
}
