use crate::domain::account::{Account, Instrument};
use crate::domain::metadata::Metadata;
use crate::domain::transaction::{CardCharge, LedgerTransaction};
use crate::error::Result;
use async_trait::async_trait;

/// Parameters for creating a (possibly pending) debit on an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct DebitParams {
    /// Negative of the ledger share.
    pub value: i64,
    pub currency: String,
    /// True when a card charge must still succeed before the debit is final.
    pub pending: bool,
    pub user_supplied_id: String,
    pub metadata: Metadata,
}

/// Parameters for capturing or voiding a pending debit.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeParams {
    pub user_supplied_id: String,
    pub metadata: Metadata,
}

/// Parameters for a non-committing dry-run debit.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulateParams {
    pub value: i64,
    pub currency: String,
    pub user_supplied_id: String,
    pub metadata: Metadata,
    /// When set, insufficient funds fail the simulation instead of
    /// returning the maximum payable transaction.
    pub nsf_check: bool,
}

/// How the card processor identifies what to charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardPaymentSource {
    /// One-off payment token.
    Source(String),
    /// Stored payment method keyed by the processor's customer reference.
    Customer(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardChargeRequest {
    pub amount: i64,
    pub currency: String,
    pub payment_source: Option<CardPaymentSource>,
    pub metadata: Metadata,
}

/// Balance ledger collaborator: account/instrument lookup plus the
/// pending-debit lifecycle. Implementations hold no state visible to the
/// orchestrator.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn resolve_account(&self, customer_ref: &str) -> Result<Account>;

    async fn resolve_account_instrument(
        &self,
        account: &Account,
        currency: &str,
    ) -> Result<Option<Instrument>>;

    async fn create_pending_debit(
        &self,
        instrument: &Instrument,
        params: DebitParams,
    ) -> Result<LedgerTransaction>;

    async fn capture_debit(
        &self,
        instrument: &Instrument,
        pending: &LedgerTransaction,
        params: FinalizeParams,
    ) -> Result<LedgerTransaction>;

    async fn void_debit(
        &self,
        instrument: &Instrument,
        pending: &LedgerTransaction,
        params: FinalizeParams,
    ) -> Result<LedgerTransaction>;

    async fn simulate_debit(
        &self,
        instrument: &Instrument,
        params: SimulateParams,
    ) -> Result<LedgerTransaction>;
}

/// Card processor collaborator. The idempotency key is the processor's
/// native dedup mechanism: a retried charge with the same key must not
/// charge the card twice.
#[async_trait]
pub trait CardClient: Send + Sync {
    async fn charge(&self, request: CardChargeRequest, idempotency_key: &str)
    -> Result<CardCharge>;
}

pub type LedgerClientBox = Box<dyn LedgerClient>;
pub type CardClientBox = Box<dyn CardClient>;
