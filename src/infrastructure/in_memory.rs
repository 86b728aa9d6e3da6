use crate::domain::account::{Account, Instrument};
use crate::domain::ports::{
    CardChargeRequest, CardClient, DebitParams, FinalizeParams, LedgerClient, SimulateParams,
};
use crate::domain::transaction::{CardCharge, LedgerTransaction};
use crate::error::{Result, SplitTenderError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    /// customer_ref -> account
    accounts: HashMap<String, Account>,
    /// instrument_id -> instrument
    instruments: HashMap<String, Instrument>,
    /// instrument_id -> available minor units
    balances: HashMap<String, i64>,
    /// transaction_id -> record
    transactions: HashMap<String, LedgerTransaction>,
    next_id: u64,
    fail_next_finalize: Option<String>,
}

impl LedgerState {
    fn next_transaction_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// A deterministic in-memory balance ledger.
///
/// Uses `Arc<RwLock<..>>` for shared concurrent access. Intended for
/// tests and hosts that need a collaborator double: debits hold funds
/// immediately, a void returns them, and a repeated `user_supplied_id`
/// replays the recorded transaction instead of debiting twice.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account for `customer_ref` holding one instrument in
    /// `currency` funded with `balance` minor units. Calling again with
    /// the same `customer_ref` adds another instrument to the account.
    pub async fn add_account(&self, customer_ref: &str, currency: &str, balance: i64) -> Instrument {
        let mut state = self.state.write().await;
        let account_id = match state.accounts.get(customer_ref) {
            Some(account) => account.account_id.clone(),
            None => {
                let account_id = format!("acct-{}", state.accounts.len() + 1);
                state.accounts.insert(
                    customer_ref.to_string(),
                    Account {
                        account_id: account_id.clone(),
                        customer_ref: customer_ref.to_string(),
                    },
                );
                account_id
            }
        };

        let instrument_id = format!("instr-{}", state.instruments.len() + 1);
        let instrument = Instrument {
            instrument_id: instrument_id.clone(),
            account_id,
            currency: currency.to_string(),
        };
        state.instruments.insert(instrument_id.clone(), instrument.clone());
        state.balances.insert(instrument_id, balance);
        instrument
    }

    /// Makes the next capture or void call fail with a ledger error.
    pub async fn fail_next_finalize(&self, reason: &str) {
        self.state.write().await.fail_next_finalize = Some(reason.to_string());
    }

    /// Available funds on an instrument, zero if unknown.
    pub async fn balance(&self, instrument: &Instrument) -> i64 {
        self.state
            .read()
            .await
            .balances
            .get(&instrument.instrument_id)
            .copied()
            .unwrap_or_default()
    }

    /// Looks up a recorded transaction by its `user_supplied_id`.
    pub async fn find_transaction(&self, user_supplied_id: &str) -> Option<LedgerTransaction> {
        self.state
            .read()
            .await
            .transactions
            .values()
            .find(|txn| txn.user_supplied_id == user_supplied_id)
            .cloned()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn resolve_account(&self, customer_ref: &str) -> Result<Account> {
        self.state
            .read()
            .await
            .accounts
            .get(customer_ref)
            .cloned()
            .ok_or_else(|| SplitTenderError::AccountNotFound {
                customer_ref: customer_ref.to_string(),
            })
    }

    async fn resolve_account_instrument(
        &self,
        account: &Account,
        currency: &str,
    ) -> Result<Option<Instrument>> {
        Ok(self
            .state
            .read()
            .await
            .instruments
            .values()
            .find(|instrument| {
                instrument.account_id == account.account_id && instrument.currency == currency
            })
            .cloned())
    }

    async fn create_pending_debit(
        &self,
        instrument: &Instrument,
        params: DebitParams,
    ) -> Result<LedgerTransaction> {
        let mut state = self.state.write().await;

        // Native idempotency: a repeated key replays the recorded debit.
        if let Some(existing) = state
            .transactions
            .values()
            .find(|txn| txn.user_supplied_id == params.user_supplied_id)
        {
            return Ok(existing.clone());
        }

        let available = state
            .balances
            .get(&instrument.instrument_id)
            .copied()
            .ok_or_else(|| SplitTenderError::Ledger("unknown instrument".to_string()))?;
        let required = -params.value;
        if required > available {
            return Err(SplitTenderError::InsufficientFunds {
                required,
                available,
            });
        }

        state
            .balances
            .insert(instrument.instrument_id.clone(), available + params.value);
        let transaction = LedgerTransaction {
            transaction_id: state.next_transaction_id("txn"),
            value: params.value,
            currency: params.currency,
            user_supplied_id: params.user_supplied_id,
            pending: params.pending,
            metadata: params.metadata,
        };
        state
            .transactions
            .insert(transaction.transaction_id.clone(), transaction.clone());
        Ok(transaction)
    }

    async fn capture_debit(
        &self,
        _instrument: &Instrument,
        pending: &LedgerTransaction,
        params: FinalizeParams,
    ) -> Result<LedgerTransaction> {
        let mut state = self.state.write().await;
        if let Some(reason) = state.fail_next_finalize.take() {
            return Err(SplitTenderError::Ledger(reason));
        }

        let reservation = state
            .transactions
            .get(&pending.transaction_id)
            .cloned()
            .ok_or_else(|| SplitTenderError::Ledger("unknown transaction".to_string()))?;
        if !reservation.pending {
            return Err(SplitTenderError::Ledger(
                "transaction is not pending".to_string(),
            ));
        }

        // Funds were held at reservation time; capture only finalizes.
        if let Some(txn) = state.transactions.get_mut(&pending.transaction_id) {
            txn.pending = false;
        }
        let captured = LedgerTransaction {
            transaction_id: state.next_transaction_id("txn"),
            value: reservation.value,
            currency: reservation.currency,
            user_supplied_id: params.user_supplied_id,
            pending: false,
            metadata: params.metadata,
        };
        state
            .transactions
            .insert(captured.transaction_id.clone(), captured.clone());
        Ok(captured)
    }

    async fn void_debit(
        &self,
        instrument: &Instrument,
        pending: &LedgerTransaction,
        params: FinalizeParams,
    ) -> Result<LedgerTransaction> {
        let mut state = self.state.write().await;
        if let Some(reason) = state.fail_next_finalize.take() {
            return Err(SplitTenderError::Ledger(reason));
        }

        let reservation = state
            .transactions
            .get(&pending.transaction_id)
            .cloned()
            .ok_or_else(|| SplitTenderError::Ledger("unknown transaction".to_string()))?;
        if !reservation.pending {
            return Err(SplitTenderError::Ledger(
                "transaction is not pending".to_string(),
            ));
        }

        // Return the held funds.
        let available = state
            .balances
            .get(&instrument.instrument_id)
            .copied()
            .unwrap_or_default();
        state
            .balances
            .insert(instrument.instrument_id.clone(), available - reservation.value);
        if let Some(txn) = state.transactions.get_mut(&pending.transaction_id) {
            txn.pending = false;
        }
        let voided = LedgerTransaction {
            transaction_id: state.next_transaction_id("txn"),
            value: reservation.value,
            currency: reservation.currency,
            user_supplied_id: params.user_supplied_id,
            pending: false,
            metadata: params.metadata,
        };
        state
            .transactions
            .insert(voided.transaction_id.clone(), voided.clone());
        Ok(voided)
    }

    async fn simulate_debit(
        &self,
        instrument: &Instrument,
        params: SimulateParams,
    ) -> Result<LedgerTransaction> {
        let mut state = self.state.write().await;
        let available = state
            .balances
            .get(&instrument.instrument_id)
            .copied()
            .ok_or_else(|| SplitTenderError::Ledger("unknown instrument".to_string()))?;
        let required = -params.value;

        let value = if required > available {
            if params.nsf_check {
                return Err(SplitTenderError::InsufficientFunds {
                    required,
                    available,
                });
            }
            // The most the instrument can pay.
            -available
        } else {
            params.value
        };

        // Dry run: the transaction is returned but never recorded.
        Ok(LedgerTransaction {
            transaction_id: state.next_transaction_id("sim"),
            value,
            currency: params.currency,
            user_supplied_id: params.user_supplied_id,
            pending: false,
            metadata: params.metadata,
        })
    }
}

#[derive(Default)]
struct CardState {
    /// idempotency key -> recorded charge
    charges: HashMap<String, CardCharge>,
    next_id: u64,
    decline_next: Option<String>,
}

/// A deterministic in-memory card processor.
///
/// Honors idempotency keys the way the real gateway does: a repeated key
/// returns the recorded charge unchanged. `decline_next` injects a
/// one-shot failure for compensation tests.
#[derive(Default, Clone)]
pub struct InMemoryCardProcessor {
    state: Arc<RwLock<CardState>>,
}

impl InMemoryCardProcessor {
    /// Creates a new, empty in-memory card processor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next charge call fail with `reason`.
    pub async fn decline_next(&self, reason: &str) {
        self.state.write().await.decline_next = Some(reason.to_string());
    }

    /// Number of charges actually created.
    pub async fn charge_count(&self) -> usize {
        self.state.read().await.charges.len()
    }

    /// Looks up the charge recorded for an idempotency key.
    pub async fn find_charge(&self, idempotency_key: &str) -> Option<CardCharge> {
        self.state.read().await.charges.get(idempotency_key).cloned()
    }
}

#[async_trait]
impl CardClient for InMemoryCardProcessor {
    async fn charge(
        &self,
        request: CardChargeRequest,
        idempotency_key: &str,
    ) -> Result<CardCharge> {
        let mut state = self.state.write().await;
        if let Some(reason) = state.decline_next.take() {
            return Err(SplitTenderError::CardProcessor(reason));
        }
        if let Some(existing) = state.charges.get(idempotency_key) {
            return Ok(existing.clone());
        }
        if request.payment_source.is_none() {
            return Err(SplitTenderError::CardProcessor(
                "no payment source or customer provided".to_string(),
            ));
        }

        state.next_id += 1;
        let charge = CardCharge {
            charge_id: format!("ch_{}", state.next_id),
            amount: request.amount,
            currency: request.currency,
            metadata: request.metadata,
        };
        state
            .charges
            .insert(idempotency_key.to_string(), charge.clone());
        Ok(charge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metadata::Metadata;

    fn debit(value: i64, pending: bool, user_supplied_id: &str) -> DebitParams {
        DebitParams {
            value,
            currency: "USD".to_string(),
            pending,
            user_supplied_id: user_supplied_id.to_string(),
            metadata: Metadata::new(),
        }
    }

    fn finalize(user_supplied_id: &str) -> FinalizeParams {
        FinalizeParams {
            user_supplied_id: user_supplied_id.to_string(),
            metadata: Metadata::new(),
        }
    }

    #[tokio::test]
    async fn test_pending_debit_holds_funds() {
        let ledger = InMemoryLedger::new();
        let instrument = ledger.add_account("shopper-1", "USD", 1000).await;

        let txn = ledger
            .create_pending_debit(&instrument, debit(-450, true, "order-1"))
            .await
            .unwrap();
        assert_eq!(txn.value, -450);
        assert!(txn.pending);
        assert_eq!(ledger.balance(&instrument).await, 550);
    }

    #[tokio::test]
    async fn test_void_returns_held_funds() {
        let ledger = InMemoryLedger::new();
        let instrument = ledger.add_account("shopper-1", "USD", 1000).await;

        let txn = ledger
            .create_pending_debit(&instrument, debit(-450, true, "order-1"))
            .await
            .unwrap();
        ledger
            .void_debit(&instrument, &txn, finalize("order-1-void"))
            .await
            .unwrap();
        assert_eq!(ledger.balance(&instrument).await, 1000);
    }

    #[tokio::test]
    async fn test_capture_keeps_funds_and_finalizes() {
        let ledger = InMemoryLedger::new();
        let instrument = ledger.add_account("shopper-1", "USD", 1000).await;

        let txn = ledger
            .create_pending_debit(&instrument, debit(-450, true, "order-1"))
            .await
            .unwrap();
        let captured = ledger
            .capture_debit(&instrument, &txn, finalize("order-1-capture"))
            .await
            .unwrap();
        assert!(!captured.pending);
        assert_eq!(captured.value, -450);
        assert_eq!(ledger.balance(&instrument).await, 550);

        // A second capture of the same reservation must fail.
        let err = ledger
            .capture_debit(&instrument, &txn, finalize("order-1-capture-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, SplitTenderError::Ledger(_)));
    }

    #[tokio::test]
    async fn test_debit_over_balance_rejected() {
        let ledger = InMemoryLedger::new();
        let instrument = ledger.add_account("shopper-1", "USD", 100).await;

        let err = ledger
            .create_pending_debit(&instrument, debit(-450, true, "order-1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SplitTenderError::InsufficientFunds {
                required: 450,
                available: 100
            }
        ));
        assert_eq!(ledger.balance(&instrument).await, 100);
    }

    #[tokio::test]
    async fn test_repeated_user_supplied_id_replays_debit() {
        let ledger = InMemoryLedger::new();
        let instrument = ledger.add_account("shopper-1", "USD", 1000).await;

        let first = ledger
            .create_pending_debit(&instrument, debit(-450, true, "order-1"))
            .await
            .unwrap();
        let second = ledger
            .create_pending_debit(&instrument, debit(-450, true, "order-1"))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(ledger.balance(&instrument).await, 550);
    }

    #[tokio::test]
    async fn test_simulate_clamps_to_available_without_nsf_check() {
        let ledger = InMemoryLedger::new();
        let instrument = ledger.add_account("shopper-1", "USD", 300).await;

        let simulated = ledger
            .simulate_debit(
                &instrument,
                SimulateParams {
                    value: -450,
                    currency: "USD".to_string(),
                    user_supplied_id: "order-1".to_string(),
                    metadata: Metadata::new(),
                    nsf_check: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(simulated.value, -300);
        // Nothing moved and nothing was recorded.
        assert_eq!(ledger.balance(&instrument).await, 300);
        assert!(ledger.find_transaction("order-1").await.is_none());
    }

    #[tokio::test]
    async fn test_simulate_with_nsf_check_rejects() {
        let ledger = InMemoryLedger::new();
        let instrument = ledger.add_account("shopper-1", "USD", 300).await;

        let err = ledger
            .simulate_debit(
                &instrument,
                SimulateParams {
                    value: -450,
                    currency: "USD".to_string(),
                    user_supplied_id: "order-1".to_string(),
                    metadata: Metadata::new(),
                    nsf_check: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SplitTenderError::InsufficientFunds { .. }));
    }

    #[tokio::test]
    async fn test_card_charge_replays_on_same_idempotency_key() {
        let card = InMemoryCardProcessor::new();
        let request = CardChargeRequest {
            amount: 550,
            currency: "USD".to_string(),
            payment_source: Some(crate::domain::ports::CardPaymentSource::Source(
                "tok_visa".to_string(),
            )),
            metadata: Metadata::new(),
        };

        let first = card.charge(request.clone(), "order-1").await.unwrap();
        let second = card.charge(request, "order-1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(card.charge_count().await, 1);
    }

    #[tokio::test]
    async fn test_card_decline_is_one_shot() {
        let card = InMemoryCardProcessor::new();
        card.decline_next("card declined").await;

        let request = CardChargeRequest {
            amount: 550,
            currency: "USD".to_string(),
            payment_source: Some(crate::domain::ports::CardPaymentSource::Source(
                "tok_visa".to_string(),
            )),
            metadata: Metadata::new(),
        };

        let err = card.charge(request.clone(), "order-1").await.unwrap_err();
        assert!(matches!(err, SplitTenderError::CardProcessor(_)));
        assert!(card.charge(request, "order-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_card_charge_without_payment_source_rejected() {
        let card = InMemoryCardProcessor::new();
        let request = CardChargeRequest {
            amount: 550,
            currency: "USD".to_string(),
            payment_source: None,
            metadata: Metadata::new(),
        };

        let err = card.charge(request, "order-1").await.unwrap_err();
        assert!(matches!(err, SplitTenderError::CardProcessor(_)));
    }
}
