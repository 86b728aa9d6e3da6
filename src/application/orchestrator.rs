use crate::domain::account::Instrument;
use crate::domain::metadata;
use crate::domain::ports::{
    CardChargeRequest, CardClientBox, CardPaymentSource, DebitParams, FinalizeParams,
    LedgerClientBox, SimulateParams,
};
use crate::domain::request::{Shares, SplitTenderRequest};
use crate::domain::transaction::{CardCharge, LedgerTransaction, SplitTenderCharge};
use crate::error::{CardOutcome, Result, SplitTenderError};
use tracing::{debug, error, warn};

/// Sequences one charge across the two backends so that the pair of
/// side-effecting calls appears atomic to the caller.
///
/// The backends share no transaction mechanism, so the engine reserves the
/// ledger share as a pending debit first, then charges the card, then
/// captures the reservation on success or voids it on failure. The engine
/// holds no shared mutable state; concurrent invocations are independent
/// and dedup across retries is delegated to the backends' idempotency
/// keys, all derived from the request's `user_supplied_id`.
pub struct SplitTenderEngine {
    ledger: LedgerClientBox,
    card: CardClientBox,
}

impl SplitTenderEngine {
    /// Creates a new engine over ready-made collaborator clients.
    pub fn new(ledger: LedgerClientBox, card: CardClientBox) -> Self {
        Self { ledger, card }
    }

    /// Charges `ledger_share` of the request's amount to the balance
    /// ledger and the remainder to the card processor.
    ///
    /// A zero card share commits the ledger debit in a single call and
    /// never contacts the card processor; a zero ledger share skips the
    /// ledger entirely. When the card charge fails after a reservation was
    /// made, the reservation is voided and the card error is re-raised.
    pub async fn create_split_tender_charge(
        &self,
        request: &SplitTenderRequest,
        ledger_share: i64,
    ) -> Result<SplitTenderCharge> {
        let shares = Shares::try_new(request, ledger_share)?;

        if shares.ledger == 0 {
            let charge = self.charge_card(request, shares.card, None).await?;
            debug!(charge_id = %charge.charge_id, "card-only charge complete");
            return Ok(SplitTenderCharge {
                ledger_transaction: None,
                card_charge: Some(charge),
            });
        }

        let instrument = self.resolve_instrument(request).await?;
        let reservation = self
            .ledger
            .create_pending_debit(
                &instrument,
                DebitParams {
                    value: -shares.ledger,
                    currency: request.currency.clone(),
                    pending: shares.card > 0,
                    user_supplied_id: request.user_supplied_id.clone(),
                    metadata: metadata::for_ledger(request.metadata.as_ref(), request.amount, None),
                },
            )
            .await?;
        debug!(
            transaction_id = %reservation.transaction_id,
            value = reservation.value,
            pending = reservation.pending,
            "ledger debit created"
        );

        if shares.card == 0 {
            // The single non-pending debit was both reservation and commit.
            return Ok(SplitTenderCharge {
                ledger_transaction: Some(reservation),
                card_charge: None,
            });
        }

        match self
            .charge_card(request, shares.card, Some(reservation.transaction_id.as_str()))
            .await
        {
            Ok(charge) => {
                let captured = self
                    .capture_reservation(request, &instrument, &reservation, &charge)
                    .await?;
                debug!(
                    transaction_id = %captured.transaction_id,
                    charge_id = %charge.charge_id,
                    "split-tender charge complete"
                );
                Ok(SplitTenderCharge {
                    ledger_transaction: Some(captured),
                    card_charge: Some(charge),
                })
            }
            Err(card_error) => {
                warn!(error = %card_error, "card charge failed, voiding ledger reservation");
                self.void_reservation(request, &instrument, &reservation, card_error)
                    .await
            }
        }
    }

    /// Ledger-side dry run: previews whether the ledger can cover its
    /// share without moving money. Never contacts the card processor.
    pub async fn simulate_split_tender_charge(
        &self,
        request: &SplitTenderRequest,
        ledger_share: i64,
    ) -> Result<SplitTenderCharge> {
        let shares = Shares::try_new(request, ledger_share)?;

        if shares.ledger == 0 {
            return Ok(SplitTenderCharge::default());
        }

        let instrument = self.resolve_instrument(request).await?;
        let simulated = self
            .ledger
            .simulate_debit(
                &instrument,
                SimulateParams {
                    value: -shares.ledger,
                    currency: request.currency.clone(),
                    user_supplied_id: request.user_supplied_id.clone(),
                    metadata: metadata::for_ledger(request.metadata.as_ref(), request.amount, None),
                    nsf_check: request.nsf_check.unwrap_or(false),
                },
            )
            .await?;
        debug!(value = simulated.value, "ledger debit simulated");

        Ok(SplitTenderCharge {
            ledger_transaction: Some(simulated),
            card_charge: None,
        })
    }

    async fn resolve_instrument(&self, request: &SplitTenderRequest) -> Result<Instrument> {
        // Validation guarantees customer_ref is set whenever this runs.
        let customer_ref = request.customer_ref.as_deref().unwrap_or_default();
        let account = self.ledger.resolve_account(customer_ref).await?;
        self.ledger
            .resolve_account_instrument(&account, &request.currency)
            .await?
            .ok_or_else(|| SplitTenderError::InstrumentNotFound {
                customer_ref: customer_ref.to_string(),
                currency: request.currency.clone(),
            })
    }

    async fn charge_card(
        &self,
        request: &SplitTenderRequest,
        amount: i64,
        ledger_transaction_id: Option<&str>,
    ) -> Result<CardCharge> {
        let charge_request = CardChargeRequest {
            amount,
            currency: request.currency.clone(),
            payment_source: card_payment_source(request),
            metadata: metadata::for_card(
                request.metadata.as_ref(),
                request.amount,
                ledger_transaction_id,
            ),
        };
        self.card
            .charge(charge_request, &request.user_supplied_id)
            .await
    }

    async fn capture_reservation(
        &self,
        request: &SplitTenderRequest,
        instrument: &Instrument,
        reservation: &LedgerTransaction,
        charge: &CardCharge,
    ) -> Result<LedgerTransaction> {
        let params = FinalizeParams {
            user_supplied_id: format!("{}-capture", request.user_supplied_id),
            metadata: metadata::for_ledger(
                request.metadata.as_ref(),
                request.amount,
                Some(charge.charge_id.as_str()),
            ),
        };
        match self.ledger.capture_debit(instrument, reservation, params).await {
            Ok(captured) => Ok(captured),
            Err(source) => {
                error!(
                    charge_id = %charge.charge_id,
                    error = %source,
                    "capture failed after successful card charge, backends disagree"
                );
                Err(SplitTenderError::Compensation {
                    card_outcome: CardOutcome::Charged {
                        charge_id: charge.charge_id.clone(),
                    },
                    source: Box::new(source),
                })
            }
        }
    }

    async fn void_reservation(
        &self,
        request: &SplitTenderRequest,
        instrument: &Instrument,
        reservation: &LedgerTransaction,
        card_error: SplitTenderError,
    ) -> Result<SplitTenderCharge> {
        let params = FinalizeParams {
            user_supplied_id: format!("{}-void", request.user_supplied_id),
            metadata: metadata::for_ledger(request.metadata.as_ref(), request.amount, None),
        };
        match self.ledger.void_debit(instrument, reservation, params).await {
            // The reservation is cleaned up; the caller still learns that
            // the overall charge failed.
            Ok(_) => Err(card_error),
            Err(source) => {
                error!(error = %source, "void failed after card failure, backends disagree");
                Err(SplitTenderError::Compensation {
                    card_outcome: CardOutcome::Failed {
                        reason: card_error.to_string(),
                    },
                    source: Box::new(source),
                })
            }
        }
    }
}

fn card_payment_source(request: &SplitTenderRequest) -> Option<CardPaymentSource> {
    if let Some(source) = &request.card_payment_source {
        Some(CardPaymentSource::Source(source.clone()))
    } else {
        request
            .card_customer_ref
            .as_ref()
            .map(|customer| CardPaymentSource::Customer(customer.clone()))
    }
}
