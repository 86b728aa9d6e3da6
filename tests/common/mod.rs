use split_tender::application::orchestrator::SplitTenderEngine;
use split_tender::domain::account::Instrument;
use split_tender::domain::request::SplitTenderRequest;
use split_tender::infrastructure::in_memory::{InMemoryCardProcessor, InMemoryLedger};
use uuid::Uuid;

pub const SHOPPER: &str = "shopper-1";
pub const CURRENCY: &str = "USD";

/// Engine wired to fresh in-memory collaborators, with one USD instrument
/// funded for `SHOPPER`. The doubles are returned alongside so tests can
/// inspect backend state after the orchestration.
#[allow(dead_code)]
pub async fn engine_with_funds(
    balance: i64,
) -> (
    SplitTenderEngine,
    InMemoryLedger,
    InMemoryCardProcessor,
    Instrument,
) {
    let ledger = InMemoryLedger::new();
    let instrument = ledger.add_account(SHOPPER, CURRENCY, balance).await;
    let card = InMemoryCardProcessor::new();
    let engine = SplitTenderEngine::new(Box::new(ledger.clone()), Box::new(card.clone()));
    (engine, ledger, card, instrument)
}

#[allow(dead_code)]
pub fn charge_request(amount: i64) -> SplitTenderRequest {
    SplitTenderRequest {
        user_supplied_id: Uuid::new_v4().to_string(),
        currency: CURRENCY.to_string(),
        amount,
        customer_ref: Some(SHOPPER.to_string()),
        card_payment_source: Some("tok_visa".to_string()),
        card_customer_ref: None,
        metadata: None,
        nsf_check: None,
    }
}
