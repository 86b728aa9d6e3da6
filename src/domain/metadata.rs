use serde_json::{Map, Value};

/// Caller-supplied annotation map, as sent to either backend.
pub type Metadata = Map<String, Value>;

pub const TOTAL_KEY: &str = "_split_tender_total";
pub const PARTNER_KEY: &str = "_split_tender_partner";
pub const PARTNER_TRANSACTION_ID_KEY: &str = "_split_tender_partner_transaction_id";

const LEDGER_PARTNER: &str = "LEDGER";
const CARD_PARTNER: &str = "CARD";

/// Annotations recorded on the card charge. Each backend must be able to
/// find the other backend's record from its own stored metadata alone, so
/// the ledger reservation id is always present (empty when the ledger did
/// not participate).
///
/// Returns a fresh map; caller-owned input is never mutated. Caller keys
/// are preserved, system keys win on collision.
pub fn for_card(caller: Option<&Metadata>, amount: i64, ledger_transaction_id: Option<&str>) -> Metadata {
    let mut merged = base(caller, amount, LEDGER_PARTNER);
    merged.insert(
        PARTNER_TRANSACTION_ID_KEY.to_string(),
        Value::from(ledger_transaction_id.unwrap_or("")),
    );
    merged
}

/// Annotations recorded on a ledger transaction. Computed twice per
/// orchestration: at reservation time the card charge id is unknown and
/// the partner-transaction key is omitted; at capture/void time it is
/// added when a charge id exists.
pub fn for_ledger(caller: Option<&Metadata>, amount: i64, card_charge_id: Option<&str>) -> Metadata {
    let mut merged = base(caller, amount, CARD_PARTNER);
    if let Some(charge_id) = card_charge_id {
        merged.insert(PARTNER_TRANSACTION_ID_KEY.to_string(), Value::from(charge_id));
    }
    merged
}

fn base(caller: Option<&Metadata>, amount: i64, partner: &str) -> Metadata {
    let mut merged = caller.cloned().unwrap_or_default();
    merged.insert(TOTAL_KEY.to_string(), Value::from(amount));
    merged.insert(PARTNER_KEY.to_string(), Value::from(partner));
    merged
}
