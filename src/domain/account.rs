use serde::{Deserialize, Serialize};

/// A ledger account resolved from a caller-supplied customer reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub customer_ref: String,
}

/// A currency-specific stored-value instrument held by an account. All
/// debit operations target an instrument, not the account itself: an
/// account may hold one instrument per currency or none at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub instrument_id: String,
    pub account_id: String,
    pub currency: String,
}
