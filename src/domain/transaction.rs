use crate::domain::metadata::Metadata;
use serde::{Deserialize, Serialize};

/// A debit recorded on a ledger instrument.
///
/// A reservation is created with `pending = true` when a card charge must
/// still succeed, and resolved by a capture or void. A debit created with
/// `pending = false` is committed immediately and never finalized again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub transaction_id: String,
    /// Negative of the ledger share.
    pub value: i64,
    pub currency: String,
    pub user_supplied_id: String,
    pub pending: bool,
    pub metadata: Metadata,
}

/// The card processor's charge record. Its metadata carries the partner
/// ledger transaction id so either backend can be reconciled from the
/// other's stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardCharge {
    pub charge_id: String,
    pub amount: i64,
    pub currency: String,
    pub metadata: Metadata,
}

/// Outcome of an orchestration. Either side may be absent when the
/// corresponding share was zero; a simulation never carries a card charge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SplitTenderCharge {
    pub ledger_transaction: Option<LedgerTransaction>,
    pub card_charge: Option<CardCharge>,
}
