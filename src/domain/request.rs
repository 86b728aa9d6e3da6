use crate::domain::metadata::Metadata;
use crate::error::{Result, SplitTenderError};
use serde::{Deserialize, Serialize};

/// Caller input for a split-tender charge: one total amount split between
/// the prepaid ledger and the card processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitTenderRequest {
    /// Caller-chosen idempotency key for the whole operation. The ledger
    /// capture/void ids are derived from it (`<id>-capture`, `<id>-void`).
    pub user_supplied_id: String,
    pub currency: String,
    /// Charge total, in minor currency units.
    pub amount: i64,
    /// Resolves the ledger account. Omission means the ledger share must be 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_ref: Option<String>,
    /// One-off payment token for the card processor. Preferred over
    /// `card_customer_ref` when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_payment_source: Option<String>,
    /// Stored payment method reference at the card processor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_customer_ref: Option<String>,
    /// Caller annotations, merged with (never overwritten by) the
    /// system-generated `_split_tender_*` keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Simulation only: reject when the ledger cannot cover its share.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsf_check: Option<bool>,
}

impl SplitTenderRequest {
    /// Checks shape and numeric constraints before any side effect occurs.
    pub fn validate(&self, ledger_share: i64) -> Result<()> {
        if self.user_supplied_id.is_empty() {
            return Err(SplitTenderError::Validation(
                "user_supplied_id not set".to_string(),
            ));
        }
        if self.amount <= 0 {
            return Err(SplitTenderError::Validation(
                "amount must be positive".to_string(),
            ));
        }
        if ledger_share < 0 {
            return Err(SplitTenderError::Validation(
                "ledger share must not be negative".to_string(),
            ));
        }
        if ledger_share > self.amount {
            return Err(SplitTenderError::Validation(
                "ledger share greater than total charge amount".to_string(),
            ));
        }
        if ledger_share > 0 && self.customer_ref.as_deref().unwrap_or("").is_empty() {
            return Err(SplitTenderError::Validation(
                "customer_ref required when ledger share is positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// The validated split of the total amount across the two backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shares {
    /// Portion drawn from the prepaid ledger account.
    pub ledger: i64,
    /// Portion charged to the card processor.
    pub card: i64,
}

impl Shares {
    /// Validates the request against `ledger_share` and derives the card
    /// share as the remainder. `ledger + card == amount` always holds on
    /// success.
    pub fn try_new(request: &SplitTenderRequest, ledger_share: i64) -> Result<Self> {
        request.validate(ledger_share)?;
        Ok(Self {
            ledger: ledger_share,
            card: request.amount - ledger_share,
        })
    }
}
