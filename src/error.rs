use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SplitTenderError>;

/// The card-side outcome that was already known when a compensation
/// (capture or void) call failed. Preserved so the caller can reconcile
/// the two backends manually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardOutcome {
    Charged { charge_id: String },
    Failed { reason: String },
}

impl fmt::Display for CardOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardOutcome::Charged { charge_id } => write!(f, "charge '{charge_id}' succeeded"),
            CardOutcome::Failed { reason } => write!(f, "charge failed ({reason})"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SplitTenderError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("no ledger account found for customer '{customer_ref}'")]
    AccountNotFound { customer_ref: String },

    #[error("no {currency} instrument found for customer '{customer_ref}'")]
    InstrumentNotFound {
        customer_ref: String,
        currency: String,
    },

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("card processor error: {0}")]
    CardProcessor(String),

    #[error("ledger error: {0}")]
    Ledger(String),

    /// The capture or void call failed after the card outcome was already
    /// known. The two backends disagree at this point; the error is never
    /// retried in-process and must be reconciled by the caller.
    #[error("ledger compensation failed after card {card_outcome}: {source}")]
    Compensation {
        card_outcome: CardOutcome,
        source: Box<SplitTenderError>,
    },
}
