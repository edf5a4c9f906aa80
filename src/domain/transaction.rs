use crate::domain::session::Fcfa;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a payment as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
}

/// The authoritative status last observed from the provider, as opposed to the status a
/// screen assumed when it was entered.
pub type VerificationOutcome = TransactionStatus;

impl TransactionStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Succeeded => "succeeded",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

/// Parameters of a wallet-transfer initiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub operator_id: String,
    pub phone_number: String,
    pub amount: Fcfa,
    pub order_reference: String,
}

/// Provider answer to an initiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInitiation {
    pub status: TransactionStatus,
    pub transaction_id: Option<String>,
    /// Raw provider text, kept for classification when the payment did not go through.
    pub message: Option<String>,
}

/// Provider answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: TransactionStatus,
    pub message: Option<String>,
}

impl StatusReport {
    pub fn new(status: TransactionStatus) -> Self {
        Self {
            status,
            message: None,
        }
    }
}
