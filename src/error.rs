use crate::domain::session::{Action, Field, Step};
use thiserror::Error;

/// A validation failure attached to a single input field.
///
/// Field errors block a step transition but never route the user away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Validation error: {0}")]
    Validation(#[from] FieldError),
    #[error("Action {action:?} is not allowed from step {from}")]
    InvalidTransition { from: Step, action: Action },
    #[error("A settlement is already in flight for this session")]
    SettlementInProgress,
    #[error("An order was already created for this session")]
    OrderAlreadyCreated,
    #[error("Retry limit of {0} attempts reached")]
    RetryLimitReached(u32),
    #[error("Payment provider error: {0}")]
    Provider(String),
    #[error("Order API error: {0}")]
    OrderApi(String),
    #[error("Notification channel error: {0}")]
    Channel(String),
    #[error("Draft storage error: {0}")]
    Storage(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
