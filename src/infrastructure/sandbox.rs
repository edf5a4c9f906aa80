//! A payment provider whose behaviour is selected by the subscriber number, in the way
//! mobile-money sandboxes expose test numbers.
//!
//! The last two digits of the phone number pick the scenario:
//!
//! | suffix | initiation                        | later status queries            |
//! |--------|-----------------------------------|---------------------------------|
//! | `01`   | failed, insufficient balance      |                                 |
//! | `02`   | failed, invalid number format     |                                 |
//! | `03`   | failed, declined by subscriber    |                                 |
//! | `04`   | pending                           | pending twice, then succeeded   |
//! | `05`   | pending                           | pending forever                 |
//! | `06`   | pending                           | pending once, then canceled     |
//! | `09`   | provider unreachable (error)      |                                 |
//! | other  | succeeded                         | succeeded                       |

use crate::domain::ports::PaymentProvider;
use crate::domain::transaction::{
    PaymentInitiation, PaymentRequest, StatusReport, TransactionStatus,
};
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scenario {
    Succeeds,
    InsufficientFunds,
    InvalidNumber,
    Declined,
    SettlesLater,
    NeverSettles,
    CanceledLater,
    Unreachable,
}

impl Scenario {
    fn for_number(phone_number: &str) -> Self {
        let suffix = phone_number.get(phone_number.len().saturating_sub(2)..);
        match suffix {
            Some("01") => Scenario::InsufficientFunds,
            Some("02") => Scenario::InvalidNumber,
            Some("03") => Scenario::Declined,
            Some("04") => Scenario::SettlesLater,
            Some("05") => Scenario::NeverSettles,
            Some("06") => Scenario::CanceledLater,
            Some("09") => Scenario::Unreachable,
            _ => Scenario::Succeeds,
        }
    }
}

#[derive(Debug)]
struct SandboxTransaction {
    scenario: Scenario,
    queries: u32,
}

#[derive(Default)]
pub struct SandboxProvider {
    transactions: RwLock<HashMap<String, SandboxTransaction>>,
    next_id: AtomicU64,
    initiations: AtomicU64,
}

impl SandboxProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `initiate` calls received.
    pub fn initiations(&self) -> u64 {
        self.initiations.load(Ordering::SeqCst)
    }

    fn failed(message: &str) -> PaymentInitiation {
        PaymentInitiation {
            status: TransactionStatus::Failed,
            transaction_id: None,
            message: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl PaymentProvider for SandboxProvider {
    async fn initiate(&self, request: PaymentRequest) -> Result<PaymentInitiation> {
        self.initiations.fetch_add(1, Ordering::SeqCst);
        let scenario = Scenario::for_number(&request.phone_number);
        debug!(
            reference = %request.order_reference,
            operator = %request.operator_id,
            amount = request.amount,
            ?scenario,
            "sandbox initiation"
        );

        let status = match scenario {
            Scenario::InsufficientFunds => return Ok(Self::failed("insufficient balance")),
            Scenario::InvalidNumber => return Ok(Self::failed("invalid number format")),
            Scenario::Declined => return Ok(Self::failed("transaction declined by subscriber")),
            Scenario::Unreachable => {
                return Err(CheckoutError::Provider("network unreachable".to_string()));
            }
            Scenario::Succeeds => TransactionStatus::Succeeded,
            Scenario::SettlesLater | Scenario::NeverSettles | Scenario::CanceledLater => {
                TransactionStatus::Pending
            }
        };

        let id = format!("TX-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.transactions.write().await.insert(
            id.clone(),
            SandboxTransaction {
                scenario,
                queries: 0,
            },
        );
        Ok(PaymentInitiation {
            status,
            transaction_id: Some(id),
            message: None,
        })
    }

    async fn get_status(&self, transaction_id: &str) -> Result<StatusReport> {
        let mut transactions = self.transactions.write().await;
        let tx = transactions.get_mut(transaction_id).ok_or_else(|| {
            CheckoutError::Provider(format!("unknown transaction {transaction_id}"))
        })?;
        tx.queries += 1;

        let report = match (tx.scenario, tx.queries) {
            (Scenario::SettlesLater, n) if n <= 2 => StatusReport::new(TransactionStatus::Pending),
            (Scenario::SettlesLater, _) => StatusReport::new(TransactionStatus::Succeeded),
            (Scenario::NeverSettles, _) => StatusReport::new(TransactionStatus::Pending),
            (Scenario::CanceledLater, 1) => StatusReport::new(TransactionStatus::Pending),
            (Scenario::CanceledLater, _) => StatusReport {
                status: TransactionStatus::Canceled,
                message: Some("payment request cancelled by subscriber".to_string()),
            },
            _ => StatusReport::new(TransactionStatus::Succeeded),
        };
        Ok(report)
    }
}
