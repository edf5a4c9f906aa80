use crate::domain::classifier::ClassifiedError;
use crate::domain::notification::NotificationResult;
use crate::domain::session::Step;
use crate::domain::transaction::TransactionStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Screens the user leaves the payment flow from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terminal {
    Success,
    Pending,
    Failed,
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Terminal::Success => "success",
            Terminal::Pending => "pending",
            Terminal::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Data handed to a terminal screen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TerminalPayload {
    pub order_id: Option<String>,
    pub order_reference: Option<String>,
    pub transaction_id: Option<String>,
    pub message: String,
    pub error: Option<ClassifiedError>,
    /// Set when the status was confirmed by the verification poller.
    pub verified_status: Option<TransactionStatus>,
    pub notifications: Vec<NotificationResult>,
}

/// A navigation performed through a [`Navigator`](crate::domain::ports::Navigator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    Step(Step),
    Terminal(Terminal, TerminalPayload),
}
