use crate::domain::order::{Customer, Pressing};
use crate::domain::session::{Fcfa, PaymentMethod};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of a placed order, carrying what any channel may need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub order_id: String,
    pub order_reference: String,
    pub customer: Customer,
    pub pressing: Pressing,
    pub method: PaymentMethod,
    pub amount: Fcfa,
    pub transaction_id: Option<String>,
    pub placed_at: DateTime<Utc>,
}

impl NotificationRequest {
    /// One-line summary shared by the text-based channels.
    pub fn summary(&self) -> String {
        let payment = match self.method {
            PaymentMethod::CashOnDelivery => "to pay on delivery".to_string(),
            _ => "paid by mobile money".to_string(),
        };
        format!(
            "Order {} at {}: {} FCFA {}",
            self.order_reference, self.pressing.name, self.amount, payment
        )
    }
}

/// Outcome of one channel. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResult {
    pub success: bool,
    pub channel: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl NotificationResult {
    pub fn delivered(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            channel: channel.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn failed(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            channel: channel.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
