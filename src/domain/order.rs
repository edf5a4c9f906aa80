use crate::domain::session::{Fcfa, PaymentMethod};
use crate::domain::transaction::TransactionStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Customer {
    pub id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// The laundry (pressing) fulfilling the order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pressing {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub label: String,
    pub quantity: u32,
    pub unit_price: Fcfa,
}

/// Everything the customer put together before paying.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderDraft {
    /// Caller-supplied reference; generated at settlement when absent.
    pub reference: Option<String>,
    pub customer: Customer,
    pub pressing: Pressing,
    pub items: Vec<OrderItem>,
    pub delivery_address: Option<String>,
}

/// Payment details attached to an order at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub operator_id: Option<String>,
    pub amount: Fcfa,
    pub subtotal: Fcfa,
    pub fees: Fcfa,
    pub discount: Fcfa,
    pub transaction_id: Option<String>,
}

/// Payload sent to the order API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmission {
    pub reference: String,
    pub draft: OrderDraft,
    pub payment: PaymentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub id: String,
    pub reference: String,
}
