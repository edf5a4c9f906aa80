use crate::domain::operator::Operator;
use crate::domain::order::OrderDraft;
use crate::domain::route::Terminal;
use crate::error::{CheckoutError, FieldError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default cap on user-initiated retries for one session.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Amounts are whole FCFA; the currency has no minor unit.
pub type Fcfa = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Unset,
    WalletTransfer,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Unset => "unset",
            PaymentMethod::WalletTransfer => "wallet_transfer",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A step of the checkout flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Method,
    Operator,
    Details,
    Confirmation,
    Processing,
    Terminal(Terminal),
    Abandoned,
}

impl Step {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::Terminal(_) | Step::Abandoned)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Method => f.write_str("method"),
            Step::Operator => f.write_str("operator"),
            Step::Details => f.write_str("details"),
            Step::Confirmation => f.write_str("confirmation"),
            Step::Processing => f.write_str("processing"),
            Step::Terminal(terminal) => write!(f, "{terminal}"),
            Step::Abandoned => f.write_str("abandoned"),
        }
    }
}

/// User actions the flow understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SelectMethod,
    SelectOperator,
    EnterPhoneNumber,
    Next,
    Previous,
    Confirm,
    Retry,
    ChangeMethod,
    Cancel,
}

/// Input fields that can carry a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Method,
    Operator,
    PhoneNumber,
    Amount,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Method => "method",
            Field::Operator => "operator",
            Field::PhoneNumber => "phone_number",
            Field::Amount => "amount",
        };
        f.write_str(name)
    }
}

/// Price breakdown of an order, all in FCFA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Amounts {
    subtotal: Fcfa,
    fees: Fcfa,
    discount: Fcfa,
}

impl Amounts {
    /// Builds a breakdown whose payable total is strictly positive.
    pub fn new(
        subtotal: Fcfa,
        fees: Fcfa,
        discount: Fcfa,
    ) -> std::result::Result<Self, FieldError> {
        let gross = subtotal.checked_add(fees).ok_or_else(|| {
            FieldError::new(Field::Amount, "Subtotal and fees overflow the payable amount")
        })?;
        if discount > gross {
            return Err(FieldError::new(
                Field::Amount,
                "Discount cannot exceed subtotal plus fees",
            ));
        }
        if gross - discount == 0 {
            return Err(FieldError::new(Field::Amount, "Amount must be positive"));
        }
        Ok(Self {
            subtotal,
            fees,
            discount,
        })
    }

    pub fn subtotal(&self) -> Fcfa {
        self.subtotal
    }

    pub fn fees(&self) -> Fcfa {
        self.fees
    }

    pub fn discount(&self) -> Fcfa {
        self.discount
    }

    /// The amount actually charged.
    pub fn total(&self) -> Fcfa {
        self.subtotal
            .saturating_add(self.fees)
            .saturating_sub(self.discount)
    }
}

/// One attempted purchase.
///
/// The session is plain data guarded by a few invariants:
/// - `order_created` only ever flips from `false` to `true`, and does so together with
///   `created_order_id`.
/// - `retry_count` never exceeds `max_retries`.
/// - `operator` is present whenever `method` is [`PaymentMethod::WalletTransfer`] and the
///   flow is past the operator step.
///
/// Mutation is restricted to the crate; the flow controller is the only writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    id: String,
    method: PaymentMethod,
    operator: Option<Operator>,
    phone_number: String,
    amounts: Amounts,
    retry_count: u32,
    max_retries: u32,
    order_created: bool,
    created_order_id: Option<String>,
    order_reference: Option<String>,
    transaction_id: Option<String>,
}

impl PaymentSession {
    pub fn new(id: impl Into<String>, amounts: Amounts, max_retries: u32) -> Self {
        Self {
            id: id.into(),
            method: PaymentMethod::Unset,
            operator: None,
            phone_number: String::new(),
            amounts,
            retry_count: 0,
            max_retries,
            order_created: false,
            created_order_id: None,
            order_reference: None,
            transaction_id: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn operator(&self) -> Option<&Operator> {
        self.operator.as_ref()
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn amounts(&self) -> Amounts {
        self.amounts
    }

    /// Payable amount in FCFA.
    pub fn amount(&self) -> Fcfa {
        self.amounts.total()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn order_created(&self) -> bool {
        self.order_created
    }

    pub fn created_order_id(&self) -> Option<&str> {
        self.created_order_id.as_deref()
    }

    pub fn order_reference(&self) -> Option<&str> {
        self.order_reference.as_deref()
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub(crate) fn set_method(&mut self, method: PaymentMethod) {
        self.method = method;
        if method != PaymentMethod::WalletTransfer {
            self.operator = None;
        }
    }

    pub(crate) fn set_operator(&mut self, operator: Operator) {
        self.operator = Some(operator);
    }

    pub(crate) fn set_phone_number(&mut self, phone_number: String) {
        self.phone_number = phone_number;
    }

    pub(crate) fn set_order_reference(&mut self, reference: String) {
        self.order_reference = Some(reference);
    }

    pub(crate) fn set_transaction_id(&mut self, transaction_id: Option<String>) {
        self.transaction_id = transaction_id;
    }

    /// Records the created order. Fails if an order already exists for this session.
    pub(crate) fn record_order(&mut self, order_id: String) -> Result<()> {
        if self.order_created {
            return Err(CheckoutError::OrderAlreadyCreated);
        }
        self.order_created = true;
        self.created_order_id = Some(order_id);
        Ok(())
    }

    /// Consumes one retry. Fails once the cap is reached; the count is left untouched.
    pub(crate) fn consume_retry(&mut self) -> Result<()> {
        if !self.can_retry() {
            return Err(CheckoutError::RetryLimitReached(self.max_retries));
        }
        self.retry_count += 1;
        self.transaction_id = None;
        Ok(())
    }

    /// Checks the invariants that deserialized data may violate.
    pub(crate) fn check_invariants(&self) -> Result<()> {
        if self.order_created != self.created_order_id.is_some() {
            return Err(CheckoutError::Storage(format!(
                "session {} has inconsistent order creation flags",
                self.id
            )));
        }
        if self.retry_count > self.max_retries {
            return Err(CheckoutError::Storage(format!(
                "session {} exceeds its retry cap",
                self.id
            )));
        }
        let amounts = self.amounts;
        Amounts::new(amounts.subtotal, amounts.fees, amounts.discount).map_err(|e| {
            CheckoutError::Storage(format!("session {} has invalid amounts: {e}", self.id))
        })?;
        Ok(())
    }
}

/// Serializable image of an in-progress checkout, used to resume an abandoned draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session: PaymentSession,
    pub step: Step,
    pub method_locked: bool,
    pub draft: OrderDraft,
}

impl SessionSnapshot {
    pub fn session_id(&self) -> &str {
        self.session.id()
    }
}
