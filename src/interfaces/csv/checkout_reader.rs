use crate::domain::order::{Customer, OrderDraft, Pressing};
use crate::domain::session::{Amounts, Fcfa, PaymentMethod};
use crate::error::{CheckoutError, Result};
use serde::Deserialize;
use std::io::Read;

/// One checkout row as it appears in the input file.
#[derive(Debug, Deserialize)]
struct CheckoutRecord {
    session: String,
    method: Option<PaymentMethod>,
    operator: Option<String>,
    phone: Option<String>,
    subtotal: Fcfa,
    #[serde(default)]
    fees: Option<Fcfa>,
    #[serde(default)]
    discount: Option<Fcfa>,
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    customer_email: Option<String>,
    #[serde(default)]
    customer_phone: Option<String>,
    #[serde(default)]
    pressing_id: Option<String>,
    #[serde(default)]
    pressing_name: Option<String>,
    #[serde(default)]
    reference: Option<String>,
}

/// A checkout to replay through the payment flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub session_id: String,
    pub method: PaymentMethod,
    pub operator: Option<String>,
    pub phone_number: Option<String>,
    pub amounts: Amounts,
    pub draft: OrderDraft,
}

impl TryFrom<CheckoutRecord> for CheckoutRequest {
    type Error = CheckoutError;

    fn try_from(record: CheckoutRecord) -> Result<Self> {
        let amounts = Amounts::new(
            record.subtotal,
            record.fees.unwrap_or(0),
            record.discount.unwrap_or(0),
        )?;
        let draft = OrderDraft {
            reference: record.reference,
            customer: Customer {
                id: record.customer_id,
                name: record.customer_name.unwrap_or_default(),
                email: record.customer_email,
                phone: record.customer_phone,
            },
            pressing: Pressing {
                id: record.pressing_id.unwrap_or_default(),
                name: record.pressing_name.unwrap_or_default(),
            },
            items: Vec::new(),
            delivery_address: None,
        };
        Ok(Self {
            session_id: record.session,
            method: record.method.unwrap_or_default(),
            operator: record.operator,
            phone_number: record.phone,
            amounts,
            draft,
        })
    }
}

/// Reads checkout rows from a CSV source.
///
/// Whitespace is trimmed and short rows are accepted; missing optional columns are
/// treated as empty.
pub struct CheckoutReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CheckoutReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes and validates each row.
    pub fn checkouts(self) -> impl Iterator<Item = Result<CheckoutRequest>> {
        self.reader
            .into_deserialize::<CheckoutRecord>()
            .map(|result| {
                result
                    .map_err(CheckoutError::from)
                    .and_then(CheckoutRequest::try_from)
            })
    }
}
