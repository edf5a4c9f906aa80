#![allow(dead_code)]

use async_trait::async_trait;
use pressing_checkout::application::dispatcher::NotificationDispatcher;
use pressing_checkout::application::flow::{Collaborators, PaymentFlow};
use pressing_checkout::config::CheckoutConfig;
use pressing_checkout::domain::notification::{NotificationRequest, NotificationResult};
use pressing_checkout::domain::operator::OperatorCatalogue;
use pressing_checkout::domain::order::{Customer, OrderDraft, Pressing};
use pressing_checkout::domain::ports::{
    NotificationChannel, NotificationChannelRef, OrderApiRef, PaymentProvider,
    PaymentProviderRef,
};
use pressing_checkout::domain::session::{Amounts, PaymentMethod, Step};
use pressing_checkout::domain::transaction::{
    PaymentInitiation, PaymentRequest, StatusReport, TransactionStatus,
};
use pressing_checkout::error::{CheckoutError, Result};
use pressing_checkout::infrastructure::in_memory::RecordingNavigator;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A provider answering `initiate` with a fixed result and status queries from a script.
/// The last scripted status repeats once the script runs out.
pub struct ScriptedProvider {
    initiation: std::result::Result<PaymentInitiation, String>,
    latency: Option<Duration>,
    statuses: Mutex<VecDeque<TransactionStatus>>,
    pub initiations: AtomicUsize,
    pub queries: AtomicUsize,
}

impl ScriptedProvider {
    pub fn accepting(status: TransactionStatus) -> Self {
        Self::with_initiation(Ok(PaymentInitiation {
            status,
            transaction_id: Some("TX-100".to_string()),
            message: None,
        }))
    }

    pub fn declining(message: &str) -> Self {
        Self::with_initiation(Ok(PaymentInitiation {
            status: TransactionStatus::Failed,
            transaction_id: None,
            message: Some(message.to_string()),
        }))
    }

    pub fn erroring(message: &str) -> Self {
        Self::with_initiation(Err(message.to_string()))
    }

    fn with_initiation(initiation: std::result::Result<PaymentInitiation, String>) -> Self {
        Self {
            initiation,
            latency: None,
            statuses: Mutex::new(VecDeque::new()),
            initiations: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_statuses(self, statuses: &[TransactionStatus]) -> Self {
        *self.statuses.lock().unwrap() = statuses.iter().copied().collect();
        self
    }
}

#[async_trait]
impl PaymentProvider for ScriptedProvider {
    async fn initiate(&self, _request: PaymentRequest) -> Result<PaymentInitiation> {
        self.initiations.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.initiation.clone().map_err(CheckoutError::Provider)
    }

    async fn get_status(&self, _transaction_id: &str) -> Result<StatusReport> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().copied()
        };
        Ok(StatusReport::new(status.unwrap_or(TransactionStatus::Pending)))
    }
}

pub enum Behaviour {
    Deliver,
    Fail,
    Panic,
    Hang,
}

/// A channel with a fixed behaviour that counts its sends.
pub struct TestChannel {
    name: String,
    behaviour: Behaviour,
    pub sends: AtomicUsize,
}

impl TestChannel {
    pub fn new(name: &str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behaviour,
            sends: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl NotificationChannel for TestChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, _request: &NotificationRequest) -> Result<NotificationResult> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Deliver => Ok(NotificationResult::delivered(&self.name, "ok")),
            Behaviour::Fail => Err(CheckoutError::Channel("transport down".to_string())),
            Behaviour::Panic => panic!("channel exploded"),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(NotificationResult::delivered(&self.name, "late"))
            }
        }
    }
}

pub fn draft() -> OrderDraft {
    OrderDraft {
        reference: None,
        customer: Customer {
            id: Some("u-1".to_string()),
            name: "Awa".to_string(),
            email: Some("awa@example.com".to_string()),
            phone: Some("0712345678".to_string()),
        },
        pressing: Pressing {
            id: "p-1".to_string(),
            name: "Clean Express".to_string(),
        },
        items: Vec::new(),
        delivery_address: Some("Cocody, Abidjan".to_string()),
    }
}

pub fn collaborators(
    provider: PaymentProviderRef,
    order_api: OrderApiRef,
    channels: Vec<NotificationChannelRef>,
    navigator: Arc<RecordingNavigator>,
) -> Collaborators {
    Collaborators {
        provider,
        order_api,
        dispatcher: Arc::new(
            NotificationDispatcher::new(Duration::from_secs(10)).with_channels(channels),
        ),
        navigator,
    }
}

pub fn flow(collaborators: Collaborators, total: u64) -> PaymentFlow {
    PaymentFlow::new(
        "s-1",
        draft(),
        Amounts::new(total, 0, 0).unwrap(),
        collaborators,
        &CheckoutConfig::default(),
    )
}

/// Drives a wallet checkout on Orange Money up to the confirmation step.
pub fn to_wallet_confirmation(flow: &PaymentFlow, phone_number: &str) {
    flow.select_method(PaymentMethod::WalletTransfer).unwrap();
    flow.next().unwrap();
    let orange = OperatorCatalogue::default().find("orange").cloned().unwrap();
    flow.select_operator(orange).unwrap();
    flow.next().unwrap();
    flow.enter_phone_number(phone_number).unwrap();
    assert_eq!(flow.next().unwrap(), Step::Confirmation);
}

pub fn to_cash_confirmation(flow: &PaymentFlow) {
    flow.select_method(PaymentMethod::CashOnDelivery).unwrap();
    assert_eq!(flow.next().unwrap(), Step::Confirmation);
}

pub const CHECKOUT_HEADER: [&str; 14] = [
    "session",
    "method",
    "operator",
    "phone",
    "subtotal",
    "fees",
    "discount",
    "customer_id",
    "customer_name",
    "customer_email",
    "customer_phone",
    "pressing_id",
    "pressing_name",
    "reference",
];

/// Writes a checkouts file with one wallet row per `(session, phone)` pair.
pub fn write_checkouts(path: &Path, rows: &[(&str, &str)]) -> std::io::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(CHECKOUT_HEADER)?;
    for &(session, phone) in rows {
        wtr.write_record([
            session,
            "wallet_transfer",
            "orange",
            phone,
            "12000",
            "500",
            "0",
            "u-1",
            "Awa",
            "awa@example.com",
            "0712345678",
            "p-1",
            "Clean Express",
            "",
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
