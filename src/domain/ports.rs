//! Collaborator contracts consumed by the checkout core.
//!
//! Everything behind these traits is external: the payment provider, the order API, the
//! notification transports, the navigation surface and draft storage.

use super::notification::{NotificationRequest, NotificationResult};
use super::order::{CreatedOrder, OrderSubmission};
use super::route::{Terminal, TerminalPayload};
use super::session::{SessionSnapshot, Step};
use super::transaction::{PaymentInitiation, PaymentRequest, StatusReport};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn initiate(&self, request: PaymentRequest) -> Result<PaymentInitiation>;
    async fn get_status(&self, transaction_id: &str) -> Result<StatusReport>;
}

#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn create(&self, submission: OrderSubmission) -> Result<CreatedOrder>;
}

/// One way of telling the world an order was placed.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResult>;
}

/// Abstract navigation surface.
pub trait Navigator: Send + Sync {
    fn goto_step(&self, step: Step);
    fn goto_terminal(&self, terminal: Terminal, payload: TerminalPayload);
}

/// Storage for resumable checkout drafts.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn save(&self, snapshot: SessionSnapshot) -> Result<()>;
    async fn load(&self, session_id: &str) -> Result<Option<SessionSnapshot>>;
    async fn remove(&self, session_id: &str) -> Result<()>;
}

pub type PaymentProviderRef = Arc<dyn PaymentProvider>;
pub type OrderApiRef = Arc<dyn OrderApi>;
pub type NotificationChannelRef = Arc<dyn NotificationChannel>;
pub type NavigatorRef = Arc<dyn Navigator>;
pub type DraftStoreBox = Box<dyn DraftStore>;
