//! Notification channels.
//!
//! Transports are external; these channels resolve the recipient, render the message for
//! their medium and hand it to the `notifications` tracing target.

use crate::domain::notification::{NotificationRequest, NotificationResult};
use crate::domain::ports::{NotificationChannel, NotificationChannelRef};
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

const SMS_MAX_CHARS: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Immediate in-app acknowledgment, always available.
    LocalAck,
    Push,
    Email,
    Sms,
}

impl ChannelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelKind::LocalAck => "local",
            ChannelKind::Push => "push",
            ChannelKind::Email => "email",
            ChannelKind::Sms => "sms",
        }
    }
}

pub struct TransportChannel {
    kind: ChannelKind,
}

impl TransportChannel {
    pub fn new(kind: ChannelKind) -> Self {
        Self { kind }
    }

    fn recipient(&self, request: &NotificationRequest) -> Result<String> {
        let customer = &request.customer;
        let recipient = match self.kind {
            ChannelKind::LocalAck => Some(customer.name.clone()),
            ChannelKind::Push => customer.id.clone(),
            ChannelKind::Email => customer.email.clone(),
            ChannelKind::Sms => customer.phone.clone(),
        };
        recipient
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| {
                CheckoutError::Channel(format!("no {} recipient for customer", self.kind.name()))
            })
    }

    fn render(&self, request: &NotificationRequest) -> String {
        match self.kind {
            ChannelKind::LocalAck => format!("Order {} received", request.order_reference),
            ChannelKind::Push => format!("Your order {} is confirmed", request.order_reference),
            ChannelKind::Email => format!(
                "Subject: Order {} confirmed\n\nHello {},\n\n{}.\nPlaced at {}.",
                request.order_reference,
                request.customer.name,
                request.summary(),
                request.placed_at.format("%Y-%m-%d %H:%M UTC")
            ),
            ChannelKind::Sms => request.summary().chars().take(SMS_MAX_CHARS).collect(),
        }
    }
}

#[async_trait]
impl NotificationChannel for TransportChannel {
    fn name(&self) -> &str {
        self.kind.name()
    }

    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResult> {
        let recipient = self.recipient(request)?;
        let body = self.render(request);
        info!(
            target: "notifications",
            channel = self.kind.name(),
            %recipient,
            order_id = %request.order_id,
            %body,
            "notification sent"
        );
        Ok(NotificationResult::delivered(
            self.kind.name(),
            format!("sent to {recipient}"),
        ))
    }
}

/// Local acknowledgment, push, email and SMS.
pub fn default_channels() -> Vec<NotificationChannelRef> {
    [
        ChannelKind::LocalAck,
        ChannelKind::Push,
        ChannelKind::Email,
        ChannelKind::Sms,
    ]
    .into_iter()
    .map(|kind| Arc::new(TransportChannel::new(kind)) as NotificationChannelRef)
    .collect()
}
